pub mod recycle;
