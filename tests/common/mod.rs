#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, http::Request, Router};
use serde_json::{Map, Value};
use tower::ServiceExt;

use recycle_bin_api::config::RecycleConfig;
use recycle_bin_api::handlers::AppState;
use recycle_bin_api::recycle::{
    MemoryRecycleStore, NewRecycleEntry, RecycleBin, RecycleEntry, RecycleError, RecycleStore,
    RecycleTransaction,
};
use recycle_bin_api::router;

pub const TABLES: [&str; 3] = ["resolutions", "ordinances", "minutes"];

/// Memory-backed bin with the default restorable tables already created
pub fn setup() -> (MemoryRecycleStore, RecycleBin) {
    let store = MemoryRecycleStore::new();
    for table in TABLES {
        store.create_table(table);
    }
    let bin = RecycleBin::new(Arc::new(store.clone()), RecycleConfig::default());
    (store, bin)
}

/// Store whose backing database is unreachable
pub struct UnavailableStore;

fn unavailable() -> RecycleError {
    RecycleError::PersistenceError("connection refused".to_string())
}

#[async_trait]
impl RecycleStore for UnavailableStore {
    async fn append(&self, _entry: NewRecycleEntry) -> Result<i64, RecycleError> {
        Err(unavailable())
    }

    async fn count(&self) -> Result<i64, RecycleError> {
        Err(unavailable())
    }

    async fn page(&self, _limit: i64, _offset: i64) -> Result<Vec<RecycleEntry>, RecycleError> {
        Err(unavailable())
    }

    async fn find(&self, _id: i64) -> Result<Option<RecycleEntry>, RecycleError> {
        Err(unavailable())
    }

    async fn begin(&self) -> Result<Box<dyn RecycleTransaction>, RecycleError> {
        Err(unavailable())
    }
}

pub fn unavailable_bin() -> RecycleBin {
    RecycleBin::new(Arc::new(UnavailableStore), RecycleConfig::default())
}

pub fn app(bin: RecycleBin) -> Router {
    router::app(AppState::new(bin, None))
}

pub fn record(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("test record must be an object")
}

/// Send one request through the router and decode the JSON body
pub async fn send(app: &Router, request: Request<Body>) -> (u16, Value) {
    let response = app.clone().oneshot(request).await.expect("router is infallible");
    let status = response.status().as_u16();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, body)
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}
