pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "recycle")]
#[command(about = "Recycle bin CLI - browse, capture and restore deleted records")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the recycle_bin table if it does not exist")]
    Init,

    #[command(about = "List recycle bin entries, newest first")]
    List {
        #[arg(long, help = "Page number (1-based)")]
        page: Option<i64>,
        #[arg(long, help = "Entries per page")]
        page_size: Option<i64>,
    },

    #[command(about = "Show one recycle bin entry with its full snapshot")]
    Show {
        #[arg(help = "Recycle bin entry ID")]
        id: i64,
    },

    #[command(about = "Restore an entry into its original table")]
    Restore {
        #[arg(help = "Recycle bin entry ID")]
        id: i64,
        #[arg(long, help = "Actor recorded in the restore log")]
        actor: Option<String>,
    },

    #[command(about = "Capture a record snapshot without deleting anything")]
    Capture {
        #[arg(long, help = "Table the record belongs to")]
        table: String,
        #[arg(long, help = "Primary key of the record")]
        original_id: Option<i64>,
        #[arg(long, help = "Record as a JSON object")]
        data: String,
        #[arg(long, help = "Actor performing the delete")]
        actor: Option<String>,
    },

    #[command(about = "Delete a live record, keeping a snapshot in the recycle bin")]
    Trash {
        #[arg(help = "Table name")]
        table: String,
        #[arg(help = "Record ID")]
        id: i64,
        #[arg(long, help = "Actor performing the delete")]
        actor: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    commands::recycle::handle(cli.command, output_format).await
}
