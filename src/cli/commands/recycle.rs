use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::cli::utils::{format_summary_row, output_error, output_json, output_success};
use crate::cli::{Commands, OutputFormat};
use crate::config::config;
use crate::database::{DatabaseManager, PgRecycleStore};
use crate::recycle::{CallerContext, PageRequest, RecycleBin, RecycleError};

async fn connect() -> anyhow::Result<(RecycleBin, PgRecycleStore)> {
    let config = config();
    let pool = DatabaseManager::connect(&config.database).await?;
    let store = PgRecycleStore::new(pool);
    let bin = RecycleBin::new(Arc::new(store.clone()), config.recycle.clone());
    Ok((bin, store))
}

/// Report a recycle bin rejection; JSON callers get a machine-readable body on stdout
fn fail(output_format: &OutputFormat, err: RecycleError) -> anyhow::Result<()> {
    if let OutputFormat::Json = output_format {
        output_error(output_format, &err.to_string(), Some(err.kind()))?;
    }
    Err(err.into())
}

fn parse_record(data: &str) -> anyhow::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(data)? {
        Value::Object(map) => Ok(map),
        _ => Err(anyhow::anyhow!("--data must be a JSON object")),
    }
}

pub async fn handle(cmd: Commands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (bin, store) = connect().await?;

    match cmd {
        Commands::Init => {
            store.ensure_schema().await?;
            output_success(&output_format, "recycle_bin table is ready", None)
        }
        Commands::List { page, page_size } => {
            let listing = match bin.list(PageRequest { page, page_size }).await {
                Ok(listing) => listing,
                Err(err) => return fail(&output_format, err),
            };
            match output_format {
                OutputFormat::Json => output_json(&listing),
                OutputFormat::Text => {
                    if listing.entries.is_empty() {
                        println!("Recycle bin is empty");
                        return Ok(());
                    }
                    for summary in &listing.entries {
                        println!("{}", format_summary_row(summary));
                    }
                    println!(
                        "Page {} of {} ({} entries)",
                        listing.page,
                        listing.total_pages.max(1),
                        listing.total_count
                    );
                    Ok(())
                }
            }
        }
        Commands::Show { id } => {
            let detail = match bin.entry(id).await {
                Ok(detail) => detail,
                Err(err) => return fail(&output_format, err),
            };
            match output_format {
                OutputFormat::Json => output_json(&detail),
                OutputFormat::Text => {
                    let entry = &detail.entry;
                    println!("Entry:       {}", entry.id);
                    println!("Table:       {}", entry.original_table);
                    if let Some(original_id) = entry.original_id {
                        println!("Original ID: {}", original_id);
                    }
                    println!("Deleted by:  {}", entry.deleted_by.as_deref().unwrap_or("-"));
                    println!("Deleted at:  {}", entry.deleted_at.to_rfc3339());
                    match entry.restored_at {
                        Some(at) => println!("Restored at: {}", at.to_rfc3339()),
                        None => println!("Restorable:  {}", if detail.restorable { "yes" } else { "no" }),
                    }
                    println!("Data:        {}", detail.preview);
                    Ok(())
                }
            }
        }
        Commands::Restore { id, actor } => {
            let ctx = CallerContext::new(actor);
            match bin.restore(id, &ctx).await {
                Ok(restored) => output_success(
                    &output_format,
                    &format!("Restored entry {} into {}", id, restored.table),
                    Some(json!({ "restored": restored })),
                ),
                Err(err) => fail(&output_format, err),
            }
        }
        Commands::Capture { table, original_id, data, actor } => {
            let record = parse_record(&data)?;
            match bin.capture(&table, original_id, &record, actor.as_deref()).await {
                Ok(entry_id) => output_success(
                    &output_format,
                    &format!("Captured {} record as entry {}", table, entry_id),
                    Some(json!({ "entry_id": entry_id })),
                ),
                Err(err) => fail(&output_format, err),
            }
        }
        Commands::Trash { table, id, actor } => match bin.trash(&table, id, actor.as_deref()).await {
            Ok(trashed) => output_success(
                &output_format,
                &format!("Moved {} #{} to the recycle bin as entry {}", table, id, trashed.entry_id),
                Some(json!({ "trashed": trashed })),
            ),
            Err(err) => fail(&output_format, err),
        },
    }
}
