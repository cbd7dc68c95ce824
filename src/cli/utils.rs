use serde::Serialize;
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::recycle::EntrySummary;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(obj), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                obj.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(
    output_format: &OutputFormat,
    message: &str,
    error_code: Option<&str>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Print any serializable value as pretty JSON
pub fn output_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One table row per entry for text output
pub fn format_summary_row(summary: &EntrySummary) -> String {
    let original_id = summary
        .original_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "-".to_string());
    let status = if summary.restored_at.is_some() {
        "restored"
    } else if summary.restorable {
        "restorable"
    } else {
        "locked"
    };

    format!(
        "{:>6}  {:<14} {:>8}  {:<12} {}  {:<10}  {}",
        summary.id,
        summary.original_table,
        original_id,
        summary.deleted_by.as_deref().unwrap_or("-"),
        summary.deleted_at.format("%Y-%m-%d %H:%M"),
        status,
        summary.preview,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recycle::{RecycleEntry, SchemaGuard};
    use chrono::Utc;

    #[test]
    fn summary_row_marks_status() {
        let entry = RecycleEntry {
            id: 7,
            original_table: "minutes".to_string(),
            original_id: None,
            data: Some(r#"{"id":3}"#.to_string()),
            deleted_by: None,
            deleted_at: Utc::now(),
            restored_at: None,
        };
        let guard = SchemaGuard::new(["minutes"]);
        let row = format_summary_row(&EntrySummary::from_entry(&entry, &guard, 100));
        assert!(row.contains("restorable"));
        assert!(row.contains(r#"{"id":3}"#));

        let locked = format_summary_row(&EntrySummary::from_entry(&entry, &SchemaGuard::new(["other"]), 100));
        assert!(locked.contains("locked"));
    }
}
