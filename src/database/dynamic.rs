//! Statement building for tables only known at runtime.
//! Identifiers come from the schema guard; values are always bound.

use std::collections::HashMap;

use sqlx::postgres::PgArguments;
use sqlx::{PgConnection, Row};

use crate::recycle::codec::{Snapshot, SnapshotValue};
use crate::recycle::guard::quote_identifier;

pub type PgQuery<'q> = sqlx::query::Query<'q, sqlx::Postgres, PgArguments>;

/// INSERT listing only the snapshot's columns, one placeholder per value.
///
/// Placeholders are cast to the column's declared type when known, so text
/// carrying dates, booleans or uuids lands in typed columns.
pub fn build_insert(table: &str, row: &Snapshot, column_types: &HashMap<String, String>) -> String {
    let mut columns = Vec::with_capacity(row.len());
    let mut placeholders = Vec::with_capacity(row.len());

    for (i, column) in row.columns().enumerate() {
        columns.push(quote_identifier(column));
        placeholders.push(match column_types.get(column) {
            Some(ty) => format!("${}::{}", i + 1, ty),
            None => format!("${}", i + 1),
        });
    }

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Bind a snapshot value with its inferred type
pub fn bind_value<'q>(q: PgQuery<'q>, v: &'q SnapshotValue) -> PgQuery<'q> {
    match v {
        SnapshotValue::Int(i) => q.bind(*i),
        SnapshotValue::Float(f) => q.bind(*f),
        SnapshotValue::Text(s) => q.bind(s.as_str()),
        SnapshotValue::Null => {
            let none: Option<String> = None;
            q.bind(none)
        }
    }
}

/// Declared column types of `table`, as rendered by format_type()
pub async fn column_types(
    conn: &mut PgConnection,
    table: &str,
) -> Result<HashMap<String, String>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT a.attname::text AS name, format_type(a.atttypid, a.atttypmod) AS ty
         FROM pg_attribute a
         WHERE a.attrelid = to_regclass($1) AND a.attnum > 0 AND NOT a.attisdropped",
    )
    .bind(quote_identifier(table))
    .fetch_all(conn)
    .await?;

    let mut types = HashMap::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("name")?;
        let ty: String = row.try_get("ty")?;
        types.insert(name, ty);
    }
    Ok(types)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recycle::codec::decode;

    #[test]
    fn builds_insert_with_only_snapshot_columns() {
        let row = decode(r#"{"id":42,"title":"Budget Q1","amount":1000}"#).unwrap();
        let sql = build_insert("resolutions", &row, &HashMap::new());
        assert_eq!(
            sql,
            r#"INSERT INTO "resolutions" ("id", "title", "amount") VALUES ($1, $2, $3)"#
        );
    }

    #[test]
    fn casts_placeholders_to_declared_types() {
        let row = decode(r#"{"id":1,"held_on":"2024-01-01","extra":"x"}"#).unwrap();
        let types = HashMap::from([
            ("id".to_string(), "integer".to_string()),
            ("held_on".to_string(), "timestamp with time zone".to_string()),
        ]);
        let sql = build_insert("minutes", &row, &types);
        assert_eq!(
            sql,
            r#"INSERT INTO "minutes" ("id", "held_on", "extra") VALUES ($1::integer, $2::timestamp with time zone, $3)"#
        );
    }
}
