//! Identifier and table gate for dynamically built statements.
//!
//! Values are always bound as parameters; identifiers are the only text that
//! ever reaches statement strings, and only after passing these checks.

use std::collections::BTreeSet;

use super::error::RecycleError;

/// True only for `^[A-Za-z_][A-Za-z0-9_]*$`
pub fn validate_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier that already passed `validate_identifier`
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name)
}

/// Allow-list of tables the engine may capture from and restore into
#[derive(Debug, Clone)]
pub struct SchemaGuard {
    tables: BTreeSet<String>,
}

impl SchemaGuard {
    pub fn new<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tables = tables
            .into_iter()
            .map(Into::into)
            .filter(|t: &String| {
                let ok = validate_identifier(t);
                if !ok {
                    tracing::warn!("Ignoring invalid table name in allow-list: {:?}", t);
                }
                ok
            })
            .collect();
        Self { tables }
    }

    pub fn validate_table(&self, name: &str) -> bool {
        validate_identifier(name) && self.tables.contains(name)
    }

    pub fn check_table(&self, name: &str) -> Result<(), RecycleError> {
        if self.validate_table(name) {
            Ok(())
        } else {
            Err(RecycleError::InvalidTable(name.to_string()))
        }
    }

    /// Split column names into (accepted, dropped), preserving order
    pub fn partition_columns<'a, I>(&self, names: I) -> (Vec<&'a str>, Vec<&'a str>)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let (accepted, dropped): (Vec<_>, Vec<_>) =
            names.into_iter().partition(|name| validate_identifier(name));
        for name in &dropped {
            tracing::warn!("Dropping column with unsafe name: {:?}", name);
        }
        (accepted, dropped)
    }
}
