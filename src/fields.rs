// 🔤 Naming Bridge - storage names (snake_case) <-> display names (camelCase)
//
// Reads convert every record to display names, so downstream code only ever
// sees camelCase keys. Writes use the storage names declared in schema.rs.

use crate::models::Record;
use crate::schema::{ConformanceError, ConformanceResult, TableDef, RECORD_ID};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Every field name this crate exchanges with the remote store
const FIELD_NAMES: &[(&str, &str)] = &[
    (RECORD_ID, "id"),
    ("name", "name"),
    ("title", "title"),
    ("author", "author"),
    ("sku", "sku"),
    ("language", "language"),
    ("book", "book"),
    ("cost_price", "costPrice"),
    ("selling_price", "sellingPrice"),
    ("stock_quantity", "stockQuantity"),
    ("min_stock", "minStock"),
    ("devotee", "devotee"),
    ("product", "product"),
    ("quantity", "quantity"),
    ("distribution_date", "distributionDate"),
];

/// snake_case -> camelCase
///
/// Total over the field names in this module; not a general case converter.
pub fn to_camel_case(snake: &str) -> String {
    let mut parts = snake.split('_');
    let mut out = parts.next().unwrap_or_default().to_string();

    for part in parts {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(&chars.as_str().to_lowercase());
        }
    }

    out
}

// ============================================================================
// FIELD REGISTRY
// ============================================================================

pub struct FieldRegistry {
    to_display: HashMap<&'static str, &'static str>,
    to_storage: HashMap<&'static str, &'static str>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        FieldRegistry {
            to_display: FIELD_NAMES.iter().copied().collect(),
            to_storage: FIELD_NAMES.iter().map(|&(s, d)| (d, s)).collect(),
        }
    }

    pub fn display_name(&self, storage: &str) -> Option<&'static str> {
        self.to_display.get(storage).copied()
    }

    pub fn storage_name(&self, display: &str) -> Option<&'static str> {
        self.to_storage.get(display).copied()
    }

    /// Rename storage keys to display keys
    ///
    /// Keys outside the table (remote audit columns and the like) pass through.
    pub fn to_display_record(&self, record: Record) -> Record {
        record
            .into_iter()
            .map(|(key, value)| match self.display_name(&key) {
                Some(display) => (display.to_string(), value),
                None => (key, value),
            })
            .collect()
    }

    /// Validate the table against the fixed schema
    ///
    /// Every column needs a mapping that agrees with `to_camel_case`, and no
    /// two storage names may share a display name.
    pub fn validate(&self, tables: &[TableDef]) -> ConformanceResult {
        let mut errors = Vec::new();

        if self.to_storage.len() != self.to_display.len() {
            errors.push(ConformanceError::new(
                "*",
                "*",
                "display names are not unique",
            ));
        }

        for table in tables {
            for column in table.column_names() {
                match self.display_name(column) {
                    None => errors.push(ConformanceError::new(
                        table.name,
                        column,
                        "no display name mapped",
                    )),
                    Some(display) if display != to_camel_case(column) => {
                        errors.push(ConformanceError::new(
                            table.name,
                            column,
                            format!("mapped to '{}', expected '{}'", display, to_camel_case(column)),
                        ))
                    }
                    Some(display) if self.storage_name(display) != Some(column) => {
                        errors.push(ConformanceError::new(
                            table.name,
                            column,
                            format!("'{}' maps back to a different column", display),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Default for FieldRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared registry used by the record store on every read
pub fn registry() -> &'static FieldRegistry {
    static REGISTRY: OnceLock<FieldRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FieldRegistry::new)
}
