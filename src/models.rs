// 📦 Record Types - Devotees, Books, Products, DistributionLog
//
// Read models deserialize from DISPLAY records (camelCase keys, see fields.rs).
// Write models serialize to STORAGE records (snake_case keys, see schema.rs).

use crate::schema::columns;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// One row as exchanged with the remote store
pub type Record = Map<String, Value>;

/// Remote-assigned record identity
pub type RecordId = i64;

// Remote columns come back as `null` when a cell was never filled
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// READ MODELS (display keys)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Devotee {
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
}

/// A product is one language edition of a book, keyed by SKU
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: RecordId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sku: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub book: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost_price: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selling_price: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stock_quantity: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_stock: i64,
}

impl Product {
    /// At or below the configured threshold
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.min_stock
    }
}

// ============================================================================
// WRITE MODELS (storage keys)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDevotee {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub sku: String,
    pub language: String,
    pub book: String,
    pub cost_price: i64,
    pub selling_price: i64,
    pub stock_quantity: i64,
    pub min_stock: i64,
}

/// Append-only: one row per distributed line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionLogEntry {
    pub devotee: String,
    /// Product SKU
    pub product: String,
    pub quantity: u32,
    /// Serialized as an ISO calendar date (YYYY-MM-DD)
    pub distribution_date: NaiveDate,
}

// ============================================================================
// CONVERSIONS
// ============================================================================

/// Serialize a write model into a storage record
pub fn to_record<T: Serialize>(value: &T) -> Result<Record, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(serde::ser::Error::custom(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Fields for a stock update on a Products row
pub fn stock_patch(stock_quantity: i64) -> Record {
    let mut fields = Record::new();
    fields.insert(columns::STOCK_QUANTITY.to_string(), Value::from(stock_quantity));
    fields
}

/// Parse display records into a read model, skipping rows that do not fit
pub fn parse_records<T: DeserializeOwned>(records: Vec<Record>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<T>(Value::Object(record)) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(error = %e, "skipping malformed record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn display_record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_product_parses_display_keys() {
        let record = display_record(json!({
            "id": 7,
            "sku": "RM-TA-01",
            "language": "Tamil",
            "book": "Ramayan",
            "costPrice": 70,
            "sellingPrice": 120,
            "stockQuantity": 11,
            "minStock": 5,
            "CreatedAt": "2026-01-01 00:00:00"
        }));

        let products: Vec<Product> = parse_records(vec![record]);
        assert_eq!(products.len(), 1);
        let product = &products[0];
        assert_eq!(product.id, 7);
        assert_eq!(product.sku, "RM-TA-01");
        assert_eq!(product.stock_quantity, 11);
        assert_eq!(product.min_stock, 5);
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_null_cells_become_defaults() {
        let record = display_record(json!({
            "id": 1,
            "sku": "X-01",
            "language": null,
            "stockQuantity": null,
            "minStock": 3
        }));

        let products: Vec<Product> = parse_records(vec![record]);
        assert_eq!(products[0].language, "");
        assert_eq!(products[0].stock_quantity, 0);
        assert!(products[0].is_low_stock());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let good = display_record(json!({"id": 1, "name": "Bhakta Ashok"}));
        let bad = display_record(json!({"name": "no id"}));

        let devotees: Vec<Devotee> = parse_records(vec![good, bad]);
        assert_eq!(devotees.len(), 1);
        assert_eq!(devotees[0].name, "Bhakta Ashok");
    }

    #[test]
    fn test_low_stock_boundary() {
        let mut product = Product {
            id: 1,
            sku: "TY-HI-01".to_string(),
            language: "Hindi".to_string(),
            book: "Topmost Yoga".to_string(),
            cost_price: 15,
            selling_price: 30,
            stock_quantity: 10,
            min_stock: 10,
        };
        assert!(product.is_low_stock(), "stock == min is low");

        product.stock_quantity = 11;
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_log_entry_uses_storage_keys() {
        let entry = DistributionLogEntry {
            devotee: "Subuddhi dasa".to_string(),
            product: "BG-TA-01".to_string(),
            quantity: 2,
            distribution_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        };

        let record = to_record(&entry).unwrap();
        assert_eq!(record["devotee"], json!("Subuddhi dasa"));
        assert_eq!(record["product"], json!("BG-TA-01"));
        assert_eq!(record["quantity"], json!(2));
        assert_eq!(record["distribution_date"], json!("2026-10-19"));
    }

    #[test]
    fn test_stock_patch_writes_declared_column() {
        let patch = stock_patch(4);
        assert_eq!(patch.len(), 1);
        assert_eq!(patch["stock_quantity"], json!(4));
    }
}
