// 📐 Shape Layer - Fixed table schemas
// The four tables the setup flow creates, plus a conformance check that every
// field this crate writes is a declared column of the table it writes to.

use crate::models::{self, DistributionLogEntry, NewBook, NewDevotee, NewProduct};
use chrono::NaiveDate;
use serde::Serialize;

/// Primary key field of every remote record
pub const RECORD_ID: &str = "Id";

/// Storage column names
pub mod columns {
    pub const NAME: &str = "name";
    pub const TITLE: &str = "title";
    pub const AUTHOR: &str = "author";
    pub const SKU: &str = "sku";
    pub const LANGUAGE: &str = "language";
    pub const BOOK: &str = "book";
    pub const COST_PRICE: &str = "cost_price";
    pub const SELLING_PRICE: &str = "selling_price";
    pub const STOCK_QUANTITY: &str = "stock_quantity";
    pub const MIN_STOCK: &str = "min_stock";
    pub const DEVOTEE: &str = "devotee";
    pub const PRODUCT: &str = "product";
    pub const QUANTITY: &str = "quantity";
    pub const DISTRIBUTION_DATE: &str = "distribution_date";
}

// ============================================================================
// COLUMN TYPES
// ============================================================================

/// Remote UI data type (`uidt`) of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnType {
    SingleLineText,
    Number,
    Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub column_name: &'static str,
    pub title: &'static str,
    pub uidt: ColumnType,
}

const fn column(column_name: &'static str, title: &'static str, uidt: ColumnType) -> ColumnDef {
    ColumnDef {
        column_name,
        title,
        uidt,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    pub fn has_column(&self, column_name: &str) -> bool {
        self.columns.iter().any(|c| c.column_name == column_name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.column_name)
    }
}

// ============================================================================
// THE FOUR TABLES
// ============================================================================

pub const DEVOTEES: TableDef = TableDef {
    name: "Devotees",
    columns: &[column(columns::NAME, "Name", ColumnType::SingleLineText)],
};

pub const BOOKS: TableDef = TableDef {
    name: "Books",
    columns: &[
        column(columns::TITLE, "Title", ColumnType::SingleLineText),
        column(columns::AUTHOR, "Author", ColumnType::SingleLineText),
    ],
};

pub const PRODUCTS: TableDef = TableDef {
    name: "Products",
    columns: &[
        column(columns::SKU, "SKU", ColumnType::SingleLineText),
        column(columns::LANGUAGE, "Language", ColumnType::SingleLineText),
        column(columns::BOOK, "Book", ColumnType::SingleLineText),
        column(columns::COST_PRICE, "Cost Price", ColumnType::Number),
        column(columns::SELLING_PRICE, "Selling Price", ColumnType::Number),
        column(columns::STOCK_QUANTITY, "Stock Quantity", ColumnType::Number),
        column(columns::MIN_STOCK, "Min Stock", ColumnType::Number),
    ],
};

pub const DISTRIBUTION_LOG: TableDef = TableDef {
    name: "DistributionLog",
    columns: &[
        column(columns::DEVOTEE, "Devotee", ColumnType::SingleLineText),
        column(columns::PRODUCT, "Product", ColumnType::SingleLineText),
        column(columns::QUANTITY, "Quantity", ColumnType::Number),
        column(columns::DISTRIBUTION_DATE, "Distribution Date", ColumnType::Date),
    ],
};

/// Creation order used by the setup flow
pub const ALL_TABLES: [TableDef; 4] = [DEVOTEES, BOOKS, PRODUCTS, DISTRIBUTION_LOG];

/// Tables that receive seed data
pub const SEEDED_TABLES: [TableDef; 3] = [DEVOTEES, BOOKS, PRODUCTS];

// ============================================================================
// CONFORMANCE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConformanceError {
    pub table: String,
    pub field: String,
    pub message: String,
}

impl ConformanceError {
    pub fn new(table: &str, field: &str, message: impl Into<String>) -> Self {
        ConformanceError {
            table: table.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConformanceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.table, self.field, self.message)
    }
}

impl std::error::Error for ConformanceError {}

pub type ConformanceResult = Result<(), Vec<ConformanceError>>;

/// Check that every written field is a declared column of `table`
pub fn check_fields<'a>(
    table: &TableDef,
    fields: impl IntoIterator<Item = &'a str>,
) -> ConformanceResult {
    let errors: Vec<ConformanceError> = fields
        .into_iter()
        .filter(|field| *field != RECORD_ID && !table.has_column(field))
        .map(|field| ConformanceError::new(table.name, field, "written but not declared"))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_written<T: Serialize>(table: &TableDef, sample: &T, errors: &mut Vec<ConformanceError>) {
    match models::to_record(sample) {
        Ok(record) => {
            if let Err(mut found) = check_fields(table, record.keys().map(String::as_str)) {
                errors.append(&mut found);
            }
        }
        Err(e) => errors.push(ConformanceError::new(table.name, "*", e.to_string())),
    }
}

/// Check every write path of this crate against the fixed schemas
///
/// Covers seed rows, the stock update and the distribution log entry.
pub fn check_conformance() -> ConformanceResult {
    let mut errors = Vec::new();

    check_written(&DEVOTEES, &NewDevotee::default(), &mut errors);
    check_written(&BOOKS, &NewBook::default(), &mut errors);
    check_written(&PRODUCTS, &NewProduct::default(), &mut errors);
    check_written(&PRODUCTS, &models::stock_patch(0), &mut errors);
    check_written(
        &DISTRIBUTION_LOG,
        &DistributionLogEntry {
            devotee: String::new(),
            product: String::new(),
            quantity: 1,
            distribution_date: NaiveDate::MIN,
        },
        &mut errors,
    );

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_writes_conform() {
        let result = check_conformance();
        assert!(result.is_ok(), "conformance errors: {:?}", result);
    }

    #[test]
    fn test_misnamed_stock_field_is_reported() {
        let errors = check_fields(&PRODUCTS, ["Id", "stock_qty"]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "stock_qty");
        assert_eq!(errors[0].to_string(), "[Products] stock_qty: written but not declared");
    }

    #[test]
    fn test_table_column_counts() {
        assert_eq!(DEVOTEES.columns.len(), 1);
        assert_eq!(BOOKS.columns.len(), 2);
        assert_eq!(PRODUCTS.columns.len(), 7);
        assert_eq!(DISTRIBUTION_LOG.columns.len(), 4);
    }

    #[test]
    fn test_distribution_date_is_a_date_column() {
        let date = DISTRIBUTION_LOG
            .columns
            .iter()
            .find(|c| c.column_name == columns::DISTRIBUTION_DATE)
            .unwrap();
        assert_eq!(date.uidt, ColumnType::Date);
        assert_eq!(serde_json::to_value(date.uidt).unwrap(), serde_json::json!("Date"));
    }

    #[test]
    fn test_column_def_serializes_for_create_call() {
        let json = serde_json::to_value(PRODUCTS.columns[3]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"column_name": "cost_price", "title": "Cost Price", "uidt": "Number"})
        );
    }
}
