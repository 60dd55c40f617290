// 🌱 Seed Data - fixed datasets inserted by the setup flow
// Embedded as CSV under data/ so the lists stay reviewable as plain tables.

use crate::models::{self, NewBook, NewDevotee, NewProduct, Record};
use crate::schema::{self, TableDef};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

const DEVOTEES_CSV: &str = include_str!("../data/devotees.csv");
const BOOKS_CSV: &str = include_str!("../data/books.csv");
const PRODUCTS_CSV: &str = include_str!("../data/products.csv");

pub fn parse_csv<T: DeserializeOwned>(source: &str) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_reader(source.as_bytes());

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize().enumerate() {
        // +2: header line, 1-based numbering
        let row: T = result.with_context(|| format!("Failed to parse seed row on line {}", line + 2))?;
        rows.push(row);
    }

    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedData {
    pub devotees: Vec<NewDevotee>,
    pub books: Vec<NewBook>,
    pub products: Vec<NewProduct>,
}

impl SeedData {
    /// The datasets shipped with the crate
    pub fn builtin() -> Result<Self> {
        Ok(SeedData {
            devotees: parse_csv(DEVOTEES_CSV).context("devotees.csv")?,
            books: parse_csv(BOOKS_CSV).context("books.csv")?,
            products: parse_csv(PRODUCTS_CSV).context("products.csv")?,
        })
    }

    /// Storage records for one of the seeded tables (empty for any other table)
    pub fn records_for(&self, table: &TableDef) -> Result<Vec<Record>, serde_json::Error> {
        match table.name {
            name if name == schema::DEVOTEES.name => to_records(&self.devotees),
            name if name == schema::BOOKS.name => to_records(&self.books),
            name if name == schema::PRODUCTS.name => to_records(&self.products),
            _ => Ok(Vec::new()),
        }
    }
}

fn to_records<T: Serialize>(rows: &[T]) -> Result<Vec<Record>, serde_json::Error> {
    rows.iter().map(models::to_record).collect()
}
