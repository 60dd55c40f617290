//! In-memory `RecordStore` for orchestrator tests, with failure injection.

use crate::error::{StoreError, StoreResult};
use crate::models::{Record, RecordId};
use crate::schema::{columns, TableDef, RECORD_ID};
use crate::store::RecordStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Mutex;

struct MemoryTable {
    id: String,
    base_id: String,
    title: String,
    records: Vec<Record>,
}

#[derive(Default)]
struct MemoryState {
    bases: Vec<(String, String)>,
    tables: Vec<MemoryTable>,
    next_record_id: RecordId,
    patch_calls: usize,
    invalidations: usize,
    fail_create: HashSet<String>,
    fail_insert: HashSet<String>,
    fail_patch_from: Option<usize>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

fn status(code: u16, body: &str) -> StoreError {
    StoreError::Status {
        status: code,
        body: body.to_string(),
    }
}

impl MemoryStore {
    pub const BASE_ID: &'static str = "p_test";

    /// Store with one project titled `project_name`
    pub fn with_project(project_name: &str) -> Self {
        let store = MemoryStore::default();
        store
            .state
            .lock()
            .unwrap()
            .bases
            .push((Self::BASE_ID.to_string(), project_name.to_string()));
        store
    }

    /// Create a table directly, bypassing failure injection
    pub fn add_table(&self, table: &TableDef, rows: Vec<Record>) {
        let mut state = self.state.lock().unwrap();
        let id = format!("tbl_{}", state.tables.len() + 1);
        state.tables.push(MemoryTable {
            id,
            base_id: Self::BASE_ID.to_string(),
            title: table.name.to_string(),
            records: Vec::new(),
        });
        for row in rows {
            Self::append(&mut state, table.name, row);
        }
    }

    fn append(state: &mut MemoryState, title: &str, mut row: Record) {
        state.next_record_id += 1;
        row.insert(RECORD_ID.to_string(), Value::from(state.next_record_id));
        if let Some(table) = state.tables.iter_mut().find(|t| t.title == title) {
            table.records.push(row);
        }
    }

    pub fn fail_create(&self, table_name: &str) {
        self.state.lock().unwrap().fail_create.insert(table_name.to_string());
    }

    pub fn fail_insert(&self, table_name: &str) {
        self.state.lock().unwrap().fail_insert.insert(table_name.to_string());
    }

    /// Every update from the `n`-th call on (0-based) fails
    pub fn fail_patch_from(&self, n: usize) {
        self.state.lock().unwrap().fail_patch_from = Some(n);
    }

    pub fn table_names(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.tables.iter().map(|t| t.title.clone()).collect()
    }

    pub fn records(&self, table_name: &str) -> Vec<Record> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .iter()
            .find(|t| t.title == table_name)
            .map(|t| t.records.clone())
            .unwrap_or_default()
    }

    pub fn stock_of(&self, sku: &str) -> Option<i64> {
        self.records("Products")
            .iter()
            .find(|r| r.get(columns::SKU).and_then(Value::as_str) == Some(sku))
            .and_then(|r| r.get(columns::STOCK_QUANTITY))
            .and_then(Value::as_i64)
    }

    pub fn patch_calls(&self) -> usize {
        self.state.lock().unwrap().patch_calls
    }

    pub fn invalidations(&self) -> usize {
        self.state.lock().unwrap().invalidations
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn resolve_base_id(&self, project_name: &str) -> StoreResult<String> {
        let state = self.state.lock().unwrap();
        state
            .bases
            .iter()
            .find(|(_, title)| title == project_name)
            .map(|(id, _)| id.clone())
            .ok_or_else(|| StoreError::not_found("project", project_name))
    }

    async fn create_table(&self, base_id: &str, table: &TableDef) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_create.contains(table.name) {
            return Err(status(500, "create failed"));
        }
        if state.tables.iter().any(|t| t.base_id == base_id && t.title == table.name) {
            return Err(status(400, "Duplicate table name"));
        }
        let id = format!("tbl_{}", state.tables.len() + 1);
        state.tables.push(MemoryTable {
            id,
            base_id: base_id.to_string(),
            title: table.name.to_string(),
            records: Vec::new(),
        });
        Ok(())
    }

    async fn resolve_table_id(&self, base_id: &str, table_name: &str) -> StoreResult<String> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .iter()
            .find(|t| t.base_id == base_id && t.title == table_name)
            .map(|t| t.id.clone())
            .ok_or_else(|| StoreError::not_found("table", table_name))
    }

    async fn insert_records(&self, table_id: &str, records: &[Record]) -> StoreResult<usize> {
        let mut state = self.state.lock().unwrap();
        let title = state
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .map(|t| t.title.clone())
            .ok_or_else(|| status(404, "no such table"))?;
        if state.fail_insert.contains(&title) {
            return Err(status(500, "insert failed"));
        }
        for record in records {
            Self::append(&mut state, &title, record.clone());
        }
        Ok(records.len())
    }

    async fn list_records(&self, table_id: &str) -> StoreResult<Vec<Record>> {
        let state = self.state.lock().unwrap();
        state
            .tables
            .iter()
            .find(|t| t.id == table_id)
            .map(|t| t.records.clone())
            .ok_or_else(|| status(404, "no such table"))
    }

    async fn update_record(
        &self,
        table_id: &str,
        record_id: RecordId,
        fields: Record,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let call = state.patch_calls;
        state.patch_calls += 1;
        if state.fail_patch_from.is_some_and(|n| call >= n) {
            return Err(status(500, "update failed"));
        }

        let record = state
            .tables
            .iter_mut()
            .find(|t| t.id == table_id)
            .and_then(|t| {
                t.records
                    .iter_mut()
                    .find(|r| r.get(RECORD_ID).and_then(Value::as_i64) == Some(record_id))
            })
            .ok_or_else(|| status(404, "no such record"))?;
        record.extend(fields);
        Ok(())
    }

    fn invalidate_caches(&self) {
        self.state.lock().unwrap().invalidations += 1;
    }
}
