// 🛠️ Setup Orchestrator - provision the four tables, then seed three of them
//
// Each table is attempted independently: one failure never blocks the rest.
// Seeding is NOT idempotent. Re-running appends duplicate rows; this is kept
// as-is and flagged through `existing_rows` so callers can warn about it.

use crate::error::StoreResult;
use crate::schema::{ALL_TABLES, SEEDED_TABLES};
use crate::seed::SeedData;
use crate::store::RecordStore;
use serde::Serialize;
use tracing::{error, info, warn};

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Created,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    pub table: String,
    pub outcome: TableOutcome,
}

impl TableReport {
    pub fn is_success(&self) -> bool {
        self.outcome == TableOutcome::Created
    }

    pub fn message(&self) -> String {
        match &self.outcome {
            TableOutcome::Created => format!("{} table created successfully.", self.table),
            TableOutcome::Failed { reason } => {
                format!("Error creating {} table: {}", self.table, reason)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeedOutcome {
    /// `existing_rows > 0` means duplicates were appended
    Inserted { rows: usize, existing_rows: usize },
    TableMissing,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub table: String,
    pub outcome: SeedOutcome,
}

impl SeedReport {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, SeedOutcome::Inserted { .. })
    }

    pub fn appended_duplicates(&self) -> bool {
        matches!(self.outcome, SeedOutcome::Inserted { existing_rows, .. } if existing_rows > 0)
    }

    pub fn message(&self) -> String {
        match &self.outcome {
            SeedOutcome::Inserted { rows, existing_rows: 0 } => {
                format!("{} table populated successfully ({} rows).", self.table, rows)
            }
            SeedOutcome::Inserted { rows, existing_rows } => format!(
                "{} table populated ({} rows) but it already had {} rows: duplicates were appended.",
                self.table, rows, existing_rows
            ),
            SeedOutcome::TableMissing => format!(
                "Could not find Table ID for {}. Please create the table first.",
                self.table
            ),
            SeedOutcome::Failed { reason } => {
                format!("Error populating {} table: {}", self.table, reason)
            }
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct SetupOrchestrator<'a, S: RecordStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RecordStore + ?Sized> SetupOrchestrator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        SetupOrchestrator { store }
    }

    /// Resolve the project to its base id
    pub async fn connect(&self, project_name: &str) -> StoreResult<String> {
        let base_id = self.store.resolve_base_id(project_name).await?;
        info!(project = project_name, base_id = %base_id, "connected to project");
        Ok(base_id)
    }

    /// Create Devotees, Books, Products and DistributionLog
    pub async fn provision_schema(&self, base_id: &str) -> Vec<TableReport> {
        let mut reports = Vec::with_capacity(ALL_TABLES.len());

        for table in ALL_TABLES.iter() {
            let outcome = match self.store.create_table(base_id, table).await {
                Ok(()) => {
                    info!(table = table.name, "table created");
                    TableOutcome::Created
                }
                Err(e) => {
                    error!(table = table.name, error = %e, "table creation failed");
                    TableOutcome::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            reports.push(TableReport {
                table: table.name.to_string(),
                outcome,
            });
        }

        reports
    }

    /// Bulk-insert the seed datasets into Devotees, Books and Products
    pub async fn seed_data(&self, base_id: &str, seeds: &SeedData) -> Vec<SeedReport> {
        let mut reports = Vec::with_capacity(SEEDED_TABLES.len());

        for table in SEEDED_TABLES.iter() {
            let outcome = self.seed_table(base_id, table.name, seeds.records_for(table)).await;
            reports.push(SeedReport {
                table: table.name.to_string(),
                outcome,
            });
        }

        reports
    }

    async fn seed_table(
        &self,
        base_id: &str,
        table_name: &str,
        records: Result<Vec<crate::models::Record>, serde_json::Error>,
    ) -> SeedOutcome {
        let table_id = match self.store.resolve_table_id(base_id, table_name).await {
            Ok(id) => id,
            Err(e) if e.is_not_found() => {
                warn!(table = table_name, "table missing, skipping seed");
                return SeedOutcome::TableMissing;
            }
            Err(e) => {
                error!(table = table_name, error = %e, "table lookup failed");
                return SeedOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let records = match records {
            Ok(records) => records,
            Err(e) => {
                return SeedOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        // Best effort: a failed count must not block the insert itself
        let existing_rows = match self.store.list_records(&table_id).await {
            Ok(rows) => rows.len(),
            Err(e) => {
                warn!(table = table_name, error = %e, "could not count existing rows");
                0
            }
        };
        if existing_rows > 0 {
            warn!(
                table = table_name,
                existing_rows, "table already has rows, seeding will append duplicates"
            );
        }

        match self.store.insert_records(&table_id, &records).await {
            Ok(rows) => {
                info!(table = table_name, rows, "table seeded");
                SeedOutcome::Inserted {
                    rows,
                    existing_rows,
                }
            }
            Err(e) => {
                error!(table = table_name, error = %e, "seeding failed");
                SeedOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
