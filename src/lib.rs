// Book Distribution Tracker - Core Library
// Exposes all modules for use in CLI, terminal UI, API server, and tests

pub mod cache;
pub mod config;
pub mod dashboard;    // Inventory + low-stock view
pub mod distribution; // Distribution flow: decrement, log, compensate
pub mod error;
pub mod fields;       // Naming bridge: storage <-> display names
pub mod logging;
pub mod models;
pub mod schema;       // Fixed table definitions + conformance check
pub mod seed;
pub mod setup;        // Setup flow: provision + seed
pub mod store;        // Remote store gateway (NocoDB)

#[cfg(feature = "server")]
pub mod api;

#[cfg(test)]
pub(crate) mod testing;

use anyhow::{bail, Result};

// Re-export commonly used types
pub use config::{AppConfig, CacheConfig, ServerConfig, StoreConfig};
pub use dashboard::{Dashboard, InventoryRow, LowStockRow};
pub use distribution::{
    DistributionForm, DistributionService, LineItem, LineOutcome, LineResult, RollbackStatus,
    SubmissionReport,
};
pub use error::{StoreError, StoreResult, SubmitError};
pub use models::{Book, Devotee, DistributionLogEntry, Product, Record, RecordId};
pub use seed::SeedData;
pub use setup::{SeedOutcome, SeedReport, SetupOrchestrator, TableOutcome, TableReport};
pub use store::{NocoClient, RecordStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Field-registry and write-conformance checks, run before any remote call
pub fn startup_checks() -> Result<()> {
    let mut problems = Vec::new();

    if let Err(errors) = fields::registry().validate(&schema::ALL_TABLES) {
        problems.extend(errors);
    }
    if let Err(errors) = schema::check_conformance() {
        problems.extend(errors);
    }

    if problems.is_empty() {
        return Ok(());
    }

    let details: Vec<String> = problems.iter().map(ToString::to_string).collect();
    bail!("schema checks failed:\n  {}", details.join("\n  "))
}
