// 📚 Distribution Orchestrator - record book distributions against stock
//
// Per line item, in order:
//   1. look the SKU up in the products loaded for this session (not re-fetched)
//   2. candidate = stock - quantity; negative -> InsufficientStock, no mutation
//   3. patch stock to the candidate
//   4. append the log row; on failure patch stock back to its old value
//
// Decrement happens before the log append so a logged distribution always has
// a matching stock decrement. This is NOT a transaction: between steps 3 and 4
// stock is decremented but unlogged, and a failed compensation is reported,
// never retried.

use crate::error::{StoreResult, SubmitError};
use crate::models::{self, parse_records, Devotee, DistributionLogEntry, Product};
use crate::schema::{DEVOTEES, DISTRIBUTION_LOG, PRODUCTS};
use crate::store::RecordStore;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

// ============================================================================
// SESSION STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: String,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(sku: impl Into<String>, quantity: u32) -> Self {
        LineItem {
            sku: sku.into(),
            quantity,
        }
    }

    fn is_actionable(&self) -> bool {
        !self.sku.is_empty() && self.quantity > 0
    }
}

/// The in-progress distribution of one session
///
/// Starts with a single row: the first product SKU, quantity 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionForm {
    default_sku: String,
    lines: Vec<LineItem>,
}

impl DistributionForm {
    pub fn new(default_sku: impl Into<String>) -> Self {
        let default_sku = default_sku.into();
        let lines = vec![LineItem::new(default_sku.clone(), 1)];
        DistributionForm { default_sku, lines }
    }

    /// Form pre-filled with the given rows
    pub fn with_lines(default_sku: impl Into<String>, lines: Vec<LineItem>) -> Self {
        DistributionForm {
            default_sku: default_sku.into(),
            lines,
        }
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn default_sku(&self) -> &str {
        &self.default_sku
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn add_line(&mut self) {
        self.lines.push(LineItem::new(self.default_sku.clone(), 1));
    }

    pub fn remove_line(&mut self, index: usize) -> Option<LineItem> {
        if index < self.lines.len() {
            Some(self.lines.remove(index))
        } else {
            None
        }
    }

    pub fn set_sku(&mut self, index: usize, sku: impl Into<String>) -> bool {
        match self.lines.get_mut(index) {
            Some(line) => {
                line.sku = sku.into();
                true
            }
            None => false,
        }
    }

    pub fn set_quantity(&mut self, index: usize, quantity: u32) -> bool {
        match self.lines.get_mut(index) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Back to the single default row
    pub fn reset(&mut self) {
        self.lines = vec![LineItem::new(self.default_sku.clone(), 1)];
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RollbackStatus {
    Restored,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LineOutcome {
    Success,
    /// Empty SKU or zero quantity; neither success nor failure
    Skipped,
    ProductNotFound,
    InsufficientStock { available: i64, requested: u32 },
    UpdateFailed { reason: String },
    /// Stock was decremented, the log append failed, compensation attempted
    LogFailed { reason: String, rollback: RollbackStatus },
}

impl LineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LineOutcome::Success)
    }

    pub fn is_failure(&self) -> bool {
        !matches!(self, LineOutcome::Success | LineOutcome::Skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineResult {
    pub sku: String,
    pub quantity: u32,
    pub outcome: LineOutcome,
}

impl LineResult {
    pub fn message(&self) -> String {
        match &self.outcome {
            LineOutcome::Success => format!("Logged {} x {}.", self.quantity, self.sku),
            LineOutcome::Skipped => "Skipped an empty line.".to_string(),
            LineOutcome::ProductNotFound => format!("Product with SKU {} not found.", self.sku),
            LineOutcome::InsufficientStock {
                available,
                requested,
            } => format!(
                "Not enough stock for {}. Available: {}, Tried to distribute: {}",
                self.sku, available, requested
            ),
            LineOutcome::UpdateFailed { reason } => {
                format!("Failed to update stock for {}: {}", self.sku, reason)
            }
            LineOutcome::LogFailed { reason, rollback } => match rollback {
                RollbackStatus::Restored => format!(
                    "Failed to log distribution for {}: {} (stock restored)",
                    self.sku, reason
                ),
                RollbackStatus::Failed { reason: rollback_reason } => format!(
                    "Failed to log distribution for {}: {}; stock restore ALSO failed: {}",
                    self.sku, reason, rollback_reason
                ),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReport {
    pub submission_id: Uuid,
    pub devotee: String,
    pub distribution_date: NaiveDate,
    pub lines: Vec<LineResult>,
}

impl SubmissionReport {
    pub fn successes(&self) -> usize {
        self.lines.iter().filter(|l| l.outcome.is_success()).count()
    }

    pub fn failures(&self) -> usize {
        self.lines.iter().filter(|l| l.outcome.is_failure()).count()
    }

    pub fn summary(&self) -> String {
        match (self.successes(), self.failures()) {
            (0, 0) => "Nothing to distribute.".to_string(),
            (ok, 0) => format!("Successfully logged {} distribution(s).", ok),
            (0, failed) => format!("Encountered {} error(s). Please check messages.", failed),
            (ok, failed) => format!(
                "Successfully logged {} distribution(s). Encountered {} error(s).",
                ok, failed
            ),
        }
    }
}

// ============================================================================
// SERVICE
// ============================================================================

/// Devotees and products loaded for one session, plus the table ids to write to
pub struct DistributionService<'a, S: RecordStore + ?Sized> {
    store: &'a S,
    products_table: Option<String>,
    log_table: Option<String>,
    devotees: Vec<Devotee>,
    products: Vec<Product>,
}

async fn optional_table_id<S: RecordStore + ?Sized>(
    store: &S,
    base_id: &str,
    table_name: &str,
) -> StoreResult<Option<String>> {
    match store.resolve_table_id(base_id, table_name).await {
        Ok(id) => Ok(Some(id)),
        Err(e) if e.is_not_found() => {
            warn!(table = table_name, "table not found");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl<'a, S: RecordStore + ?Sized> DistributionService<'a, S> {
    /// Resolve the three tables and load devotees and products
    ///
    /// Missing tables load as empty; transport and status failures propagate.
    pub async fn load(store: &'a S, base_id: &str) -> StoreResult<Self> {
        let devotees_table = optional_table_id(store, base_id, DEVOTEES.name).await?;
        let products_table = optional_table_id(store, base_id, PRODUCTS.name).await?;
        let log_table = optional_table_id(store, base_id, DISTRIBUTION_LOG.name).await?;

        let devotees = match &devotees_table {
            Some(id) => parse_records(store.fetch_display_records(id).await?),
            None => Vec::new(),
        };
        let products = match &products_table {
            Some(id) => parse_records(store.fetch_display_records(id).await?),
            None => Vec::new(),
        };

        info!(
            devotees = devotees.len(),
            products = products.len(),
            "distribution data loaded"
        );

        Ok(DistributionService {
            store,
            products_table,
            log_table,
            devotees,
            products,
        })
    }

    pub fn devotees(&self) -> &[Devotee] {
        &self.devotees
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn product(&self, sku: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.sku == sku)
    }

    pub fn devotee_names(&self) -> Vec<String> {
        self.devotees.iter().map(|d| d.name.clone()).collect()
    }

    pub fn skus(&self) -> Vec<String> {
        self.products.iter().map(|p| p.sku.clone()).collect()
    }

    /// Both lists loaded; otherwise the setup flow has not been run
    pub fn is_ready(&self) -> bool {
        !self.devotees.is_empty() && !self.products.is_empty()
    }

    /// A fresh form defaulting to the first product
    pub fn new_form(&self) -> DistributionForm {
        DistributionForm::new(self.products.first().map(|p| p.sku.clone()).unwrap_or_default())
    }

    /// Process every line of the form for `devotee`
    ///
    /// Afterwards cached lookups are dropped and the form is reset to its
    /// single default row. The caller reloads to refresh the view.
    pub async fn submit(
        &mut self,
        form: &mut DistributionForm,
        devotee: &str,
        today: NaiveDate,
    ) -> Result<SubmissionReport, SubmitError> {
        if devotee.trim().is_empty() {
            return Err(SubmitError::NoDevotee);
        }
        let log_table = self.log_table.clone().ok_or(SubmitError::LogTableMissing)?;
        let products_table = self
            .products_table
            .clone()
            .ok_or(SubmitError::ProductsTableMissing)?;

        let submission_id = Uuid::new_v4();
        let span = info_span!("submission", %submission_id, devotee);

        let lines = async {
            let mut results = Vec::with_capacity(form.len());
            for line in form.lines() {
                let outcome = self
                    .process_line(&products_table, &log_table, devotee, line, today)
                    .await;
                results.push(LineResult {
                    sku: line.sku.clone(),
                    quantity: line.quantity,
                    outcome,
                });
            }
            results
        }
        .instrument(span)
        .await;

        let report = SubmissionReport {
            submission_id,
            devotee: devotee.to_string(),
            distribution_date: today,
            lines,
        };
        info!(
            %submission_id,
            successes = report.successes(),
            failures = report.failures(),
            "submission processed"
        );

        self.store.invalidate_caches();
        form.reset();
        Ok(report)
    }

    async fn process_line(
        &mut self,
        products_table: &str,
        log_table: &str,
        devotee: &str,
        line: &LineItem,
        today: NaiveDate,
    ) -> LineOutcome {
        if !line.is_actionable() {
            return LineOutcome::Skipped;
        }

        let Some(product) = self.products.iter_mut().find(|p| p.sku == line.sku) else {
            warn!(sku = %line.sku, "product not found");
            return LineOutcome::ProductNotFound;
        };

        let previous = product.stock_quantity;
        let candidate = previous - i64::from(line.quantity);
        if candidate < 0 {
            warn!(sku = %line.sku, available = previous, requested = line.quantity, "insufficient stock");
            return LineOutcome::InsufficientStock {
                available: previous,
                requested: line.quantity,
            };
        }

        if let Err(e) = self
            .store
            .update_record(products_table, product.id, models::stock_patch(candidate))
            .await
        {
            error!(sku = %line.sku, error = %e, "stock update failed");
            return LineOutcome::UpdateFailed {
                reason: e.to_string(),
            };
        }

        let entry = DistributionLogEntry {
            devotee: devotee.to_string(),
            product: line.sku.clone(),
            quantity: line.quantity,
            distribution_date: today,
        };
        let appended = match models::to_record(&entry) {
            Ok(record) => self.store.insert_records(log_table, &[record]).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };

        match appended {
            Ok(()) => {
                // Later lines for the same SKU decrement from the new value
                product.stock_quantity = candidate;
                info!(sku = %line.sku, quantity = line.quantity, stock = candidate, "distribution logged");
                LineOutcome::Success
            }
            Err(e) => {
                error!(sku = %line.sku, error = %e, "log append failed, restoring stock");
                let rollback = match self
                    .store
                    .update_record(products_table, product.id, models::stock_patch(previous))
                    .await
                {
                    Ok(()) => RollbackStatus::Restored,
                    Err(rollback_err) => {
                        error!(sku = %line.sku, error = %rollback_err, "stock restore failed");
                        RollbackStatus::Failed {
                            reason: rollback_err.to_string(),
                        }
                    }
                };
                LineOutcome::LogFailed {
                    reason: e.to_string(),
                    rollback,
                }
            }
        }
    }
}
