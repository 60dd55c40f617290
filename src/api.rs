// Book Distribution - JSON API
// Same orchestrators as the terminal UI. Each request body is its own session state.

use crate::dashboard::{Dashboard, InventoryRow, LowStockRow};
use crate::distribution::{DistributionForm, DistributionService, LineItem, SubmissionReport};
use crate::error::{StoreError, SubmitError};
use crate::models::{parse_records, Devotee, Product};
use crate::schema::{DEVOTEES, PRODUCTS};
use crate::seed::SeedData;
use crate::setup::{SeedReport, SetupOrchestrator, TableReport};
use crate::store::RecordStore;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared application state
pub struct AppState<S: ?Sized> {
    store: Arc<S>,
    project_name: Arc<str>,
}

impl<S: ?Sized> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            project_name: Arc::clone(&self.project_name),
        }
    }
}

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: (),
            error: Some(message.into()),
        }
    }
}

/// POST /api/distributions body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionRequest {
    pub devotee: String,
    pub items: Vec<LineItem>,
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    Store(StoreError),
    Submit(SubmitError),
    NotFound(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl From<SubmitError> for ApiError {
    fn from(e: SubmitError) -> Self {
        ApiError::Submit(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Store(e) if e.is_not_found() => (StatusCode::NOT_FOUND, e.to_string()),
            ApiError::Store(e) => {
                error!(error = %e, "remote store call failed");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Submit(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => {
                error!(error = %msg, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg.clone())
            }
        };

        (status, Json(ApiResponse::err(message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

async fn base_id<S: RecordStore + ?Sized>(state: &AppState<S>) -> Result<String, StoreError> {
    SetupOrchestrator::new(&*state.store).connect(&state.project_name).await
}

async fn products_of<S: RecordStore + ?Sized>(state: &AppState<S>) -> Result<Dashboard, StoreError> {
    let base_id = base_id(state).await?;
    let table_id = state.store.resolve_table_id(&base_id, PRODUCTS.name).await?;
    Dashboard::load(&*state.store, &table_id).await
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/setup/tables - Create the four tables
async fn create_tables<S: RecordStore + ?Sized>(State(state): State<AppState<S>>) -> ApiResult<Vec<TableReport>> {
    let base_id = base_id(&state).await?;
    let reports = SetupOrchestrator::new(&*state.store).provision_schema(&base_id).await;
    state.store.invalidate_caches();
    Ok(Json(ApiResponse::ok(reports)))
}

/// POST /api/setup/seed - Insert the seed datasets
async fn seed_tables<S: RecordStore + ?Sized>(State(state): State<AppState<S>>) -> ApiResult<Vec<SeedReport>> {
    let seeds = SeedData::builtin().map_err(|e| ApiError::Internal(format!("seed data: {e:#}")))?;
    let base_id = base_id(&state).await?;
    let reports = SetupOrchestrator::new(&*state.store).seed_data(&base_id, &seeds).await;
    if reports.iter().any(SeedReport::appended_duplicates) {
        warn!("seeding appended duplicate rows");
    }
    state.store.invalidate_caches();
    Ok(Json(ApiResponse::ok(reports)))
}

/// GET /api/devotees
async fn list_devotees<S: RecordStore + ?Sized>(State(state): State<AppState<S>>) -> ApiResult<Vec<Devotee>> {
    let base_id = base_id(&state).await?;
    let table_id = state.store.resolve_table_id(&base_id, DEVOTEES.name).await?;
    let devotees = parse_records(state.store.fetch_display_records(&table_id).await?);
    Ok(Json(ApiResponse::ok(devotees)))
}

/// GET /api/inventory - Every product, dashboard column order
async fn inventory<S: RecordStore + ?Sized>(State(state): State<AppState<S>>) -> ApiResult<Vec<InventoryRow>> {
    let dashboard = products_of(&state).await?;
    Ok(Json(ApiResponse::ok(dashboard.inventory)))
}

/// GET /api/inventory/low-stock - Products at or below min stock
async fn low_stock<S: RecordStore + ?Sized>(State(state): State<AppState<S>>) -> ApiResult<Vec<LowStockRow>> {
    let dashboard = products_of(&state).await?;
    Ok(Json(ApiResponse::ok(dashboard.low_stock)))
}

/// GET /api/products/:sku
async fn get_product<S: RecordStore + ?Sized>(
    State(state): State<AppState<S>>,
    Path(sku): Path<String>,
) -> ApiResult<Product> {
    // Decode URL-encoded SKU
    let sku = urlencoding::decode(&sku)
        .unwrap_or_else(|_| sku.clone().into())
        .into_owned();

    let base_id = base_id(&state).await?;
    let table_id = state.store.resolve_table_id(&base_id, PRODUCTS.name).await?;
    let products: Vec<Product> = parse_records(state.store.fetch_display_records(&table_id).await?);

    products
        .into_iter()
        .find(|p| p.sku == sku)
        .map(|p| Json(ApiResponse::ok(p)))
        .ok_or_else(|| ApiError::NotFound(format!("Product with SKU {} not found.", sku)))
}

/// POST /api/distributions - Record one submission
async fn create_distribution<S: RecordStore + ?Sized>(
    State(state): State<AppState<S>>,
    Json(request): Json<DistributionRequest>,
) -> ApiResult<SubmissionReport> {
    let base_id = base_id(&state).await?;
    let mut service = DistributionService::load(&*state.store, &base_id).await?;

    let default_sku = service.products().first().map(|p| p.sku.clone()).unwrap_or_default();
    let mut form = DistributionForm::with_lines(default_sku, request.items);

    let today = Local::now().date_naive();
    let report = service.submit(&mut form, &request.devotee, today).await?;
    Ok(Json(ApiResponse::ok(report)))
}

// ============================================================================
// Router
// ============================================================================

pub fn router<S: RecordStore + ?Sized + 'static>(store: Arc<S>, project_name: &str) -> Router {
    let state = AppState {
        store,
        project_name: Arc::from(project_name),
    };

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/setup/tables", post(create_tables::<S>))
        .route("/setup/seed", post(seed_tables::<S>))
        .route("/devotees", get(list_devotees::<S>))
        .route("/inventory", get(inventory::<S>))
        .route("/inventory/low-stock", get(low_stock::<S>))
        .route("/products/:sku", get(get_product::<S>))
        .route("/distributions", post(create_distribution::<S>))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
