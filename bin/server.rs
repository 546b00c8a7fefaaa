// Shark Tank Insights - Web Server
// REST API over the analytics engine with Axum

use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use shark_tank_insights::{
    AnalyticsEngine, CollaborationGraph, DatasetSource, EdgeWeighting, EngineConfig, EngineError,
    Filters, OptionKind, QueryInfo, RecordFilter, Scalar, SqliteDataset, Table, TabularResult,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Shared application state
struct AppState {
    engine: AnalyticsEngine,
    source: Arc<dyn DatasetSource>,
}

type SharedState = Arc<AppState>;
type QueryParams = Query<Vec<(String, String)>>;

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        let status = match &e {
            EngineError::QueryNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::InvalidFilter { .. } => StatusCode::BAD_REQUEST,
            EngineError::DataUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::InvalidCatalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, "{}", self.message);
        }
        (self.status, Json(ApiResponse::failure(self.message))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

/// Run an engine call off the async runtime
async fn blocking<T, F>(state: SharedState, f: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> Result<T, EngineError> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("worker failed: {}", e),
        })?;
    Ok(Json(ApiResponse::ok(outcome?)))
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/queries - Catalog manifest
async fn list_queries(State(state): State<SharedState>) -> Json<ApiResponse<Vec<QueryInfo>>> {
    Json(ApiResponse::ok(state.engine.list_queries()))
}

/// GET /api/queries/:id?season_from=1&industry=food - Run a catalog query
async fn run_query(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(params): QueryParams,
) -> ApiResult<TabularResult> {
    let filters = Filters::parse(params)?;
    blocking(state, move |s| s.engine.run_query(s.source.as_ref(), &id, &filters)).await
}

/// GET /api/graph?min_shared=2&weight=amount - Collaboration graph
async fn collaboration_graph(
    State(state): State<SharedState>,
    Query(params): QueryParams,
) -> ApiResult<CollaborationGraph> {
    let mut min_shared = None;
    let mut weighting = None;
    for (key, value) in &params {
        match key.as_str() {
            "min_shared" => {
                let n = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| EngineError::invalid_filter("min_shared", format!("expected an integer, got '{}'", value)))?;
                min_shared = Some(n);
            }
            "weight" => weighting = Some(value.parse::<EdgeWeighting>()?),
            other => return Err(EngineError::invalid_filter(other, "unknown graph parameter").into()),
        }
    }
    blocking(state, move |s| {
        s.engine.collaboration_graph(s.source.as_ref(), min_shared, weighting)
    })
    .await
}

/// GET /api/tables/:name?column=value - Raw table browsing
async fn browse_table(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(params): QueryParams,
) -> ApiResult<TabularResult> {
    if name.parse::<Table>().is_err() {
        return Err(ApiError {
            status: StatusCode::NOT_FOUND,
            message: format!("unknown table '{}'", name),
        });
    }
    let filter = params
        .iter()
        .fold(RecordFilter::new(), |f, (column, value)| f.where_eq(column.as_str(), Scalar::infer(value)));

    blocking(state, move |s| s.engine.table(s.source.as_ref(), &name, Some(&filter))).await
}

/// GET /api/options/:kind - Distinct values for a UI selector
async fn filter_options(
    State(state): State<SharedState>,
    Path(kind): Path<String>,
) -> ApiResult<Vec<Scalar>> {
    let kind: OptionKind = kind.parse()?;
    blocking(state, move |s| s.engine.filter_options(s.source.as_ref(), kind)).await
}

/// GET /api/charts/valuations?limit=10 - Top implied valuations
async fn valuation_chart(
    State(state): State<SharedState>,
    Query(params): QueryParams,
) -> ApiResult<TabularResult> {
    let filters = Filters::parse(params)?;
    blocking(state, move |s| s.engine.top_valuations(s.source.as_ref(), filters.limit)).await
}

/// GET /api/charts/strategy - Deals per shark and industry
async fn strategy_chart(State(state): State<SharedState>) -> ApiResult<TabularResult> {
    blocking(state, |s| s.engine.shark_industry_strategy(s.source.as_ref())).await
}

fn app(state: SharedState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/queries", get(list_queries))
        .route("/queries/:id", get(run_query))
        .route("/graph", get(collaboration_graph))
        .route("/tables/:name", get(browse_table))
        .route("/options/:kind", get(filter_options))
        .route("/charts/valuations", get(valuation_chart))
        .route("/charts/strategy", get(strategy_chart))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("🌐 Shark Tank Insights - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let db_path = std::env::var("SHARK_TANK_DB").unwrap_or_else(|_| "shark_tank.db".to_string());
    if !std::path::Path::new(&db_path).exists() {
        eprintln!("❌ Database not found at {:?}", db_path);
        eprintln!("   Run: shark-tank-insights import <csv-dir>");
        eprintln!("   to load the dataset first.");
        std::process::exit(1);
    }

    let config = EngineConfig::load_or_default(std::env::var("SHARK_TANK_CONFIG").ok())?;
    let source = SqliteDataset::open(&db_path)?;
    println!("✓ Database opened: {:?}", db_path);

    let state = Arc::new(AppState {
        engine: AnalyticsEngine::new(config)?,
        source: Arc::new(source),
    });

    let addr = std::env::var("SHARK_TANK_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(addr = %addr, queries = state.engine.catalog().len(), "server listening");
    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/queries", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state))
        .await
        .context("Server stopped unexpectedly")?;
    Ok(())
}
