//! Read-only HTTP surface over one detection run.
//!
//! The run happens once at startup; handlers only read the resulting
//! [`DetectionReport`] from shared state. A failed run does not stop the
//! server: price and event endpoints keep working and change point
//! endpoints answer with the mapped error.

pub mod config;
pub mod request_id;
pub mod routes;

use std::sync::Arc;

use analysis_core::{DetectionError, EventCatalog, Series};
use analysis_orchestrator::{DetectionPipeline, DetectionReport};
use axum::{
    http::{Request, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;

/// Shared, immutable per-process state
#[derive(Clone)]
pub struct AppState {
    pub prices: Arc<Series>,
    pub events: Arc<EventCatalog>,
    pub report: Arc<Result<DetectionReport, DetectionError>>,
}

impl AppState {
    pub fn new(
        prices: Series,
        events: EventCatalog,
        report: Result<DetectionReport, DetectionError>,
    ) -> Self {
        Self {
            prices: Arc::new(prices),
            events: Arc::new(events),
            report: Arc::new(report),
        }
    }

    pub fn report(&self) -> Result<&DetectionReport, DetectionError> {
        self.report.as_ref().as_ref().map_err(Clone::clone)
    }
}

/// Envelope for health and error bodies
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Handler error carrying the HTTP status to answer with.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    error: anyhow::Error,
}

impl AppError {
    pub fn with_status(status: StatusCode, error: anyhow::Error) -> Self {
        Self { status, error }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(err: &DetectionError) -> StatusCode {
    match err {
        DetectionError::InvalidInput(_)
        | DetectionError::InvalidConfiguration(_)
        | DetectionError::UnsupportedCostModel(_) => StatusCode::BAD_REQUEST,
        DetectionError::NumericInstability(_) => StatusCode::INTERNAL_SERVER_ERROR,
        DetectionError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl<E: Into<anyhow::Error>> From<E> for AppError {
    fn from(err: E) -> Self {
        let error = err.into();
        let status = error
            .downcast_ref::<DetectionError>()
            .map(status_for)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status, error }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.error);
        } else {
            tracing::warn!("Request rejected: {:#}", self.error);
        }
        let body = ApiResponse::<()>::error(format!("{:#}", self.error));
        (self.status, Json(body)).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(routes::data_routes())
        .merge(routes::change_point_routes())
        .with_state(state)
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                tracing::info_span!(
                    "http",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .layer(CorsLayer::permissive())
}

/// Load the data, run detection once and serve until shutdown.
pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ServerConfig::from_env()?;
    tracing::info!(
        "Loading prices from {} ({:?} segmentation, {} cost)",
        config.data.prices.display(),
        config.detection.mode,
        config.detection.segmenter.cost
    );

    let prices = data_loader::load_prices(&config.data.prices)?.series;
    let events = match &config.data.events {
        Some(path) => data_loader::load_events(path)?,
        None => {
            tracing::info!("EVENT_DATA_PATH not set, using built-in key events");
            event_linker::key_events()
        }
    };

    let pipeline = DetectionPipeline::new(config.detection.clone());
    let (series, catalog) = (prices.clone(), events.clone());
    let report = tokio::task::spawn_blocking(move || pipeline.run(&series, &catalog)).await?;
    if let Err(e) = &report {
        tracing::error!("Detection run failed, change point endpoints disabled: {}", e);
    }

    let app = build_router(AppState::new(prices, events, report));
    let addr = config.addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("API server listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing() {
    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "api_server=info,tower_http=info".into())
    };

    if json_logging {
        tracing_subscriber::fmt().json().with_env_filter(env_filter()).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter()).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
