use analysis_core::{Event, Link, PricePoint};
use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::{ApiResponse, AppError, AppState};

/// Body of the change point endpoints
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangePointsResponse {
    pub change_points: Vec<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub observations: usize,
    pub events: usize,
    /// `false` when the startup detection run failed
    pub detection_ready: bool,
}

pub fn data_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/price-data", get(get_price_data))
        .route("/api/events", get(get_events))
}

pub fn change_point_routes() -> Router<AppState> {
    Router::new()
        .route("/api/change-points/bayesian", get(get_bayesian_change_points))
        .route("/api/change-points/segmentation", get(get_segmentation_change_points))
        // Name used by the original dashboard
        .route("/api/change-points/ruptures", get(get_segmentation_change_points))
        .route("/api/change-points/links", get(get_links))
}

async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        observations: state.prices.len(),
        events: state.events.len(),
        detection_ready: state.report.is_ok(),
    }))
}

async fn get_price_data(State(state): State<AppState>) -> Json<Vec<PricePoint>> {
    Json(state.prices.records())
}

async fn get_events(State(state): State<AppState>) -> Json<Vec<Event>> {
    Json(state.events.events().to_vec())
}

async fn get_bayesian_change_points(
    State(state): State<AppState>,
) -> Result<Json<ChangePointsResponse>, AppError> {
    let report = state.report()?;
    Ok(Json(ChangePointsResponse {
        change_points: report.bayesian_change_points(),
    }))
}

async fn get_segmentation_change_points(
    State(state): State<AppState>,
) -> Result<Json<ChangePointsResponse>, AppError> {
    let report = state.report()?;
    Ok(Json(ChangePointsResponse {
        change_points: report.segmentation_change_points().to_vec(),
    }))
}

async fn get_links(State(state): State<AppState>) -> Result<Json<Vec<Link>>, AppError> {
    let report = state.report()?;
    Ok(Json(report.links().into_iter().cloned().collect()))
}
