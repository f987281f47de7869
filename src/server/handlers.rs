//! Request handlers for the statistics endpoints.

use crate::models::{PublishReceipt, YearReport};
use crate::publish::ObjectNaming;
use crate::report::ReportMode;
use crate::server::error::ApiResult;
use crate::server::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct YearQuery {
    /// Restrict the report to one budget year.
    pub year: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishQuery {
    pub year: Option<i32>,
    /// Overwrite the `latest` object instead of writing a timestamped one.
    #[serde(default = "default_use_latest", alias = "use_latest")]
    pub use_latest: bool,
}

fn default_use_latest() -> bool {
    true
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Budget Proposal Statistics API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/api/statistics/by-legislator": "Get statistics organized by legislator",
            "/api/statistics/by-department": "Get statistics organized by department",
            "/api/upload/by-legislator": "Generate and publish statistics by legislator",
            "/api/upload/by-department": "Generate and publish statistics by department",
        },
    }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn statistics_by_legislator(
    State(state): State<Arc<AppState>>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<Vec<YearReport>>> {
    statistics(&state, ReportMode::ByLegislator, query).await
}

pub async fn statistics_by_department(
    State(state): State<Arc<AppState>>,
    Query(query): Query<YearQuery>,
) -> ApiResult<Json<Vec<YearReport>>> {
    statistics(&state, ReportMode::ByDepartment, query).await
}

pub async fn upload_by_legislator(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PublishQuery>,
) -> ApiResult<Json<PublishReceipt>> {
    upload(&state, ReportMode::ByLegislator, query).await
}

pub async fn upload_by_department(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PublishQuery>,
) -> ApiResult<Json<PublishReceipt>> {
    upload(&state, ReportMode::ByDepartment, query).await
}

async fn statistics(
    state: &AppState,
    mode: ReportMode,
    query: YearQuery,
) -> ApiResult<Json<Vec<YearReport>>> {
    let reports = state.service.report(mode, query.year).await?;
    Ok(Json(reports))
}

async fn upload(
    state: &AppState,
    mode: ReportMode,
    query: PublishQuery,
) -> ApiResult<Json<PublishReceipt>> {
    info!(
        "Received publish request for {} (year={:?}, use_latest={})",
        mode, query.year, query.use_latest
    );
    let naming = ObjectNaming::from_use_latest(query.use_latest);
    let receipt = state.service.publish(mode, query.year, naming).await?;
    Ok(Json(receipt))
}
