//! Cost monitoring API: status, activation and per-cluster cost data.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use super::AppState;
use crate::costs::CostDataQuery;
use crate::error::AppError;
use crate::validation::{to_utc_date, validate_cluster_name};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

#[derive(Debug, Default, Deserialize)]
pub struct CostDataParams {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// `GET /api/cost-monitoring`
pub async fn cost_monitoring_status(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let active = state.costs.is_active().await?;
    Ok(Json(json!({ "active": active })))
}

/// `PUT /api/cost-monitoring`
pub async fn activate_cost_monitoring(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.costs.activate().await?;
    info!(tags = ?state.costs.cost_allocation_tags(), "Cost monitoring activated");
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/cost-monitoring/clusters/:cluster_name?start=..&end=..`
pub async fn get_cost_data_for(
    State(state): State<AppState>,
    Path(cluster_name): Path<String>,
    Query(params): Query<CostDataParams>,
) -> Result<Response, AppError> {
    validate_cluster_name(&cluster_name)?;

    // A missing start is reported by the client together with any other missing field
    let start = non_blank(params.start.as_deref()).map(to_utc_date).transpose()?;
    let end = match non_blank(params.end.as_deref()) {
        Some(end) => to_utc_date(end)?,
        None => Utc::now().date_naive(),
    };

    let query = CostDataQuery::new(Some(cluster_name), start, Some(end));
    let costs = state.costs.get_cost_data(&query).await?;

    Ok(cached_response(
        Json(json!({ "costs": costs })),
        state.config.cost_monitoring.cache_max_age_seconds,
        Utc::now(),
    ))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Mark `body` as privately cacheable for `max_age` seconds from `now`
pub fn cached_response(body: impl IntoResponse, max_age: u64, now: DateTime<Utc>) -> Response {
    let mut response = body.into_response();
    let expires = i64::try_from(max_age)
        .ok()
        .and_then(Duration::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(now);

    let headers = response.headers_mut();
    let cache_control = format!("private, immutable, max-age={}", max_age);
    for (name, value) in [
        (header::CACHE_CONTROL, cache_control),
        (header::LAST_MODIFIED, now.format(HTTP_DATE_FORMAT).to_string()),
        (header::EXPIRES, expires.format(HTTP_DATE_FORMAT).to_string()),
    ] {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }

    response
}
