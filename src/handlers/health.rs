use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

const SERVICE_NAME: &str = "cost-console";

fn service_status(status: &str) -> Json<Value> {
    Json(json!({
        "status": status,
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Liveness probe, 200 while the process is serving
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, service_status("healthy"))
}

/// Readiness check endpoint
pub async fn readiness_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, service_status("ready"))
}
