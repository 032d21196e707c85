pub mod costs;
pub mod health;
pub mod metrics_handler;
pub mod ssm;

use axum::http::Uri;
use std::sync::Arc;

use crate::config::Config;
use crate::costs::CostExplorerClient;
use crate::error::AppError;
use crate::ssm::SsmOutputReader;

/// Shared state for the authenticated API
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub costs: Arc<CostExplorerClient>,
    pub ssm_output: Arc<SsmOutputReader>,
}

/// Fallback for unmatched routes
pub async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
