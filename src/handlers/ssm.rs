use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::json;

use super::AppState;
use crate::error::AppError;
use crate::validation::validate_ssm_ids;

/// `GET /api/ssm/commands/:command_id/instances/:instance_id/output`
///
/// Output is served once: the log stream is deleted after reading.
pub async fn get_command_output(
    State(state): State<AppState>,
    Path((command_id, instance_id)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    validate_ssm_ids(&command_id, &instance_id)?;

    let output = state.ssm_output.read_and_delete(&command_id, &instance_id).await;
    Ok(Json(json!({ "output": output })))
}
