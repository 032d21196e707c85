use crate::{config::Config, error::AppError, logging::SensitiveValue};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Authentication information attached to each authenticated request
#[derive(Debug, Clone)]
pub struct AuthInfo {
    /// Name of the operator key used for authentication
    pub api_key_name: String,
}

/// Authentication middleware
/// Extracts and validates the Bearer token from the Authorization header
pub async fn auth_middleware(
    State(config): State<Arc<Config>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = extract_bearer_token(auth_header)?;

    let api_key_name = find_api_key(&config, token)
        .ok_or_else(|| {
            tracing::warn!(api_key = %SensitiveValue::new(token), "Rejected request with unknown API key");
            AppError::Unauthorized("Invalid or disabled API key".to_string())
        })?
        .to_string();

    tracing::debug!(api_key_name = %api_key_name, "Request authenticated");
    req.extensions_mut().insert(AuthInfo { api_key_name });

    Ok(next.run(req).await)
}

/// Name of the enabled key matching `token`.
///
/// Every configured key is compared in constant time.
fn find_api_key<'a>(config: &'a Config, token: &str) -> Option<&'a str> {
    let mut found = None;
    for key in &config.api_keys {
        let matches: bool = key.key.as_bytes().ct_eq(token.as_bytes()).into();
        if matches && key.enabled && found.is_none() {
            found = Some(key.name.as_str());
        }
    }
    found
}

/// Extract Bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Result<&str, AppError> {
    const BEARER_PREFIX: &str = "Bearer ";

    let token = auth_header.strip_prefix(BEARER_PREFIX).ok_or_else(|| {
        AppError::Unauthorized("Authorization header must use Bearer scheme".to_string())
    })?;

    if token.is_empty() {
        return Err(AppError::Unauthorized("Bearer token is empty".to_string()));
    }

    Ok(token)
}
