use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::signing::{sign_request, AwsCredentials, SigningScope};
use crate::costs::ProviderError;

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// A successful call: HTTP status plus decoded body
#[derive(Debug)]
pub struct AwsResponse<T> {
    pub status: u16,
    pub body: T,
}

/// Client for AWS services speaking the JSON 1.1 protocol.
///
/// Every operation is a signed `POST /` with the operation selected by the
/// `X-Amz-Target` header.
#[derive(Debug, Clone)]
pub struct AwsJsonClient {
    http: Client,
    endpoint: url::Url,
    region: String,
    service: String,
    target_prefix: String,
    credentials: AwsCredentials,
    timeout: Duration,
}

impl AwsJsonClient {
    pub fn new(
        http: Client,
        endpoint: &str,
        region: impl Into<String>,
        service: impl Into<String>,
        target_prefix: impl Into<String>,
        credentials: AwsCredentials,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let endpoint = url::Url::parse(endpoint)
            .map_err(|e| ProviderError::transport(format!("Invalid endpoint {}: {}", endpoint, e)))?;

        Ok(Self {
            http,
            endpoint,
            region: region.into(),
            service: service.into(),
            target_prefix: target_prefix.into(),
            credentials,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &url::Url {
        &self.endpoint
    }

    /// Invoke `operation` with `input`, decoding the JSON output.
    ///
    /// Non-2xx responses are decoded from the AWS error body.
    pub async fn call<I, O>(&self, operation: &str, input: &I) -> Result<AwsResponse<O>, ProviderError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let started = Instant::now();
        let result = self.send(operation, input).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        crate::metrics::record_provider_call(&self.service, operation, outcome, started.elapsed());

        result
    }

    async fn send<I, O>(&self, operation: &str, input: &I) -> Result<AwsResponse<O>, ProviderError>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let body = serde_json::to_vec(input)
            .map_err(|e| ProviderError::transport(format!("Failed to serialize {}: {}", operation, e)))?;
        let target = format!("{}.{}", self.target_prefix, operation);

        let signed_headers = sign_request(
            "POST",
            &self.endpoint,
            &[("content-type", JSON_CONTENT_TYPE), ("x-amz-target", target.as_str())],
            &body,
            &self.credentials,
            &SigningScope {
                region: &self.region,
                service: &self.service,
            },
            chrono::Utc::now(),
        );

        let mut req = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .header("Content-Type", JSON_CONTENT_TYPE)
            .header("X-Amz-Target", &target);
        for (key, value) in &signed_headers {
            req = req.header(key.as_str(), value.as_str());
        }

        debug!(service = %self.service, operation, "Sending AWS request");

        let response = req.body(body).send().await.map_err(|e| {
            warn!(service = %self.service, operation, error = %e, "AWS request failed");
            ProviderError::transport(format!("{} request failed: {}", operation, e))
        })?;

        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| {
            ProviderError::new(Some(status), None, format!("Failed to read {} response: {}", operation, e))
        })?;

        if !(200..300).contains(&status) {
            let err = parse_error(status, &bytes);
            warn!(
                service = %self.service,
                operation,
                status,
                code = err.code.as_deref().unwrap_or("-"),
                message = %err.message,
                "AWS returned an error"
            );
            return Err(err);
        }

        // Some operations (e.g. DeleteLogStream) answer with an empty body
        let slice: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
        let body = serde_json::from_slice(slice).map_err(|e| {
            ProviderError::new(Some(status), None, format!("Invalid {} response: {}", operation, e))
        })?;

        Ok(AwsResponse { status, body })
    }
}

/// Decode an AWS JSON error body.
///
/// `__type` may be namespaced (`com.amazon...#Code`); only the code is kept.
pub fn parse_error(status: u16, body: &[u8]) -> ProviderError {
    let value: serde_json::Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(_) => {
            let text = String::from_utf8_lossy(body).trim().to_string();
            let message = if text.is_empty() {
                format!("HTTP {}", status)
            } else {
                text
            };
            return ProviderError::new(Some(status), None, message);
        }
    };

    let code = value
        .get("__type")
        .and_then(|v| v.as_str())
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string());
    let message = value
        .get("message")
        .or_else(|| value.get("Message"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status));

    ProviderError::new(Some(status), code, message)
}
