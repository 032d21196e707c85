//! SSM Run Command output, read back from CloudWatch Logs.
//!
//! Commands are sent with CloudWatch output enabled; stdout lands in a log
//! stream named after the command and instance. The stream is deleted once
//! read so output is only ever served once.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::aws::AwsJsonClient;
use crate::costs::ProviderError;

pub const LOGS_SERVICE: &str = "logs";
pub const LOGS_TARGET_PREFIX: &str = "Logs_20140328";

/// Upper bound on GetLogEvents calls for one stream
pub const DEFAULT_MAX_LOG_PAGES: usize = 1000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEvent {
    pub timestamp: Option<i64>,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogEventsPage {
    pub events: Vec<LogEvent>,
    pub next_forward_token: Option<String>,
    pub next_backward_token: Option<String>,
}

/// CloudWatch Logs calls used by [`SsmOutputReader`]
#[async_trait]
pub trait LogsTransport: Send + Sync + 'static {
    async fn get_log_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        next_token: Option<String>,
    ) -> Result<LogEventsPage, ProviderError>;

    async fn delete_log_stream(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
    ) -> Result<(), ProviderError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GetLogEventsInput<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
    start_from_head: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteLogStreamInput<'a> {
    log_group_name: &'a str,
    log_stream_name: &'a str,
}

#[derive(Deserialize)]
struct Empty {}

/// [`LogsTransport`] backed by the CloudWatch Logs API
pub struct AwsLogs {
    client: AwsJsonClient,
}

impl AwsLogs {
    pub fn new(client: AwsJsonClient) -> Self {
        Self { client }
    }

    pub fn endpoint_for(region: &str) -> String {
        format!("https://logs.{}.amazonaws.com", region)
    }
}

#[async_trait]
impl LogsTransport for AwsLogs {
    async fn get_log_events(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
        next_token: Option<String>,
    ) -> Result<LogEventsPage, ProviderError> {
        let input = GetLogEventsInput {
            log_group_name,
            log_stream_name,
            start_from_head: true,
            next_token,
        };
        let response = self.client.call::<_, LogEventsPage>("GetLogEvents", &input).await?;
        Ok(response.body)
    }

    async fn delete_log_stream(
        &self,
        log_group_name: &str,
        log_stream_name: &str,
    ) -> Result<(), ProviderError> {
        let input = DeleteLogStreamInput {
            log_group_name,
            log_stream_name,
        };
        self.client.call::<_, Empty>("DeleteLogStream", &input).await?;
        Ok(())
    }
}

/// Strip the direction prefix (`f/`, `b/`) from a CloudWatch Logs token
pub fn normalize_logs_token(token: &str) -> &str {
    match token.split_once('/') {
        Some((_, rest)) => rest,
        None => token,
    }
}

/// Log stream holding stdout of a `AWS-RunShellScript` invocation
pub fn stdout_log_stream(command_id: &str, instance_id: &str) -> String {
    format!("{}/{}/aws-runShellScript/stdout", command_id, instance_id)
}

pub struct SsmOutputReader {
    logs: Arc<dyn LogsTransport>,
    log_group_name: String,
    max_pages: usize,
}

impl SsmOutputReader {
    pub fn new(logs: Arc<dyn LogsTransport>, log_group_name: impl Into<String>) -> Self {
        Self {
            logs,
            log_group_name: log_group_name.into(),
            max_pages: DEFAULT_MAX_LOG_PAGES,
        }
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Read the stdout of `command_id` on `instance_id`, then delete the stream.
    ///
    /// Failures are logged, never returned: whatever was read before the
    /// failure is returned and the stream is still deleted.
    pub async fn read_and_delete(&self, command_id: &str, instance_id: &str) -> String {
        let log_stream_name = stdout_log_stream(command_id, instance_id);
        info!(
            command_id,
            log_stream = %log_stream_name,
            log_group = %self.log_group_name,
            "Reading SSM command output"
        );

        let mut lines = Vec::new();
        if let Err(e) = self.read_stream(&log_stream_name, &mut lines).await {
            error!(
                command_id,
                log_stream = %log_stream_name,
                log_group = %self.log_group_name,
                error = %e,
                "Failed to read SSM command output"
            );
        }
        self.delete_stream(&log_stream_name).await;

        info!(
            command_id,
            log_stream = %log_stream_name,
            lines = lines.len(),
            "Completed reading SSM command output"
        );
        lines.join("\n")
    }

    async fn read_stream(&self, log_stream_name: &str, lines: &mut Vec<String>) -> Result<(), ProviderError> {
        let mut next_token: Option<String> = None;

        for _ in 0..self.max_pages {
            let page = self
                .logs
                .get_log_events(&self.log_group_name, log_stream_name, next_token.clone())
                .await?;

            lines.extend(
                page.events
                    .iter()
                    .map(|event| event.message.trim())
                    .filter(|message| !message.is_empty())
                    .map(str::to_string),
            );

            let forward = match page.next_forward_token {
                Some(token) if !token.is_empty() => token,
                _ => return Ok(()),
            };
            // The end of the stream is reached when the forward token stops moving
            let exhausted = next_token.as_deref() == Some(forward.as_str())
                || page
                    .next_backward_token
                    .as_deref()
                    .is_some_and(|backward| normalize_logs_token(backward) == normalize_logs_token(&forward));
            if exhausted {
                return Ok(());
            }
            next_token = Some(forward);
        }

        warn!(log_stream = %log_stream_name, max_pages = self.max_pages, "Log pagination did not terminate");
        Ok(())
    }

    async fn delete_stream(&self, log_stream_name: &str) {
        match self.logs.delete_log_stream(&self.log_group_name, log_stream_name).await {
            Ok(()) => info!(
                log_stream = %log_stream_name,
                log_group = %self.log_group_name,
                "Deleted log stream"
            ),
            Err(e) => error!(
                log_stream = %log_stream_name,
                log_group = %self.log_group_name,
                error = %e,
                "Failed to delete log stream"
            ),
        }
    }
}
