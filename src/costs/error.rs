use super::transport::TagActivationError;

/// Substring Cost Explorer puts in the message when the account never opted in.
const NOT_ENABLED_MARKER: &str = "not enabled for cost explorer";

/// A failure reported by the billing provider or the transport talking to it.
///
/// Carried through to callers unchanged: nothing upstream of
/// [`translate`] reclassifies it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", describe(.status, .code, .message))]
pub struct ProviderError {
    /// HTTP status of the failed call, `None` when no response was received
    pub status: Option<u16>,
    /// Provider error code (e.g. `AccessDeniedException`)
    pub code: Option<String>,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: Option<u16>, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Failure that happened before any HTTP status was available
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(None, None, message)
    }

    /// Whether the provider says Cost Explorer is not enabled for the account
    pub fn is_service_not_enabled(&self) -> bool {
        self.message.to_lowercase().contains(NOT_ENABLED_MARKER)
    }
}

fn describe(status: &Option<u16>, code: &Option<String>, message: &str) -> String {
    match (status, code) {
        (Some(status), Some(code)) => format!("{} ({}): {}", code, status, message),
        (Some(status), None) => format!("provider returned {}: {}", status, message),
        (None, Some(code)) => format!("{}: {}", code, message),
        (None, None) => message.to_string(),
    }
}

/// Errors surfaced by the cost accounting client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CostError {
    /// Client constructed without any cost allocation tag keys
    #[error("cost allocation tags cannot be empty")]
    Configuration,

    /// Required cost query arguments were absent
    #[error("missing required parameter(s): {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    /// The provider rejected activation for one or more tags
    #[error("Unable to activate cost monitoring, errors: {0:?}")]
    Activation(Vec<TagActivationError>),

    /// Cost Explorer is not enabled for this account
    #[error("{0}")]
    ServiceNotActive(String),

    /// Pagination did not terminate within the configured page budget
    #[error("cost data pagination did not finish after {0} pages")]
    PageLimitExceeded(usize),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Classify a provider failure.
///
/// "Service not enabled" becomes [`CostError::ServiceNotActive`]; anything
/// else is passed through as [`CostError::Provider`] untouched.
pub fn translate(err: ProviderError) -> CostError {
    if err.is_service_not_enabled() {
        CostError::ServiceNotActive(err.message)
    } else {
        CostError::Provider(err)
    }
}

/// Apply [`translate`] to the outcome of a provider call
pub fn translated<T>(result: Result<T, ProviderError>) -> Result<T, CostError> {
    result.map_err(translate)
}
