use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the Prometheus recorder and describe all metrics
///
/// Fails if a recorder is already installed for this process.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    init_metric_descriptions();

    Ok(handle)
}

/// Describe all metrics (safe to call more than once)
fn init_metric_descriptions() {
    describe_counter!(
        "cost_console_requests_total",
        "Total number of API requests"
    );
    describe_histogram!(
        "cost_console_request_duration_seconds",
        "API request duration in seconds"
    );
    describe_counter!(
        "cost_provider_calls_total",
        "Total number of AWS API calls"
    );
    describe_histogram!(
        "cost_provider_call_duration_seconds",
        "AWS API call duration in seconds"
    );
    describe_gauge!(
        "cost_console_info",
        "Service version and build information"
    );

    gauge!("cost_console_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

/// Record an API request served by the console
pub fn record_request(endpoint: &str, status: u16, duration: Duration) {
    counter!(
        "cost_console_requests_total",
        "endpoint" => endpoint.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);

    histogram!(
        "cost_console_request_duration_seconds",
        "endpoint" => endpoint.to_string(),
    )
    .record(duration.as_secs_f64());
}

/// Record one AWS API call
pub fn record_provider_call(service: &str, operation: &str, outcome: &str, duration: Duration) {
    counter!(
        "cost_provider_calls_total",
        "service" => service.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string(),
    )
    .increment(1);

    histogram!(
        "cost_provider_call_duration_seconds",
        "service" => service.to_string(),
        "operation" => operation.to_string(),
    )
    .record(duration.as_secs_f64());
}
