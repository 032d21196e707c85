use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{
    auth,
    aws::{AwsCredentials, AwsJsonClient},
    config::Config,
    costs::{
        aws::{COST_EXPLORER_ENDPOINT, COST_EXPLORER_REGION, COST_EXPLORER_SERVICE, COST_EXPLORER_TARGET_PREFIX},
        AwsCostExplorer, CostExplorerClient,
    },
    handlers::{self, AppState},
    metrics,
    signals::setup_signal_handlers,
    ssm::{AwsLogs, SsmOutputReader, LOGS_SERVICE, LOGS_TARGET_PREFIX},
};

/// Start the cost console server
///
/// This function:
/// 1. Initializes metrics
/// 2. Builds the AWS clients from configuration
/// 3. Sets up signal handlers for graceful shutdown
/// 4. Binds to the configured address and serves until shutdown
pub async fn start_server(config: Config) -> Result<()> {
    info!("Initializing Prometheus metrics...");
    let metrics_handle = Arc::new(metrics::init_metrics()?);

    let config = Arc::new(config);
    let state = build_app_state(config.clone(), reqwest::Client::new())?;

    let (shutdown_tx, signal_handle) = setup_signal_handlers();
    let mut shutdown_rx = shutdown_tx.subscribe();

    let app = create_router(state, metrics_handle);

    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));

    info!("Starting cost console on {}", addr);
    info!(
        "Configuration: {} API keys, cost allocation tags {:?}, SSM log group {}",
        config.api_keys.iter().filter(|k| k.enabled).count(),
        config.cost_monitoring.tags,
        config.ssm.log_group_name
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
            info!("Shutdown signal received, draining connections...");
        })
        .await?;

    signal_handle.await?;
    info!("Server stopped gracefully");

    Ok(())
}

/// Build the Cost Explorer and CloudWatch Logs clients from configuration
pub fn build_app_state(config: Arc<Config>, http_client: reqwest::Client) -> Result<AppState> {
    let credentials = AwsCredentials {
        access_key_id: config.aws.access_key_id.clone(),
        secret_access_key: config.aws.secret_access_key.clone(),
        session_token: config.aws.session_token.clone(),
    };
    let timeout = Duration::from_secs(config.aws.timeout_seconds);

    let cost_explorer = AwsJsonClient::new(
        http_client.clone(),
        config
            .aws
            .cost_explorer_endpoint
            .as_deref()
            .unwrap_or(COST_EXPLORER_ENDPOINT),
        COST_EXPLORER_REGION,
        COST_EXPLORER_SERVICE,
        COST_EXPLORER_TARGET_PREFIX,
        credentials.clone(),
        timeout,
    )?;
    let costs = CostExplorerClient::new(
        Arc::new(AwsCostExplorer::new(cost_explorer)),
        config.cost_monitoring.tags.clone(),
    )?
    .with_max_pages(config.cost_monitoring.max_pages);

    let logs_region = config.ssm.region(&config.aws).to_string();
    let logs_endpoint = config
        .aws
        .logs_endpoint
        .clone()
        .unwrap_or_else(|| AwsLogs::endpoint_for(&logs_region));
    let logs = AwsJsonClient::new(
        http_client,
        &logs_endpoint,
        logs_region,
        LOGS_SERVICE,
        LOGS_TARGET_PREFIX,
        credentials,
        timeout,
    )?;
    let ssm_output = SsmOutputReader::new(Arc::new(AwsLogs::new(logs)), config.ssm.log_group_name.clone());

    Ok(AppState {
        config,
        costs: Arc::new(costs),
        ssm_output: Arc::new(ssm_output),
    })
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: AppState, metrics_handle: Arc<PrometheusHandle>) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/cost-monitoring",
            get(handlers::costs::cost_monitoring_status).put(handlers::costs::activate_cost_monitoring),
        )
        .route(
            "/api/cost-monitoring/clusters/:cluster_name",
            get(handlers::costs::get_cost_data_for),
        )
        .route(
            "/api/ssm/commands/:command_id/instances/:instance_id/output",
            get(handlers::ssm::get_command_output),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth::auth_middleware,
        ))
        .with_state(state);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::metrics_handler::metrics))
        .with_state(metrics_handle)
        .merge(api_routes)
        .fallback(handlers::not_found)
        .layer(middleware::from_fn(handlers::metrics_handler::track_requests))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
}
