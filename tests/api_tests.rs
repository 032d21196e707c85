//! Router-level tests: authentication, cost monitoring endpoints, SSM output
//! and error mapping, with in-process fakes standing in for AWS.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use cost_console::{
    config::Config,
    costs::{
        transport::{DateInterval, MetricValue},
        BillingTransport, CostAllocationTag, CostAndUsagePage, CostAndUsageRequest,
        CostExplorerClient, ProviderError, ResultByTime, TagActivationError, TagListPage,
        TagStatus, TagStatusUpdate, TagType,
    },
    handlers::AppState,
    server::create_router,
    ssm::{LogEvent, LogEventsPage, LogsTransport, SsmOutputReader},
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const TEST_CONFIG: &str = r#"
[server]
host = "127.0.0.1"
port = 8080

[[api_keys]]
key = "op-key-001"
name = "admin"
enabled = true

[[api_keys]]
key = "op-key-002"
name = "retired"
enabled = false

[aws]
region = "eu-west-1"
access_key_id = "AKIDEXAMPLE"
secret_access_key = "secret"

[ssm]
log_group_name = "/aws/ssm/test"
"#;

const COMMAND_ID: &str = "0b9d3c5e-1f2a-4b6c-8d7e-9f0a1b2c3d4e";
const INSTANCE_ID: &str = "i-0123456789abcdef0";

#[derive(Default)]
struct FakeBilling {
    tag_status: Option<TagStatus>,
    list_error: Option<ProviderError>,
    activation_errors: Vec<TagActivationError>,
    cost_pages: Mutex<Vec<CostAndUsagePage>>,
    cost_requests: Mutex<Vec<CostAndUsageRequest>>,
    activated: Mutex<Vec<TagStatusUpdate>>,
}

#[async_trait]
impl BillingTransport for FakeBilling {
    async fn update_cost_allocation_tags_status(
        &self,
        tags: Vec<TagStatusUpdate>,
    ) -> Result<Vec<TagActivationError>, ProviderError> {
        self.activated.lock().unwrap().extend(tags);
        Ok(self.activation_errors.clone())
    }

    async fn list_cost_allocation_tags(
        &self,
        tag_keys: &[String],
        tag_type: TagType,
        _next_token: Option<String>,
    ) -> Result<TagListPage, ProviderError> {
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        let tags = match self.tag_status {
            Some(status) => tag_keys
                .iter()
                .map(|key| CostAllocationTag {
                    tag_key: key.clone(),
                    tag_type,
                    status,
                    last_updated_date: None,
                    last_used_date: None,
                })
                .collect(),
            None => Vec::new(),
        };
        Ok(TagListPage { tags, next_token: None })
    }

    async fn get_cost_and_usage(
        &self,
        request: &CostAndUsageRequest,
    ) -> Result<CostAndUsagePage, ProviderError> {
        self.cost_requests.lock().unwrap().push(request.clone());
        let mut pages = self.cost_pages.lock().unwrap();
        if pages.is_empty() {
            Ok(CostAndUsagePage {
                results_by_time: Vec::new(),
                next_page_token: None,
                http_status: 200,
            })
        } else {
            Ok(pages.remove(0))
        }
    }
}

#[derive(Default)]
struct FakeLogs {
    deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl LogsTransport for FakeLogs {
    async fn get_log_events(
        &self,
        _log_group_name: &str,
        _log_stream_name: &str,
        _next_token: Option<String>,
    ) -> Result<LogEventsPage, ProviderError> {
        Ok(LogEventsPage {
            events: vec![
                LogEvent {
                    timestamp: Some(1),
                    message: "hello".to_string(),
                },
                LogEvent {
                    timestamp: Some(2),
                    message: "world\n".to_string(),
                },
            ],
            next_forward_token: Some("f/1".to_string()),
            next_backward_token: Some("b/1".to_string()),
        })
    }

    async fn delete_log_stream(
        &self,
        _log_group_name: &str,
        log_stream_name: &str,
    ) -> Result<(), ProviderError> {
        self.deleted.lock().unwrap().push(log_stream_name.to_string());
        Ok(())
    }
}

fn cost_record(start: &str, end: &str, amount: &str) -> ResultByTime {
    let mut total = HashMap::new();
    total.insert(
        "UnblendedCost".to_string(),
        MetricValue {
            amount: amount.to_string(),
            unit: "USD".to_string(),
        },
    );
    ResultByTime {
        time_period: DateInterval {
            start: start.to_string(),
            end: end.to_string(),
        },
        total,
        estimated: false,
    }
}

fn app_with(billing: Arc<FakeBilling>, logs: Arc<FakeLogs>) -> Router {
    let config: Config = toml::from_str(TEST_CONFIG).unwrap();
    let config = Arc::new(config);

    let costs = CostExplorerClient::new(billing, config.cost_monitoring.tags.clone()).unwrap();
    let ssm_output = SsmOutputReader::new(logs, config.ssm.log_group_name.clone());

    let state = AppState {
        config,
        costs: Arc::new(costs),
        ssm_output: Arc::new(ssm_output),
    };
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();

    create_router(state, Arc::new(handle))
}

fn app(billing: FakeBilling) -> Router {
    app_with(Arc::new(billing), Arc::new(FakeLogs::default()))
}

fn authed(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, "Bearer op-key-001")
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let response = app(FakeBilling::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_api_requires_enabled_key() {
    let app = app(FakeBilling::default());

    let missing = app
        .clone()
        .oneshot(Request::builder().uri("/api/cost-monitoring").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(missing).await;
    assert_eq!(body["error"]["type"], "unauthorized");

    let disabled = app
        .oneshot(
            Request::builder()
                .uri("/api/cost-monitoring")
                .header(header::AUTHORIZATION, "Bearer op-key-002")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(disabled.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_reports_active_tags() {
    let billing = FakeBilling {
        tag_status: Some(TagStatus::Active),
        ..Default::default()
    };

    let response = app(billing)
        .oneshot(authed(Method::GET, "/api/cost-monitoring"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({ "active": true }));
}

#[tokio::test]
async fn test_status_inactive_when_no_tags_or_inactive() {
    for tag_status in [None, Some(TagStatus::Inactive)] {
        let billing = FakeBilling {
            tag_status,
            ..Default::default()
        };
        let response = app(billing)
            .oneshot(authed(Method::GET, "/api/cost-monitoring"))
            .await
            .unwrap();

        assert_eq!(json_body(response).await["active"], false);
    }
}

#[tokio::test]
async fn test_status_inactive_when_cost_explorer_not_enabled() {
    let billing = FakeBilling {
        list_error: Some(ProviderError::new(
            Some(400),
            Some("AccessDeniedException".to_string()),
            "User not enabled for cost explorer access",
        )),
        ..Default::default()
    };

    let response = app(billing)
        .oneshot(authed(Method::GET, "/api/cost-monitoring"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["active"], false);
}

#[tokio::test]
async fn test_status_propagates_other_provider_errors() {
    let billing = FakeBilling {
        list_error: Some(ProviderError::new(
            Some(429),
            Some("LimitExceededException".to_string()),
            "Rate exceeded",
        )),
        ..Default::default()
    };

    let response = app(billing)
        .oneshot(authed(Method::GET, "/api/cost-monitoring"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"]["type"], "upstream_error");
}

#[tokio::test]
async fn test_activate_returns_no_content() {
    let billing = Arc::new(FakeBilling::default());

    let response = app_with(billing.clone(), Arc::new(FakeLogs::default()))
        .oneshot(authed(Method::PUT, "/api/cost-monitoring"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let activated = billing.activated.lock().unwrap();
    assert_eq!(activated.len(), 1);
    assert_eq!(activated[0].tag_key, "parallelcluster:cluster-name");
    assert_eq!(activated[0].status, TagStatus::Active);
}

#[tokio::test]
async fn test_activate_failure_is_server_error() {
    let billing = FakeBilling {
        activation_errors: vec![TagActivationError {
            tag_key: Some("parallelcluster:cluster-name".to_string()),
            code: Some("TagKeysNotFoundException".to_string()),
            message: Some("Tag key not found".to_string()),
        }],
        ..Default::default()
    };

    let response = app(billing)
        .oneshot(authed(Method::PUT, "/api/cost-monitoring"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await["error"]["type"], "activation_failed");
}

#[tokio::test]
async fn test_cost_data_is_sorted_and_cacheable() {
    let billing = Arc::new(FakeBilling {
        cost_pages: Mutex::new(vec![
            CostAndUsagePage {
                results_by_time: vec![cost_record("2023-02-01", "2023-03-01", "35.00")],
                next_page_token: Some("page-2".to_string()),
                http_status: 200,
            },
            CostAndUsagePage {
                results_by_time: vec![cost_record("2023-01-01", "2023-02-01", "42.10")],
                next_page_token: None,
                http_status: 200,
            },
        ]),
        ..Default::default()
    });

    let response = app_with(billing.clone(), Arc::new(FakeLogs::default()))
        .oneshot(authed(
            Method::GET,
            "/api/cost-monitoring/clusters/hpc-01?start=2023-01-01&end=2023-03-01T00:00:00Z",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "private, immutable, max-age=43200"
    );
    assert!(response.headers().contains_key(header::LAST_MODIFIED));
    assert!(response.headers().contains_key(header::EXPIRES));

    let body = json_body(response).await;
    assert_eq!(
        body,
        serde_json::json!({
            "costs": [
                { "period": { "start": "2023-01-01", "end": "2023-02-01" }, "amount": "42.10", "unit": "USD" },
                { "period": { "start": "2023-02-01", "end": "2023-03-01" }, "amount": "35.00", "unit": "USD" },
            ]
        })
    );

    let requests = billing.cost_requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].time_period.start, "2023-01-01");
    assert_eq!(requests[0].time_period.end, "2023-03-01");
    assert_eq!(requests[0].filter.tags.key, "parallelcluster:cluster-name");
    assert_eq!(requests[0].filter.tags.values, vec!["hpc-01".to_string()]);
    assert_eq!(requests[1].next_page_token.as_deref(), Some("page-2"));
}

#[tokio::test]
async fn test_cost_data_validation() {
    let app = app(FakeBilling::default());

    let missing_start = app
        .clone()
        .oneshot(authed(Method::GET, "/api/cost-monitoring/clusters/hpc-01"))
        .await
        .unwrap();
    assert_eq!(missing_start.status(), StatusCode::BAD_REQUEST);
    let body = json_body(missing_start).await;
    assert_eq!(body["error"]["message"], "missing required parameter(s): start");

    let bad_name = app
        .clone()
        .oneshot(authed(Method::GET, "/api/cost-monitoring/clusters/1hpc?start=2023-01-01"))
        .await
        .unwrap();
    assert_eq!(bad_name.status(), StatusCode::BAD_REQUEST);

    let bad_date = app
        .oneshot(authed(Method::GET, "/api/cost-monitoring/clusters/hpc-01?start=last-week"))
        .await
        .unwrap();
    assert_eq!(bad_date.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cost_data_not_active_is_405() {
    struct NotEnabled;

    #[async_trait]
    impl BillingTransport for NotEnabled {
        async fn update_cost_allocation_tags_status(
            &self,
            _tags: Vec<TagStatusUpdate>,
        ) -> Result<Vec<TagActivationError>, ProviderError> {
            Ok(Vec::new())
        }

        async fn list_cost_allocation_tags(
            &self,
            _tag_keys: &[String],
            _tag_type: TagType,
            _next_token: Option<String>,
        ) -> Result<TagListPage, ProviderError> {
            Ok(TagListPage::default())
        }

        async fn get_cost_and_usage(
            &self,
            _request: &CostAndUsageRequest,
        ) -> Result<CostAndUsagePage, ProviderError> {
            Err(ProviderError::new(
                Some(400),
                Some("AccessDeniedException".to_string()),
                "User not enabled for cost explorer access",
            ))
        }
    }

    let config: Config = toml::from_str(TEST_CONFIG).unwrap();
    let config = Arc::new(config);
    let state = AppState {
        costs: Arc::new(CostExplorerClient::new(Arc::new(NotEnabled), config.cost_monitoring.tags.clone()).unwrap()),
        ssm_output: Arc::new(SsmOutputReader::new(Arc::new(FakeLogs::default()), "/aws/ssm/test")),
        config,
    };
    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .build_recorder()
        .handle();

    let response = create_router(state, Arc::new(handle))
        .oneshot(authed(Method::GET, "/api/cost-monitoring/clusters/hpc-01?start=2023-01-01"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "cost_explorer_not_active");
    assert_eq!(body["error"]["message"], "User not enabled for cost explorer access");
}

#[tokio::test]
async fn test_ssm_output_is_read_then_deleted() {
    let logs = Arc::new(FakeLogs::default());

    let response = app_with(Arc::new(FakeBilling::default()), logs.clone())
        .oneshot(authed(
            Method::GET,
            &format!("/api/ssm/commands/{}/instances/{}/output", COMMAND_ID, INSTANCE_ID),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, serde_json::json!({ "output": "hello\nworld" }));
    assert_eq!(
        *logs.deleted.lock().unwrap(),
        vec![format!("{}/{}/aws-runShellScript/stdout", COMMAND_ID, INSTANCE_ID)]
    );
}

#[tokio::test]
async fn test_ssm_output_rejects_bad_ids() {
    let logs = Arc::new(FakeLogs::default());

    let response = app_with(Arc::new(FakeBilling::default()), logs.clone())
        .oneshot(authed(
            Method::GET,
            &format!("/api/ssm/commands/{}/instances/not-an-instance/output", COMMAND_ID),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(logs.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let response = app(FakeBilling::default())
        .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"]["type"], "not_found");
}
