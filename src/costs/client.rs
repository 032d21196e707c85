use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::activation::ActivationState;
use super::error::{translated, CostError, ProviderError};
use super::normalize::{normalize_all, CostPeriod};
use super::transport::{
    BillingTransport, CostAllocationTag, CostAndUsageRequest, CostFilter, DateInterval,
    Granularity, Metric, TagStatus, TagStatusUpdate, TagType,
};

/// Upper bound on provider calls for a single paginated retrieval
pub const DEFAULT_MAX_PAGES: usize = 100;

/// Arguments of a cost-data retrieval.
///
/// The identifying fields are optional so that absent values are reported
/// as a validation error naming each of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostDataQuery {
    pub cluster_name: Option<String>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub granularity: Granularity,
    pub metric: Metric,
}

impl CostDataQuery {
    /// Query with monthly granularity over unblended cost
    pub fn new(cluster_name: Option<String>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self {
            cluster_name,
            start,
            end,
            granularity: Granularity::default(),
            metric: Metric::default(),
        }
    }

    pub fn granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    fn validate(&self) -> Result<(&str, NaiveDate, NaiveDate), CostError> {
        let cluster_name = self.cluster_name.as_deref().filter(|name| !name.trim().is_empty());

        let mut missing = Vec::new();
        if cluster_name.is_none() {
            missing.push("cluster_name");
        }
        if self.start.is_none() {
            missing.push("start");
        }
        if self.end.is_none() {
            missing.push("end");
        }

        match (cluster_name, self.start, self.end) {
            (Some(cluster_name), Some(start), Some(end)) => Ok((cluster_name, start, end)),
            _ => Err(CostError::MissingParameters(missing)),
        }
    }
}

/// Entry point for cost monitoring against the billing service.
///
/// Holds the fixed set of cost allocation tag keys this deployment relies
/// on. Nothing is cached: every call goes to the provider.
pub struct CostExplorerClient {
    transport: Arc<dyn BillingTransport>,
    cost_allocation_tags: Vec<String>,
    max_pages: usize,
}

impl CostExplorerClient {
    /// Create a client for the given tag keys.
    ///
    /// Blank keys are ignored; an empty resulting set is a configuration error.
    pub fn new(
        transport: Arc<dyn BillingTransport>,
        cost_allocation_tags: Vec<String>,
    ) -> Result<Self, CostError> {
        let cost_allocation_tags: Vec<String> = cost_allocation_tags
            .into_iter()
            .filter(|tag| !tag.trim().is_empty())
            .collect();

        if cost_allocation_tags.is_empty() {
            return Err(CostError::Configuration);
        }

        Ok(Self {
            transport,
            cost_allocation_tags,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    /// Override the pagination budget (minimum 1)
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn cost_allocation_tags(&self) -> &[String] {
        &self.cost_allocation_tags
    }

    /// Mark every configured tag key Active on the provider side
    pub async fn activate(&self) -> Result<(), CostError> {
        let updates = self
            .cost_allocation_tags
            .iter()
            .map(|tag| TagStatusUpdate {
                tag_key: tag.clone(),
                status: TagStatus::Active,
            })
            .collect();

        let errors = translated(self.transport.update_cost_allocation_tags_status(updates).await)?;

        if !errors.is_empty() {
            error!(errors = ?errors, "Cost allocation tag activation rejected");
            return Err(CostError::Activation(errors));
        }

        info!(tags = ?self.cost_allocation_tags, "Cost allocation tags activated");
        Ok(())
    }

    /// Whether cost monitoring is active for every configured tag.
    ///
    /// Cost Explorer not being enabled for the account reads as `false`.
    pub async fn is_active(&self) -> Result<bool, CostError> {
        match self.get_cost_monitoring_tags().await {
            Ok(tags) => Ok(ActivationState::from_tags(&tags).is_active()),
            Err(CostError::ServiceNotActive(message)) => {
                debug!(reason = %message, "Cost Explorer not enabled, reporting inactive");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Configured user-defined tags with their provider-reported status
    pub async fn get_cost_monitoring_tags(&self) -> Result<Vec<CostAllocationTag>, CostError> {
        let mut tags = Vec::new();
        let mut next_token: Option<String> = None;

        for _ in 0..self.max_pages {
            let page = translated(
                self.transport
                    .list_cost_allocation_tags(
                        &self.cost_allocation_tags,
                        TagType::UserDefined,
                        next_token.clone(),
                    )
                    .await,
            )?;
            tags.extend(page.tags);

            match continuation(next_token.as_deref(), page.next_token) {
                Some(token) => next_token = Some(token),
                None => return Ok(tags),
            }
        }

        warn!(max_pages = self.max_pages, "Tag listing did not terminate");
        Err(CostError::PageLimitExceeded(self.max_pages))
    }

    /// All cost periods for a cluster, normalized and sorted by start.
    ///
    /// Arguments are validated before any provider call.
    pub async fn get_cost_data(&self, query: &CostDataQuery) -> Result<Vec<CostPeriod>, CostError> {
        let (cluster_name, start, end) = query.validate()?;

        let mut request = CostAndUsageRequest {
            time_period: DateInterval {
                start: start.format("%Y-%m-%d").to_string(),
                end: end.format("%Y-%m-%d").to_string(),
            },
            granularity: query.granularity,
            filter: CostFilter::tag_equals(self.cost_allocation_tags[0].clone(), cluster_name),
            metrics: vec![query.metric],
            next_page_token: None,
        };

        let mut records = Vec::new();
        for page_number in 1..=self.max_pages {
            let page = translated(self.transport.get_cost_and_usage(&request).await)?;

            if !(200..300).contains(&page.http_status) {
                error!(
                    cluster = %cluster_name,
                    status = page.http_status,
                    page = page_number,
                    "Cost and usage request failed"
                );
                return Err(CostError::Provider(ProviderError::new(
                    Some(page.http_status),
                    None,
                    format!("cost and usage request returned status {}", page.http_status),
                )));
            }

            debug!(
                cluster = %cluster_name,
                page = page_number,
                records = page.results_by_time.len(),
                "Fetched cost and usage page"
            );
            records.extend(page.results_by_time);

            match continuation(request.next_page_token.as_deref(), page.next_page_token) {
                Some(token) => request.next_page_token = Some(token),
                None => return Ok(normalize_all(&records, query.metric)),
            }
        }

        error!(
            cluster = %cluster_name,
            max_pages = self.max_pages,
            "Cost and usage pagination did not terminate"
        );
        Err(CostError::PageLimitExceeded(self.max_pages))
    }
}

/// Next token to request, or `None` when pagination is finished.
///
/// A token identical to the one just sent also ends pagination.
fn continuation(previous: Option<&str>, next: Option<String>) -> Option<String> {
    match next {
        Some(token) if token.is_empty() => None,
        Some(token) if previous == Some(token.as_str()) => {
            warn!(token = %token, "Provider repeated continuation token, stopping");
            None
        }
        other => other,
    }
}
