//! Billing transport contract and the wire types it exchanges.
//!
//! Field names follow the Cost Explorer JSON protocol so the AWS transport
//! can serialize these types directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagType {
    UserDefined,
    #[serde(rename = "AWSGenerated")]
    AwsGenerated,
}

/// A cost allocation tag as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostAllocationTag {
    pub tag_key: String,
    #[serde(rename = "Type")]
    pub tag_type: TagType,
    pub status: TagStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagStatusUpdate {
    pub tag_key: String,
    pub status: TagStatus,
}

/// Per-tag failure returned by a status update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TagActivationError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagListPage {
    pub tags: Vec<CostAllocationTag>,
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    Daily,
    #[default]
    Monthly,
    Hourly,
}

/// Cost metric selectable in a cost-and-usage query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    AmortizedCost,
    BlendedCost,
    NetAmortizedCost,
    NetUnblendedCost,
    NormalizedUsageAmount,
    #[default]
    UnblendedCost,
    UsageQuantity,
}

impl Metric {
    /// Key used for this metric in a record's `Total` map
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AmortizedCost => "AmortizedCost",
            Self::BlendedCost => "BlendedCost",
            Self::NetAmortizedCost => "NetAmortizedCost",
            Self::NetUnblendedCost => "NetUnblendedCost",
            Self::NormalizedUsageAmount => "NormalizedUsageAmount",
            Self::UnblendedCost => "UnblendedCost",
            Self::UsageQuantity => "UsageQuantity",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateInterval {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchOption {
    Equals,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagValues {
    pub key: String,
    pub values: Vec<String>,
    pub match_options: Vec<MatchOption>,
}

/// Filter expression restricted to the tag-equality form this service issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostFilter {
    pub tags: TagValues,
}

impl CostFilter {
    pub fn tag_equals(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            tags: TagValues {
                key: key.into(),
                values: vec![value.into()],
                match_options: vec![MatchOption::Equals],
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostAndUsageRequest {
    pub time_period: DateInterval,
    pub granularity: Granularity,
    pub filter: CostFilter,
    pub metrics: Vec<Metric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricValue {
    pub amount: String,
    pub unit: String,
}

/// One billing period as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    pub time_period: DateInterval,
    #[serde(default)]
    pub total: HashMap<String, MetricValue>,
    #[serde(default)]
    pub estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostAndUsagePage {
    pub results_by_time: Vec<ResultByTime>,
    pub next_page_token: Option<String>,
    /// Transport-level status of the call that produced this page
    pub http_status: u16,
}

/// The calls the cost client makes against the billing service.
///
/// Implementations own URL construction, authentication and timeouts.
/// They report failures as [`ProviderError`] and never classify them.
#[async_trait]
pub trait BillingTransport: Send + Sync + 'static {
    async fn update_cost_allocation_tags_status(
        &self,
        tags: Vec<TagStatusUpdate>,
    ) -> Result<Vec<TagActivationError>, ProviderError>;

    async fn list_cost_allocation_tags(
        &self,
        tag_keys: &[String],
        tag_type: TagType,
        next_token: Option<String>,
    ) -> Result<TagListPage, ProviderError>;

    async fn get_cost_and_usage(
        &self,
        request: &CostAndUsageRequest,
    ) -> Result<CostAndUsagePage, ProviderError>;
}
