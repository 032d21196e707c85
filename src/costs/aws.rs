use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;
use super::transport::{
    BillingTransport, CostAllocationTag, CostAndUsagePage, CostAndUsageRequest, ResultByTime,
    TagActivationError, TagListPage, TagStatusUpdate, TagType,
};
use crate::aws::AwsJsonClient;

/// Cost Explorer lives in us-east-1 for the commercial partition
pub const COST_EXPLORER_ENDPOINT: &str = "https://ce.us-east-1.amazonaws.com";
pub const COST_EXPLORER_REGION: &str = "us-east-1";
pub const COST_EXPLORER_SERVICE: &str = "ce";
pub const COST_EXPLORER_TARGET_PREFIX: &str = "AWSInsightsIndexService";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateTagsStatusInput {
    cost_allocation_tags_status: Vec<TagStatusUpdate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpdateTagsStatusOutput {
    #[serde(default)]
    errors: Vec<TagActivationError>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ListTagsInput<'a> {
    tag_keys: &'a [String],
    #[serde(rename = "Type")]
    tag_type: TagType,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListTagsOutput {
    #[serde(default)]
    cost_allocation_tags: Vec<CostAllocationTag>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CostAndUsageOutput {
    #[serde(default)]
    results_by_time: Vec<ResultByTime>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// [`BillingTransport`] backed by the AWS Cost Explorer API
pub struct AwsCostExplorer {
    client: AwsJsonClient,
}

impl AwsCostExplorer {
    pub fn new(client: AwsJsonClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BillingTransport for AwsCostExplorer {
    async fn update_cost_allocation_tags_status(
        &self,
        tags: Vec<TagStatusUpdate>,
    ) -> Result<Vec<TagActivationError>, ProviderError> {
        let input = UpdateTagsStatusInput {
            cost_allocation_tags_status: tags,
        };
        let response = self
            .client
            .call::<_, UpdateTagsStatusOutput>("UpdateCostAllocationTagsStatus", &input)
            .await?;
        Ok(response.body.errors)
    }

    async fn list_cost_allocation_tags(
        &self,
        tag_keys: &[String],
        tag_type: TagType,
        next_token: Option<String>,
    ) -> Result<TagListPage, ProviderError> {
        let input = ListTagsInput {
            tag_keys,
            tag_type,
            next_token,
        };
        let response = self
            .client
            .call::<_, ListTagsOutput>("ListCostAllocationTags", &input)
            .await?;
        Ok(TagListPage {
            tags: response.body.cost_allocation_tags,
            next_token: response.body.next_token,
        })
    }

    async fn get_cost_and_usage(
        &self,
        request: &CostAndUsageRequest,
    ) -> Result<CostAndUsagePage, ProviderError> {
        let response = self
            .client
            .call::<_, CostAndUsageOutput>("GetCostAndUsage", request)
            .await?;
        Ok(CostAndUsagePage {
            results_by_time: response.body.results_by_time,
            next_page_token: response.body.next_page_token,
            http_status: response.status,
        })
    }
}
