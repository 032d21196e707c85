//! Cost monitoring: tag activation, tag status and per-cluster cost data
//! retrieved from AWS Cost Explorer.

pub mod activation;
pub mod aws;
pub mod client;
pub mod error;
pub mod normalize;
pub mod transport;

pub use activation::ActivationState;
pub use aws::AwsCostExplorer;
pub use client::{CostDataQuery, CostExplorerClient, DEFAULT_MAX_PAGES};
pub use error::{translate, translated, CostError, ProviderError};
pub use normalize::{CostPeriod, Period};
pub use transport::{
    BillingTransport, CostAllocationTag, CostAndUsagePage, CostAndUsageRequest, Granularity,
    Metric, ResultByTime, TagActivationError, TagListPage, TagStatus, TagStatusUpdate, TagType,
};

/// Tag keys monitored when none are configured
pub const DEFAULT_COST_ALLOCATION_TAGS: &[&str] = &["parallelcluster:cluster-name"];
