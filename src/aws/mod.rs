//! Minimal AWS access over reqwest: SigV4 signing and a JSON 1.1 client.

pub mod client;
pub mod signing;

pub use client::{AwsJsonClient, AwsResponse};
pub use signing::AwsCredentials;
