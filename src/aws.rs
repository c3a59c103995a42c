//! Shared AWS SDK configuration.
use crate::config::Aws;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use tracing::debug;

/// Build an SDK config from the standard credential chain, pinned to the
/// configured region and optionally pointed at a local endpoint.
pub async fn build_sdk_config(aws: &Aws) -> SdkConfig {
    let mut loader =
        aws_config::defaults(BehaviorVersion::latest()).region(Region::new(aws.region.clone()));

    if let Some(endpoint) = &aws.endpoint_url {
        debug!(endpoint = %endpoint, "using custom AWS endpoint");
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}
