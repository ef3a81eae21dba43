//! Descriptor resolution contract.

use super::api::PathSpec;
use super::error::GatewayError;
use async_trait::async_trait;

/// Turns an external service description document into a path list.
///
/// Implementations report fetch failures as
/// [`GatewayError::DescriptorUnavailable`] and content they cannot
/// understand as [`GatewayError::DescriptorInvalid`].
#[async_trait]
pub trait DescriptorResolver: Send + Sync {
    async fn resolve(&self, endpoint: &str) -> Result<Vec<PathSpec>, GatewayError>;
}
