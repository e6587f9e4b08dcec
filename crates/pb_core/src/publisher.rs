use async_trait::async_trait;

use crate::types::{PublishRequest, PublishResult};
use crate::Result;

/// A destination blogging service.
///
/// Implementations convert every failure of their own network, file or VCS
/// calls into a [`PublishResult::failure`] instead of returning `Err`. The
/// orchestrator still tolerates an `Err` (or a panic) from a misbehaving
/// implementation and reports it as a failed result for that target only.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Fixed name this capability is registered under (e.g. `"qiita"`).
    fn service_name(&self) -> &str;

    /// Publish one article snapshot.
    async fn publish(&self, request: &PublishRequest) -> Result<PublishResult>;

    /// Connectivity check. Must not fail; any internal error means `false`.
    async fn test_connection(&self) -> bool;
}
