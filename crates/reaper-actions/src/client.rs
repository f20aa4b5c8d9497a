//! Provider API boundary.

use async_trait::async_trait;

use reaper_core::InstanceRecord;

/// The provider calls the reaper depends on. One network RPC per call.
#[async_trait]
pub trait Ec2Api: Send + Sync {
    /// List every instance record in a region.
    async fn describe_instances(&self, region: &str) -> anyhow::Result<Vec<InstanceRecord>>;

    /// Upsert tags on one instance.
    async fn create_tags(
        &self,
        region: &str,
        instance_id: &str,
        tags: &[(String, String)],
    ) -> anyhow::Result<()>;

    /// Request a stop; returns the ids that entered `stopping`.
    async fn stop_instances(&self, region: &str, instance_ids: &[String]) -> anyhow::Result<Vec<String>>;

    /// Request termination; returns the ids that entered `shutting-down`.
    async fn terminate_instances(
        &self,
        region: &str,
        instance_ids: &[String],
    ) -> anyhow::Result<Vec<String>>;
}
