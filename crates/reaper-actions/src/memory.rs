//! In-memory provider.
//!
//! Holds instance records per region and applies tag, stop, and terminate
//! calls to them the way the provider would. Every call is recorded so
//! tests can assert on exactly what was sent.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use reaper_core::instance::{StateRecord, TagRecord};
use reaper_core::{InstanceRecord, ProviderState};

use crate::client::Ec2Api;

/// One call received by [`InMemoryEc2`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Describe { region: String },
    CreateTags {
        region: String,
        instance_id: String,
        tags: Vec<(String, String)>,
    },
    Stop { region: String, instance_ids: Vec<String> },
    Terminate { region: String, instance_ids: Vec<String> },
}

#[derive(Default)]
pub struct InMemoryEc2 {
    regions: RwLock<HashMap<String, Vec<InstanceRecord>>>,
    failing: RwLock<HashSet<String>>,
    calls: RwLock<Vec<Call>>,
}

impl InMemoryEc2 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a record in a region.
    pub async fn insert(&self, region: &str, record: InstanceRecord) {
        let mut regions = self.regions.write().await;
        let records = regions.entry(region.to_string()).or_default();
        records.retain(|r| r.instance_id != record.instance_id);
        records.push(record);
    }

    /// Make every subsequent call against `region` fail.
    pub async fn fail_region(&self, region: &str) {
        self.failing.write().await.insert(region.to_string());
    }

    /// Current record for an instance.
    pub async fn record(&self, region: &str, instance_id: &str) -> Option<InstanceRecord> {
        self.regions
            .read()
            .await
            .get(region)?
            .iter()
            .find(|r| r.instance_id.as_deref() == Some(instance_id))
            .cloned()
    }

    /// Every call received so far, in order.
    pub async fn calls(&self) -> Vec<Call> {
        self.calls.read().await.clone()
    }

    async fn check_region(&self, region: &str) -> anyhow::Result<()> {
        if self.failing.read().await.contains(region) {
            anyhow::bail!("{region}: service unavailable");
        }
        Ok(())
    }

    /// Move each found instance whose state is in `from` to `to`.
    ///
    /// Returns the ids the provider would report back: every found
    /// instance not already past the transition.
    async fn transition(
        &self,
        region: &str,
        instance_ids: &[String],
        from: &[ProviderState],
        to: ProviderState,
        past: &[ProviderState],
    ) -> Vec<String> {
        let mut regions = self.regions.write().await;
        let Some(records) = regions.get_mut(region) else {
            return Vec::new();
        };
        let mut affected = Vec::new();
        for record in records
            .iter_mut()
            .filter(|r| r.instance_id.as_ref().is_some_and(|id| instance_ids.contains(id)))
        {
            let current = record
                .state
                .as_ref()
                .and_then(|s| s.code)
                .map(ProviderState::from_code)
                .unwrap_or(ProviderState::Unknown);
            if past.contains(&current) {
                continue;
            }
            if from.contains(&current) {
                record.state = Some(StateRecord {
                    code: to.code(),
                    name: Some(to.label().to_string()),
                });
            }
            if let Some(id) = &record.instance_id {
                affected.push(id.clone());
            }
        }
        affected
    }
}

#[async_trait]
impl Ec2Api for InMemoryEc2 {
    async fn describe_instances(&self, region: &str) -> anyhow::Result<Vec<InstanceRecord>> {
        self.calls.write().await.push(Call::Describe {
            region: region.to_string(),
        });
        self.check_region(region).await?;
        Ok(self.regions.read().await.get(region).cloned().unwrap_or_default())
    }

    async fn create_tags(
        &self,
        region: &str,
        instance_id: &str,
        tags: &[(String, String)],
    ) -> anyhow::Result<()> {
        self.calls.write().await.push(Call::CreateTags {
            region: region.to_string(),
            instance_id: instance_id.to_string(),
            tags: tags.to_vec(),
        });
        self.check_region(region).await?;

        let mut regions = self.regions.write().await;
        let record = regions
            .get_mut(region)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.instance_id.as_deref() == Some(instance_id))
            })
            .ok_or_else(|| anyhow::anyhow!("instance {instance_id} not found in {region}"))?;

        for (key, value) in tags {
            match record.tags.iter_mut().find(|t| t.key.as_deref() == Some(key.as_str())) {
                Some(existing) => existing.value = Some(value.clone()),
                None => record.tags.push(TagRecord::new(key, value)),
            }
        }
        Ok(())
    }

    async fn stop_instances(&self, region: &str, instance_ids: &[String]) -> anyhow::Result<Vec<String>> {
        self.calls.write().await.push(Call::Stop {
            region: region.to_string(),
            instance_ids: instance_ids.to_vec(),
        });
        self.check_region(region).await?;
        Ok(self
            .transition(
                region,
                instance_ids,
                &[ProviderState::Pending, ProviderState::Running],
                ProviderState::Stopping,
                &[ProviderState::ShuttingDown, ProviderState::Terminated],
            )
            .await)
    }

    async fn terminate_instances(
        &self,
        region: &str,
        instance_ids: &[String],
    ) -> anyhow::Result<Vec<String>> {
        self.calls.write().await.push(Call::Terminate {
            region: region.to_string(),
            instance_ids: instance_ids.to_vec(),
        });
        self.check_region(region).await?;
        Ok(self
            .transition(
                region,
                instance_ids,
                &[
                    ProviderState::Pending,
                    ProviderState::Running,
                    ProviderState::Stopping,
                    ProviderState::Stopped,
                ],
                ProviderState::ShuttingDown,
                &[ProviderState::Terminated],
            )
            .await)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn running(id: &str) -> InstanceRecord {
        InstanceRecord {
            instance_id: Some(id.to_string()),
            instance_type: Some("t3.micro".to_string()),
            launch_time: Some(Utc::now()),
            state: Some(StateRecord {
                code: Some(16),
                name: Some("running".to_string()),
            }),
            ..Default::default()
        }
    }

    fn code(record: &InstanceRecord) -> Option<i32> {
        record.state.as_ref().and_then(|s| s.code)
    }

    #[tokio::test]
    async fn tags_are_upserted() {
        let ec2 = InMemoryEc2::new();
        ec2.insert("us-east-1", running("i-1")).await;

        let tag = |v: &str| vec![("Owner".to_string(), v.to_string())];
        ec2.create_tags("us-east-1", "i-1", &tag("alice")).await.unwrap();
        ec2.create_tags("us-east-1", "i-1", &tag("bob")).await.unwrap();

        let record = ec2.record("us-east-1", "i-1").await.unwrap();
        assert_eq!(record.tags, vec![TagRecord::new("Owner", "bob")]);
        assert!(ec2.create_tags("us-east-1", "i-404", &tag("x")).await.is_err());
    }

    #[tokio::test]
    async fn stop_then_terminate() {
        let ec2 = InMemoryEc2::new();
        ec2.insert("us-east-1", running("i-1")).await;
        let ids = vec!["i-1".to_string()];

        assert_eq!(ec2.stop_instances("us-east-1", &ids).await.unwrap(), ids);
        assert_eq!(code(&ec2.record("us-east-1", "i-1").await.unwrap()), Some(64));

        assert_eq!(ec2.terminate_instances("us-east-1", &ids).await.unwrap(), ids);
        assert_eq!(code(&ec2.record("us-east-1", "i-1").await.unwrap()), Some(32));

        // Already shutting down: stop reports nothing.
        assert!(ec2.stop_instances("us-east-1", &ids).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_are_not_reported() {
        let ec2 = InMemoryEc2::new();
        let ids = vec!["i-missing".to_string()];
        assert!(ec2.stop_instances("us-east-1", &ids).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_region_errors_and_records_call() {
        let ec2 = InMemoryEc2::new();
        ec2.fail_region("eu-west-1").await;
        assert!(ec2.describe_instances("eu-west-1").await.is_err());
        assert_eq!(
            ec2.calls().await,
            vec![Call::Describe {
                region: "eu-west-1".to_string()
            }]
        );
    }
}
