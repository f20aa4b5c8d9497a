//! Fleet inventory: turn provider records into instance snapshots.
//!
//! A record that cannot become an [`Instance`] is logged and skipped so
//! that one bad record never stops the sweep over the rest of the region.

use tracing::{debug, warn};

use reaper_core::{Instance, InstanceRecord};

use crate::client::Ec2Api;
use crate::error::{Action, ActionError, ActionResult};

/// Build snapshots for every usable record.
pub fn from_records(region: &str, records: &[InstanceRecord]) -> Vec<Instance> {
    let instances: Vec<Instance> = records
        .iter()
        .filter_map(|record| match Instance::from_record(region, record) {
            Ok(instance) => Some(instance),
            Err(e) => {
                warn!(
                    %region,
                    instance = record.instance_id.as_deref().unwrap_or("<none>"),
                    error = %e,
                    "skipping unusable instance record"
                );
                None
            }
        })
        .collect();
    debug!(%region, records = records.len(), instances = instances.len(), "inventory built");
    instances
}

/// Fetch a fresh snapshot of every instance in `region`.
pub async fn fetch(api: &dyn Ec2Api, region: &str) -> ActionResult<Vec<Instance>> {
    let records = api
        .describe_instances(region)
        .await
        .map_err(|source| ActionError::Provider {
            action: Action::Describe,
            target: region.to_string(),
            source,
        })?;
    Ok(from_records(region, &records))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use reaper_core::instance::StateRecord;

    use super::*;

    fn record(id: Option<&str>) -> InstanceRecord {
        InstanceRecord {
            instance_id: id.map(str::to_string),
            instance_type: Some("t3.nano".to_string()),
            launch_time: Some(Utc::now()),
            state: Some(StateRecord {
                code: Some(16),
                name: Some("running".to_string()),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn skips_bad_records() {
        let records = vec![record(Some("i-1")), record(None), record(Some("i-2"))];
        let instances = from_records("us-east-1", &records);
        let ids: Vec<_> = instances.iter().map(Instance::id).collect();
        assert_eq!(ids, vec!["i-1", "i-2"]);
    }

    #[test]
    fn empty_region_yields_nothing() {
        assert!(from_records("", &[record(Some("i-1"))]).is_empty());
    }
}
