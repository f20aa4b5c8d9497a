use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use reaper_actions::{inventory, ActionExecutor, Ec2Api, InMemoryEc2};
use reaper_core::instance::{DescribeInstancesOutput, Reservation};
use reaper_core::{InstanceRecord, LifecycleState, ReaperConfig};
use reaper_filter::FilterSet;

use crate::policy::{self, Step};

/// Outcome of one sweep over a region.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub selected: usize,
    pub acted: usize,
    pub failed: usize,
}

pub async fn sweep(
    config_path: &Path,
    records_path: &Path,
    region: Option<&str>,
    now: Option<&str>,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let (config, filters) = super::load(config_path)?;
    let region = super::region(&config, region)?;
    let now = super::now(now)?;

    let ec2 = Arc::new(InMemoryEc2::new());
    for record in super::read_records(records_path)? {
        ec2.insert(&region, record).await;
    }

    let summary = run(ec2.clone(), &config, &filters, &region, now).await?;
    println!(
        "{region}: {} selected, {} acted on, {} failed{}",
        summary.selected,
        summary.acted,
        summary.failed,
        if config.dry_run { " (dry run)" } else { "" }
    );

    if let Some(path) = output {
        let records = ec2.describe_instances(&region).await?;
        write_records(path, records)?;
        println!("✓ Wrote {}", path.display());
    }
    Ok(())
}

/// One read → filter → decide → write pass over `region`.
///
/// An instance whose step cannot be decided or whose action fails is
/// logged and counted; the sweep moves on to the next instance.
pub async fn run(
    api: Arc<dyn Ec2Api>,
    config: &ReaperConfig,
    filters: &FilterSet,
    region: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<Summary> {
    let executor = ActionExecutor::new(api.clone()).with_dry_run(config.dry_run);
    let instances = inventory::fetch(api.as_ref(), region).await?;
    let selected = filters.select(&instances);

    let mut summary = Summary {
        selected: selected.len(),
        ..Default::default()
    };
    for instance in selected {
        let step = match policy::decide(instance, &config.notifications, now) {
            Ok(step) => step,
            Err(e) => {
                summary.failed += 1;
                error!(instance = %instance.id(), %region, error = %e, "cannot decide sweep step");
                continue;
            }
        };
        let result = match &step {
            Step::Skip(_) | Step::Wait(_) => continue,
            Step::Mark(stage) => {
                let state = LifecycleState::tracked(stage.clone(), Some(now));
                executor.set_lifecycle_state(instance, &state).await
            }
            Step::Terminate => executor.terminate(instance).await,
        };
        match result {
            Ok(()) => {
                summary.acted += 1;
                info!(instance = %instance.id(), %region, %step, "sweep step applied");
            }
            Err(e) => {
                summary.failed += 1;
                error!(instance = %instance.id(), %region, %step, error = %e, "sweep step failed");
            }
        }
    }
    Ok(summary)
}

fn write_records(path: &Path, records: Vec<InstanceRecord>) -> anyhow::Result<()> {
    let output = DescribeInstancesOutput {
        reservations: vec![Reservation { instances: records }],
    };
    std::fs::write(path, serde_json::to_string_pretty(&output)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use reaper_actions::memory::Call;
    use reaper_core::instance::{StateRecord, TagRecord};
    use reaper_core::{Instance, Stage};

    use super::*;

    const REGION: &str = "us-east-1";

    fn record(id: &str, tags: &[(&str, &str)]) -> InstanceRecord {
        InstanceRecord {
            instance_id: Some(id.to_string()),
            instance_type: Some("t3.micro".to_string()),
            launch_time: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            state: Some(StateRecord {
                code: Some(16),
                name: Some("running".to_string()),
            }),
            tags: tags.iter().map(|(k, v)| TagRecord::new(k, v)).collect(),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 1, 10, 12, 0, 0).unwrap()
    }

    async fn fleet() -> Arc<InMemoryEc2> {
        let ec2 = Arc::new(InMemoryEc2::new());
        ec2.insert(REGION, record("i-new", &[])).await;
        ec2.insert(REGION, record("i-due", &[("REAPER", "notify2|2020-01-01 12:00AM UTC")]))
            .await;
        ec2.insert(REGION, record("i-waiting", &[("REAPER", "start|2020-01-10 11:00AM UTC")]))
            .await;
        ec2.insert(REGION, record("i-spared", &[("REAPER_SPARE_ME", "true")])).await;
        ec2
    }

    fn live_config() -> (ReaperConfig, FilterSet) {
        let mut config = ReaperConfig::scaffold(&[REGION]);
        config.dry_run = false;
        let filters = FilterSet::from_specs(&config.filters).unwrap();
        (config, filters)
    }

    async fn instance(ec2: &InMemoryEc2, id: &str) -> Instance {
        Instance::from_record(REGION, &ec2.record(REGION, id).await.unwrap()).unwrap()
    }

    #[tokio::test]
    async fn sweep_applies_one_step_per_instance() {
        let ec2 = fleet().await;
        let (config, filters) = live_config();

        let summary = run(ec2.clone(), &config, &filters, REGION, now()).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                selected: 4,
                acted: 2,
                failed: 0
            }
        );

        let fresh = instance(&ec2, "i-new").await;
        assert_eq!(fresh.lifecycle(), &LifecycleState::tracked(Stage::Start, Some(now())));
        assert_eq!(instance(&ec2, "i-due").await.state().label(), "shutting-down");
        assert_eq!(
            instance(&ec2, "i-waiting").await.lifecycle().stage(),
            Some(&Stage::Start)
        );
        assert!(!instance(&ec2, "i-spared").await.lifecycle().is_tracked());
    }

    #[tokio::test]
    async fn undecidable_instance_does_not_stop_the_sweep() {
        let ec2 = fleet().await;
        ec2.insert(REGION, record("i-future", &[("REAPER", "notify2|9999-01-01 12:00AM UTC")]))
            .await;
        let (mut config, filters) = live_config();
        config.notifications.terminate = "9223372036854000s".to_string();

        let summary = run(ec2.clone(), &config, &filters, REGION, now()).await.unwrap();
        assert_eq!(
            summary,
            Summary {
                selected: 5,
                acted: 1,
                failed: 1
            }
        );
        assert_eq!(
            instance(&ec2, "i-new").await.lifecycle().stage(),
            Some(&Stage::Start)
        );
        assert_eq!(instance(&ec2, "i-future").await.state().label(), "running");
    }

    #[tokio::test]
    async fn dry_run_reads_but_never_writes() {
        let ec2 = fleet().await;
        let (mut config, filters) = live_config();
        config.dry_run = true;

        let summary = run(ec2.clone(), &config, &filters, REGION, now()).await.unwrap();
        assert_eq!(summary.acted, 2);
        assert_eq!(
            ec2.calls().await,
            vec![Call::Describe {
                region: REGION.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn records_round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("after.json");
        write_records(&path, vec![record("i-1", &[("REAPER", "start|")])]).unwrap();

        let records = super::super::read_records(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].instance_id.as_deref(), Some("i-1"));
        assert_eq!(records[0].tags, vec![TagRecord::new("REAPER", "start|")]);
    }
}
