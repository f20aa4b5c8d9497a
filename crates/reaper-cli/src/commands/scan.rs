use std::path::Path;

use serde::Serialize;
use tracing::error;

use reaper_actions::inventory;
use reaper_core::Instance;

use crate::OutputFormat;
use crate::policy;

#[derive(Serialize)]
struct Row {
    id: String,
    name: String,
    region: String,
    instance_type: String,
    state: String,
    launch_time: String,
    lifecycle: String,
    next: String,
    console_url: Option<String>,
}

pub fn scan(
    config_path: &Path,
    records_path: &Path,
    region: Option<&str>,
    now: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let (config, filters) = super::load(config_path)?;
    let region = super::region(&config, region)?;
    let now = super::now(now)?;
    let instances = inventory::from_records(&region, &super::read_records(records_path)?);

    let rows: Vec<Row> = filters
        .select(&instances)
        .into_iter()
        .map(|instance| {
            let next = match policy::decide(instance, &config.notifications, now) {
                Ok(step) => step.to_string(),
                Err(e) => {
                    error!(instance = %instance.id(), region = %instance.region(), error = %e, "cannot decide next step");
                    format!("error ({e})")
                }
            };
            row(instance, next)
        })
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
        OutputFormat::Text => {
            println!("{} of {} instances selected in {region}", rows.len(), instances.len());
            for row in &rows {
                println!(
                    "  {:<20} {:<24} {:<10} {:<40} {}",
                    row.id, row.name, row.state, row.lifecycle, row.next
                );
                if let Some(url) = &row.console_url {
                    println!("    {url}");
                }
            }
        }
    }
    Ok(())
}

fn row(instance: &Instance, next: String) -> Row {
    Row {
        id: instance.id().to_string(),
        name: instance.name().to_string(),
        region: instance.region().to_string(),
        instance_type: instance.instance_type().to_string(),
        state: instance.state().to_string(),
        launch_time: instance.launch_time().to_rfc3339(),
        lifecycle: instance.lifecycle().to_string(),
        next,
        console_url: instance.console_url().map(|u| u.to_string()),
    }
}
