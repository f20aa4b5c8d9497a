pub mod config;
pub mod decode;
pub mod scan;
pub mod sweep;

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};

use reaper_core::instance::DescribeInstancesOutput;
use reaper_core::{InstanceRecord, ReaperConfig};
use reaper_filter::FilterSet;

/// Load, validate, and compile a config file.
pub fn load(path: &Path) -> anyhow::Result<(ReaperConfig, FilterSet)> {
    let config = ReaperConfig::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config.validate()?;
    let filters = FilterSet::from_specs(&config.filters)?;
    if filters.is_empty() {
        tracing::warn!(config = %path.display(), "no filters configured, nothing will be selected");
    }
    Ok((config, filters))
}

/// Read `describe-instances` JSON output.
pub fn read_records(path: &Path) -> anyhow::Result<Vec<InstanceRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let output: DescribeInstancesOutput = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(output.into_records().collect())
}

/// The requested region, or the first configured one.
pub fn region(config: &ReaperConfig, requested: Option<&str>) -> anyhow::Result<String> {
    requested
        .or_else(|| config.regions.first().map(String::as_str))
        .map(str::to_string)
        .context("no region given and none configured")
}

pub fn now(requested: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match requested {
        Some(raw) => Ok(DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("invalid --now `{raw}`"))?
            .with_timezone(&Utc)),
        None => Ok(Utc::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_falls_back_to_config() {
        let config = ReaperConfig::scaffold(&["eu-west-1", "us-east-1"]);
        assert_eq!(region(&config, None).unwrap(), "eu-west-1");
        assert_eq!(region(&config, Some("ap-south-1")).unwrap(), "ap-south-1");

        let empty = ReaperConfig::scaffold(&[]);
        assert!(region(&empty, None).is_err());
    }

    #[test]
    fn now_parses_rfc3339() {
        let t = now(Some("2020-01-02T03:04:05+01:00")).unwrap();
        assert_eq!(t.to_rfc3339(), "2020-01-02T02:04:05+00:00");
        assert!(now(Some("yesterday")).is_err());
    }
}
