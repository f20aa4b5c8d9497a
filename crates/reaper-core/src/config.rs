//! reaper.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::lifecycle::Stage;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReaperConfig {
    /// Provider regions to sweep.
    pub regions: Vec<String>,
    /// Report decisions without acting on them.
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    /// Filters an instance must all satisfy to be selected.
    #[serde(default)]
    pub filters: Vec<FilterSpec>,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// One `[[filters]]` entry: a predicate name and its string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub function: String,
    #[serde(default)]
    pub arguments: Vec<String>,
}

impl FilterSpec {
    pub fn new(function: &str, arguments: &[&str]) -> Self {
        Self {
            function: function.to_string(),
            arguments: arguments.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// How long an instance stays in each escalation stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Delay from `start` to the first notification (e.g. "1d").
    pub first_notification: String,
    /// Delay from `notify1` to the second notification.
    pub second_notification: String,
    /// Delay from `notify2` to termination.
    pub terminate: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            first_notification: "1d".to_string(),
            second_notification: "1d".to_string(),
            terminate: "1d".to_string(),
        }
    }
}

impl NotificationConfig {
    /// How long an instance may sit in `stage` before escalating.
    ///
    /// Stages outside the escalation path (`ignore`, `whitelist`, custom
    /// tokens) never escalate and return `Ok(None)`.
    pub fn delay_for(&self, stage: &Stage) -> ConfigResult<Option<Duration>> {
        let (field, raw) = match stage {
            Stage::Start => ("first_notification", &self.first_notification),
            Stage::Notify1 => ("second_notification", &self.second_notification),
            Stage::Notify2 => ("terminate", &self.terminate),
            Stage::Ignore | Stage::Whitelist | Stage::Custom(_) => return Ok(None),
        };
        parse_duration(raw)
            .filter(|delay| chrono::Duration::from_std(*delay).is_ok())
            .map(Some)
            .ok_or_else(|| ConfigError::Invalid(format!("notifications.{field}: bad duration `{raw}`")))
    }
}

fn default_dry_run() -> bool {
    true
}

impl ReaperConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: ReaperConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Structural checks. Predicate names and arities are checked by
    /// `reaper-filter` when the filter set is built.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.regions.is_empty() {
            return Err(ConfigError::Invalid("at least one region is required".to_string()));
        }
        if let Some(blank) = self.regions.iter().find(|r| r.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("blank region `{blank}`")));
        }
        for stage in [Stage::Start, Stage::Notify1, Stage::Notify2] {
            self.notifications.delay_for(&stage)?;
        }
        Ok(())
    }

    /// Scaffold a dry-run config that selects running, non-autoscaled instances.
    pub fn scaffold(regions: &[&str]) -> Self {
        ReaperConfig {
            regions: regions.iter().map(|r| r.to_string()).collect(),
            dry_run: true,
            filters: vec![
                FilterSpec::new("Running", &["true"]),
                FilterSpec::new("AutoScaled", &["false"]),
            ],
            notifications: NotificationConfig::default(),
        }
    }
}

/// Parse a duration string like "30s", "5m", "2h", "1d".
///
/// A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, scale) = if let Some(n) = s.strip_suffix('d') {
        (n, 86_400)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        (s, 1)
    };
    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(scale))
        .map(Duration::from_secs)
}
