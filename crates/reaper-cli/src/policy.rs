//! Escalation policy: what one sweep does to one selected instance.
//!
//! untracked → start → notify1 → notify2 → terminate, advancing one stage
//! per sweep once the instance has spent the configured delay in its
//! current stage.

use std::fmt;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};

use reaper_core::{Instance, NotificationConfig, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Leave the instance alone.
    Skip(&'static str),
    /// Still inside the current stage's delay.
    Wait(Duration),
    /// Write this stage to the lifecycle tag.
    Mark(Stage),
    Terminate,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Skip(reason) => write!(f, "skip ({reason})"),
            Step::Wait(remaining) => write!(
                f,
                "wait {}h{:02}m",
                remaining.num_hours(),
                remaining.num_minutes() % 60
            ),
            Step::Mark(stage) => write!(f, "mark {stage}"),
            Step::Terminate => f.write_str("terminate"),
        }
    }
}

pub fn decide(
    instance: &Instance,
    notifications: &NotificationConfig,
    now: DateTime<Utc>,
) -> anyhow::Result<Step> {
    if instance.is_whitelisted() {
        return Ok(Step::Skip("whitelisted"));
    }
    let lifecycle = instance.lifecycle();
    let Some(stage) = lifecycle.stage() else {
        return Ok(Step::Mark(Stage::Start));
    };
    let Some(delay) = notifications.delay_for(stage)? else {
        return Ok(Step::Skip("stage does not escalate"));
    };
    // A stage without a timestamp restarts its clock.
    let Some(age) = lifecycle.age(now) else {
        return Ok(Step::Mark(stage.clone()));
    };

    // A far-future tag gives a negative age; keep the arithmetic checked.
    let remaining = Duration::from_std(delay)?
        .checked_sub(&age)
        .with_context(|| format!("stage `{stage}` delay minus age {age} overflows"))?;
    if remaining > Duration::zero() {
        return Ok(Step::Wait(remaining));
    }
    Ok(match stage {
        Stage::Start => Step::Mark(Stage::Notify1),
        Stage::Notify1 => Step::Mark(Stage::Notify2),
        _ => Step::Terminate,
    })
}
