//! Action executor for the reaper's escalation actions.
//!
//! Each method performs exactly one provider call for exactly one
//! instance. In dry-run mode the call is logged and skipped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use reaper_core::{Instance, LifecycleState, REAPER_TAG, WHITELIST_TAG, WHITELIST_VALUE};

use crate::client::Ec2Api;
use crate::error::{Action, ActionError, ActionResult};

/// Performs whitelist, lifecycle, stop, and terminate actions.
#[derive(Clone)]
pub struct ActionExecutor {
    api: Arc<dyn Ec2Api>,
    dry_run: bool,
}

impl ActionExecutor {
    pub fn new(api: Arc<dyn Ec2Api>) -> Self {
        Self {
            api,
            dry_run: false,
        }
    }

    /// Log actions instead of performing them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Exempt an instance from further reaping. Safe to repeat.
    pub async fn whitelist(&self, region: &str, instance_id: &str) -> ActionResult<()> {
        let tags = [(WHITELIST_TAG.to_string(), WHITELIST_VALUE.to_string())];
        self.write_tags(region, instance_id, &tags).await?;
        info!(instance = %instance_id, %region, dry_run = self.dry_run, "instance whitelisted");
        Ok(())
    }

    /// Persist a lifecycle transition in the `REAPER` tag.
    ///
    /// Last writer wins; there is no check against what the tag held before.
    pub async fn set_lifecycle_state(
        &self,
        instance: &Instance,
        state: &LifecycleState,
    ) -> ActionResult<()> {
        let value = reaper_core::try_encode(state)?;
        let tags = [(REAPER_TAG.to_string(), value)];
        self.write_tags(instance.region(), instance.id(), &tags).await?;
        info!(
            instance = %instance.id(),
            region = %instance.region(),
            from = %instance.lifecycle(),
            to = %state,
            dry_run = self.dry_run,
            "lifecycle state written"
        );
        Ok(())
    }

    /// Stop one instance. The provider must confirm exactly one transition.
    pub async fn stop(&self, instance: &Instance) -> ActionResult<()> {
        if self.skip(Action::Stop, instance) {
            return Ok(());
        }
        let ids = [instance.id().to_string()];
        let response = self.api.stop_instances(instance.region(), &ids).await;
        confirm_one(Action::Stop, instance, response)
    }

    /// Same as [`stop`](Self::stop); the provider has no stronger stop.
    pub async fn force_stop(&self, instance: &Instance) -> ActionResult<()> {
        self.stop(instance).await
    }

    /// Terminate one instance. Irreversible.
    pub async fn terminate(&self, instance: &Instance) -> ActionResult<()> {
        if self.skip(Action::Terminate, instance) {
            return Ok(());
        }
        let ids = [instance.id().to_string()];
        let response = self.api.terminate_instances(instance.region(), &ids).await;
        confirm_one(Action::Terminate, instance, response)
    }

    fn skip(&self, action: Action, instance: &Instance) -> bool {
        if self.dry_run {
            info!(instance = %instance.id(), region = %instance.region(), %action, "dry run: skipping");
        }
        self.dry_run
    }

    async fn write_tags(
        &self,
        region: &str,
        instance_id: &str,
        tags: &[(String, String)],
    ) -> ActionResult<()> {
        if self.dry_run {
            debug!(instance = %instance_id, %region, ?tags, "dry run: skipping tag write");
            return Ok(());
        }
        self.api
            .create_tags(region, instance_id, tags)
            .await
            .map_err(|source| ActionError::Provider {
                action: Action::Tag,
                target: instance_id.to_string(),
                source,
            })
    }
}

/// A single-instance transition succeeds only if the provider confirms
/// exactly one instance.
fn confirm_one(
    action: Action,
    instance: &Instance,
    response: anyhow::Result<Vec<String>>,
) -> ActionResult<()> {
    let id = instance.id();
    let region = instance.region();
    let affected = response.map_err(|source| ActionError::Provider {
        action,
        target: id.to_string(),
        source,
    })?;

    if affected.len() != 1 {
        warn!(instance = %id, %region, %action, count = affected.len(), "unexpected transition count");
        return Err(ActionError::UnexpectedCount {
            action,
            instance: id.to_string(),
            count: affected.len(),
        });
    }
    info!(instance = %id, %region, %action, "instance transitioned");
    Ok(())
}
