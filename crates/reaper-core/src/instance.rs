//! Instance attribute model.
//!
//! An [`Instance`] is an immutable snapshot of one provider instance, built
//! once per API response from an [`InstanceRecord`]. Nothing here mutates
//! provider state; escalation means writing a new tag and re-reading.
//!
//! [`InstanceRecord`] mirrors the `Reservations[].Instances[]` shape of an
//! EC2 `DescribeInstances` response, so the JSON printed by
//! `aws ec2 describe-instances` deserializes directly.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{ModelError, ModelResult};
use crate::lifecycle::{self, LifecycleState};
use crate::{AUTOSCALING_GROUP_TAG, NAME_TAG, REAPER_TAG, WHITELIST_TAG, WHITELIST_VALUE};

// ── Provider state ─────────────────────────────────────────────────

/// Provider run state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderState {
    Pending,
    Running,
    ShuttingDown,
    Terminated,
    Stopping,
    Stopped,
    /// The provider reported a code outside the documented table.
    Unknown,
}

impl ProviderState {
    /// All documented states, in code order.
    pub const KNOWN: [ProviderState; 6] = [
        ProviderState::Pending,
        ProviderState::Running,
        ProviderState::ShuttingDown,
        ProviderState::Terminated,
        ProviderState::Stopping,
        ProviderState::Stopped,
    ];

    /// Map a provider numeric state code onto a state.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ProviderState::Pending,
            16 => ProviderState::Running,
            32 => ProviderState::ShuttingDown,
            48 => ProviderState::Terminated,
            64 => ProviderState::Stopping,
            80 => ProviderState::Stopped,
            _ => ProviderState::Unknown,
        }
    }

    /// The provider code for this state, if it has one.
    pub fn code(self) -> Option<i32> {
        match self {
            ProviderState::Pending => Some(0),
            ProviderState::Running => Some(16),
            ProviderState::ShuttingDown => Some(32),
            ProviderState::Terminated => Some(48),
            ProviderState::Stopping => Some(64),
            ProviderState::Stopped => Some(80),
            ProviderState::Unknown => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProviderState::Pending => "pending",
            ProviderState::Running => "running",
            ProviderState::ShuttingDown => "shutting-down",
            ProviderState::Terminated => "terminated",
            ProviderState::Stopping => "stopping",
            ProviderState::Stopped => "stopped",
            ProviderState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Provider record ────────────────────────────────────────────────

/// Raw provider instance record, as returned by `DescribeInstances`.
///
/// Every field is optional because the provider omits what it does not
/// know; [`Instance::from_record`] decides which omissions are fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceRecord {
    pub instance_id: Option<String>,
    pub instance_type: Option<String>,
    pub launch_time: Option<DateTime<Utc>>,
    pub state: Option<StateRecord>,
    #[serde(default)]
    pub security_groups: Vec<GroupRecord>,
    #[serde(default)]
    pub tags: Vec<TagRecord>,
    pub public_ip_address: Option<String>,
}

/// `State` block of a provider record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateRecord {
    pub code: Option<i32>,
    pub name: Option<String>,
}

/// One entry of `SecurityGroups`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupRecord {
    pub group_id: Option<String>,
    pub group_name: Option<String>,
}

/// One entry of `Tags`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagRecord {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl TagRecord {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            value: Some(value.to_string()),
        }
    }
}

/// A `DescribeInstances` response page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DescribeInstancesOutput {
    #[serde(default)]
    pub reservations: Vec<Reservation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reservation {
    #[serde(default)]
    pub instances: Vec<InstanceRecord>,
}

impl DescribeInstancesOutput {
    /// Flatten reservations into their instance records.
    pub fn into_records(self) -> impl Iterator<Item = InstanceRecord> {
        self.reservations.into_iter().flat_map(|r| r.instances)
    }
}

// ── Instance ──────────────────────────────────────────────────────

/// Immutable snapshot of one cloud instance's observable attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    id: String,
    region: String,
    name: String,
    tags: HashMap<String, String>,
    state: ProviderState,
    security_groups: HashMap<String, String>,
    instance_type: String,
    public_ip_address: Option<IpAddr>,
    launch_time: DateTime<Utc>,
    lifecycle: LifecycleState,
}

impl Instance {
    /// Build a snapshot from a provider record.
    ///
    /// The region is not part of the record and must come from whoever
    /// issued the `DescribeInstances` call.
    pub fn from_record(region: &str, record: &InstanceRecord) -> ModelResult<Self> {
        if region.is_empty() {
            return Err(ModelError::EmptyField("Region"));
        }
        let id = record
            .instance_id
            .as_deref()
            .ok_or(ModelError::MissingField("InstanceId"))?;
        if id.is_empty() {
            return Err(ModelError::EmptyField("InstanceId"));
        }
        let instance_type = record
            .instance_type
            .clone()
            .ok_or(ModelError::MissingField("InstanceType"))?;
        let launch_time = record
            .launch_time
            .ok_or(ModelError::MissingField("LaunchTime"))?;

        let tags: HashMap<String, String> = record
            .tags
            .iter()
            .filter_map(|t| {
                let key = t.key.clone()?;
                Some((key, t.value.clone().unwrap_or_default()))
            })
            .collect();

        let security_groups: HashMap<String, String> = record
            .security_groups
            .iter()
            .filter_map(|g| {
                let group_id = g.group_id.clone()?;
                Some((group_id, g.group_name.clone().unwrap_or_default()))
            })
            .collect();

        let state = match record.state.as_ref().and_then(|s| s.code) {
            Some(code) => {
                let state = ProviderState::from_code(code);
                if state == ProviderState::Unknown {
                    warn!(instance = %id, %region, code, "unrecognized provider state code");
                }
                state
            }
            None => {
                warn!(instance = %id, %region, "provider record has no state code");
                ProviderState::Unknown
            }
        };

        let public_ip_address = match record.public_ip_address.as_deref() {
            None | Some("") => None,
            Some(raw) => match raw.parse::<IpAddr>() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    warn!(instance = %id, %region, address = %raw, error = %e, "ignoring unparsable public address");
                    None
                }
            },
        };

        let name = tags.get(NAME_TAG).cloned().unwrap_or_default();
        let lifecycle = lifecycle::decode(tags.get(REAPER_TAG).map(String::as_str).unwrap_or(""));

        Ok(Self {
            id: id.to_string(),
            region: region.to_string(),
            name,
            tags,
            state,
            security_groups,
            instance_type,
            public_ip_address,
            launch_time,
            lifecycle,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Display name from the `Name` tag (empty when untagged).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tags(&self) -> &HashMap<String, String> {
        &self.tags
    }

    /// Value of a tag, or `""` when the key is absent.
    pub fn tag(&self, key: &str) -> &str {
        self.tags.get(key).map(String::as_str).unwrap_or("")
    }

    /// Whether the tag key is present, regardless of its value.
    pub fn tagged(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn state(&self) -> ProviderState {
        self.state
    }

    /// Security groups, keyed by group id.
    pub fn security_groups(&self) -> &HashMap<String, String> {
        &self.security_groups
    }

    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn public_ip_address(&self) -> Option<IpAddr> {
        self.public_ip_address
    }

    pub fn launch_time(&self) -> DateTime<Utc> {
        self.launch_time
    }

    /// Governance state decoded from the `REAPER` tag.
    pub fn lifecycle(&self) -> &LifecycleState {
        &self.lifecycle
    }

    /// Whether the instance belongs to an autoscaling group.
    pub fn is_autoscaled(&self) -> bool {
        self.tagged(AUTOSCALING_GROUP_TAG)
    }

    /// Whether the instance carries the whitelist exemption tag.
    pub fn is_whitelisted(&self) -> bool {
        self.tag(WHITELIST_TAG) == WHITELIST_VALUE
    }

    /// Deep link into the provider console for this instance.
    pub fn console_url(&self) -> Option<Url> {
        crate::console::instance_url(&self.region, &self.id)
    }
}
