//! Predicate kinds and their typed arguments.

use chrono::{DateTime, Utc};

use reaper_core::{Instance, ProviderState};

use crate::error::{FilterError, FilterResult};

/// A parsed, type-checked filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `Pending`, `Running`, ... (and `Unknown`): whether the instance is
    /// in `state` equals `expected`.
    State { state: ProviderState, expected: bool },
    /// Whether autoscaling group membership equals the argument.
    AutoScaled(bool),
    InstanceType(String),
    /// Tag key present, any value.
    Tagged(String),
    /// Tag value equality; a missing key reads as `""`.
    Tag { key: String, value: String },
    HasPublicIpAddress,
    /// Textual equality with the public address. Never matches an
    /// instance without one.
    PublicIpAddress(String),
    LaunchTimeBefore(DateTime<Utc>),
    LaunchTimeAfter(DateTime<Utc>),
}

/// Every predicate name the engine dispatches on.
pub const PREDICATE_NAMES: [&str; 15] = [
    "Pending",
    "Running",
    "ShuttingDown",
    "Terminated",
    "Stopping",
    "Stopped",
    "Unknown",
    "AutoScaled",
    "InstanceType",
    "Tagged",
    "Tag",
    "HasPublicIPAddress",
    "PublicIPAddress",
    "LaunchTimeBefore",
    "LaunchTimeAfter",
];

impl Predicate {
    /// Resolve a predicate name and check its arguments.
    pub fn parse(name: &str, arguments: &[String]) -> FilterResult<Self> {
        let predicate = match name {
            "Pending" => state("Pending", ProviderState::Pending, arguments)?,
            "Running" => state("Running", ProviderState::Running, arguments)?,
            "ShuttingDown" => state("ShuttingDown", ProviderState::ShuttingDown, arguments)?,
            "Terminated" => state("Terminated", ProviderState::Terminated, arguments)?,
            "Stopping" => state("Stopping", ProviderState::Stopping, arguments)?,
            "Stopped" => state("Stopped", ProviderState::Stopped, arguments)?,
            "Unknown" => state("Unknown", ProviderState::Unknown, arguments)?,
            "AutoScaled" => {
                let [arg] = arity::<1>("AutoScaled", arguments)?;
                Predicate::AutoScaled(parse_bool("AutoScaled", arg)?)
            }
            "InstanceType" => {
                let [arg] = arity::<1>("InstanceType", arguments)?;
                Predicate::InstanceType(arg.clone())
            }
            "Tagged" => {
                let [key] = arity::<1>("Tagged", arguments)?;
                Predicate::Tagged(key.clone())
            }
            "Tag" => {
                let [key, value] = arity::<2>("Tag", arguments)?;
                Predicate::Tag {
                    key: key.clone(),
                    value: value.clone(),
                }
            }
            "HasPublicIPAddress" => {
                arity::<0>("HasPublicIPAddress", arguments)?;
                Predicate::HasPublicIpAddress
            }
            "PublicIPAddress" => {
                let [arg] = arity::<1>("PublicIPAddress", arguments)?;
                Predicate::PublicIpAddress(arg.clone())
            }
            "LaunchTimeBefore" => {
                let [arg] = arity::<1>("LaunchTimeBefore", arguments)?;
                Predicate::LaunchTimeBefore(parse_rfc3339("LaunchTimeBefore", arg)?)
            }
            "LaunchTimeAfter" => {
                let [arg] = arity::<1>("LaunchTimeAfter", arguments)?;
                Predicate::LaunchTimeAfter(parse_rfc3339("LaunchTimeAfter", arg)?)
            }
            other => return Err(FilterError::UnknownPredicate(other.to_string())),
        };
        Ok(predicate)
    }

    /// Evaluate against an instance snapshot.
    pub fn matches(&self, instance: &Instance) -> bool {
        match self {
            Predicate::State { state, expected } => (instance.state() == *state) == *expected,
            Predicate::AutoScaled(expected) => instance.is_autoscaled() == *expected,
            Predicate::InstanceType(t) => instance.instance_type() == t.as_str(),
            Predicate::Tagged(key) => instance.tagged(key),
            Predicate::Tag { key, value } => instance.tag(key) == value.as_str(),
            Predicate::HasPublicIpAddress => instance.public_ip_address().is_some(),
            Predicate::PublicIpAddress(addr) => instance
                .public_ip_address()
                .is_some_and(|ip| ip.to_string() == *addr),
            Predicate::LaunchTimeBefore(t) => instance.launch_time() < *t,
            Predicate::LaunchTimeAfter(t) => instance.launch_time() > *t,
        }
    }

    /// The config name this predicate was parsed from.
    pub fn name(&self) -> &'static str {
        match self {
            Predicate::State { state, .. } => match state {
                ProviderState::Pending => "Pending",
                ProviderState::Running => "Running",
                ProviderState::ShuttingDown => "ShuttingDown",
                ProviderState::Terminated => "Terminated",
                ProviderState::Stopping => "Stopping",
                ProviderState::Stopped => "Stopped",
                ProviderState::Unknown => "Unknown",
            },
            Predicate::AutoScaled(_) => "AutoScaled",
            Predicate::InstanceType(_) => "InstanceType",
            Predicate::Tagged(_) => "Tagged",
            Predicate::Tag { .. } => "Tag",
            Predicate::HasPublicIpAddress => "HasPublicIPAddress",
            Predicate::PublicIpAddress(_) => "PublicIPAddress",
            Predicate::LaunchTimeBefore(_) => "LaunchTimeBefore",
            Predicate::LaunchTimeAfter(_) => "LaunchTimeAfter",
        }
    }
}

fn state(name: &'static str, state: ProviderState, arguments: &[String]) -> FilterResult<Predicate> {
    let [arg] = arity::<1>(name, arguments)?;
    Ok(Predicate::State {
        state,
        expected: parse_bool(name, arg)?,
    })
}

fn arity<'a, const N: usize>(
    predicate: &'static str,
    arguments: &'a [String],
) -> FilterResult<&'a [String; N]> {
    arguments.try_into().map_err(|_| FilterError::Arity {
        predicate,
        expected: N,
        found: arguments.len(),
    })
}

/// Boolean literals accepted in filter arguments.
fn parse_bool(predicate: &'static str, value: &str) -> FilterResult<bool> {
    match value {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(FilterError::InvalidBool {
            predicate,
            value: value.to_string(),
        }),
    }
}

fn parse_rfc3339(predicate: &'static str, value: &str) -> FilterResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| FilterError::InvalidTimestamp {
            predicate,
            value: value.to_string(),
            reason: e.to_string(),
        })
}
