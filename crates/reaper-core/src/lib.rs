//! reaper-core: shared types for the instance reaper.
//!
//! The reaper keeps no database of its own. Everything it knows about an
//! instance comes from a fresh provider snapshot ([`Instance`]), and the
//! only durable governance state is a single tag (`REAPER`) on the
//! instance itself, encoded and decoded by [`lifecycle`].
//!
//! # Components
//!
//! - **`instance`**: immutable attribute snapshot built from a provider record
//! - **`lifecycle`**: escalation state and its tag codec
//! - **`console`**: provider console deep links
//! - **`config`**: `reaper.toml` parsing and validation

pub mod config;
pub mod console;
pub mod error;
pub mod instance;
pub mod lifecycle;

pub use config::{FilterSpec, NotificationConfig, ReaperConfig};
pub use error::{CodecError, CodecResult, ConfigError, ConfigResult, ModelError, ModelResult};
pub use instance::{Instance, InstanceRecord, ProviderState};
pub use lifecycle::{decode, encode, try_decode, try_encode, LifecycleState, Stage};

/// Tag key holding the instance's display name.
pub const NAME_TAG: &str = "Name";

/// Tag key holding the encoded [`LifecycleState`].
pub const REAPER_TAG: &str = "REAPER";

/// Tag key whose presence marks autoscaling group membership.
pub const AUTOSCALING_GROUP_TAG: &str = "aws:autoscaling:groupName";

/// Tag key marking an instance as exempt from reaping.
pub const WHITELIST_TAG: &str = "REAPER_SPARE_ME";

/// Value of [`WHITELIST_TAG`] that grants the exemption.
pub const WHITELIST_VALUE: &str = "true";
