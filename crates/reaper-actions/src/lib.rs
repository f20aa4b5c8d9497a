//! reaper-actions: side-effecting escalation actions.
//!
//! Everything that talks to the provider goes through the [`Ec2Api`]
//! trait: listing instances, upserting tags, stopping and terminating.
//! [`ActionExecutor`] layers the reaper's contracts on top of it:
//!
//! - whitelisting is an idempotent tag write (`REAPER_SPARE_ME=true`)
//! - lifecycle transitions are a single `REAPER` tag write
//! - stop and terminate address exactly one instance, and any provider
//!   response that does not confirm exactly one transition is an error
//!
//! Nothing here retries. Retry and backoff belong to the `Ec2Api`
//! implementation or to the caller.
//!
//! [`InMemoryEc2`] is a complete in-process provider for tests and
//! dry runs.

pub mod client;
pub mod error;
pub mod executor;
pub mod inventory;
pub mod memory;

pub use client::Ec2Api;
pub use error::{Action, ActionError, ActionResult};
pub use executor::ActionExecutor;
pub use memory::InMemoryEc2;
