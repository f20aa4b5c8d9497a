//! reaper-filter: instance selection by named predicates.
//!
//! A filter is a predicate name plus string arguments, usually straight
//! from `reaper.toml`. Names dispatch onto a closed [`Predicate`] enum with
//! fixed, typed arities; there is no reflection and no expression language.
//!
//! # Fail-closed evaluation
//!
//! [`evaluate`] never errors. An unknown predicate name or a malformed
//! argument is logged at `error` and the filter evaluates to `false`, so a
//! broken definition excludes instances instead of aborting the sweep or
//! selecting everything. [`try_evaluate`] exposes the underlying
//! [`FilterError`] for callers that want it.

pub mod engine;
pub mod error;
pub mod predicate;

pub use engine::{evaluate, try_evaluate, FilterSet};
pub use error::{FilterError, FilterResult};
pub use predicate::Predicate;
