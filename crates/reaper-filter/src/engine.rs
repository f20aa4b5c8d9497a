//! Single-predicate evaluation and the config-driven filter set.

use tracing::{debug, error};

use reaper_core::{FilterSpec, Instance};

use crate::error::FilterResult;
use crate::predicate::Predicate;

/// Evaluate one named predicate against an instance.
///
/// Unknown names and malformed arguments are logged once at `error` and
/// evaluate to `false`.
pub fn evaluate(name: &str, arguments: &[String], instance: &Instance) -> bool {
    match try_evaluate(name, arguments, instance) {
        Ok(matched) => matched,
        Err(e) => {
            error!(
                instance = %instance.id(),
                region = %instance.region(),
                predicate = %name,
                error = %e,
                "filter cannot be evaluated, excluding instance"
            );
            false
        }
    }
}

/// Evaluate one named predicate, surfacing why it could not be evaluated.
pub fn try_evaluate(name: &str, arguments: &[String], instance: &Instance) -> FilterResult<bool> {
    Ok(Predicate::parse(name, arguments)?.matches(instance))
}

/// The `[[filters]]` of a config, parsed up front and combined with AND.
///
/// An empty set selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    predicates: Vec<Predicate>,
}

impl FilterSet {
    /// Parse every spec, failing on the first invalid one.
    pub fn from_specs(specs: &[FilterSpec]) -> FilterResult<Self> {
        let predicates = specs
            .iter()
            .map(|spec| Predicate::parse(&spec.function, &spec.arguments))
            .collect::<FilterResult<Vec<_>>>()?;
        Ok(Self { predicates })
    }

    pub fn new(predicates: Vec<Predicate>) -> Self {
        Self { predicates }
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Whether the instance satisfies every predicate.
    pub fn matches(&self, instance: &Instance) -> bool {
        if self.predicates.is_empty() {
            return false;
        }
        for predicate in &self.predicates {
            if !predicate.matches(instance) {
                debug!(instance = %instance.id(), predicate = predicate.name(), "filter rejected instance");
                return false;
            }
        }
        true
    }

    /// The instances satisfying every predicate.
    pub fn select<'a>(&self, instances: &'a [Instance]) -> Vec<&'a Instance> {
        instances.iter().filter(|i| self.matches(i)).collect()
    }
}
