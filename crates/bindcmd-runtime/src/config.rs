//! Dependency-tracking policy.
//!
//! The defaults reproduce the historical behaviour: every change reported by
//! an observed owner invalidates the command, and tracked dependencies are
//! deduplicated by property name alone.

use std::env;

use bindcmd_core::OwnerId;

use crate::tracker::TrackingKey;

/// Which owner notifications invalidate a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationScope {
    /// Any property change on the owner.
    #[default]
    AnyChange,
    /// Only changes to the property the guard reads.
    ObservedProperty,
}

/// How a command recognises a dependency it already tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// By property name. The same name on two different owners counts as
    /// one dependency, and only the first owner is subscribed.
    #[default]
    PropertyName,
    /// By `(owner, property name)`.
    OwnerAndProperty,
}

impl DedupPolicy {
    pub(crate) fn key(self, owner: OwnerId, property: &str) -> TrackingKey {
        match self {
            Self::PropertyName => TrackingKey::Property(property.to_owned()),
            Self::OwnerAndProperty => TrackingKey::OwnerProperty(owner, property.to_owned()),
        }
    }
}

/// Configuration for dependency tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackingConfig {
    pub scope: InvalidationScope,
    pub dedup: DedupPolicy,
}

impl TrackingConfig {
    /// Set the invalidation scope.
    #[must_use]
    pub fn with_scope(mut self, scope: InvalidationScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the dedup policy.
    #[must_use]
    pub fn with_dedup(mut self, dedup: DedupPolicy) -> Self {
        self.dedup = dedup;
        self
    }

    /// Defaults overridden by `BINDCMD_INVALIDATION_SCOPE` (`any` or
    /// `property`) and `BINDCMD_DEDUP` (`name` or `owner`). Unrecognised
    /// values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(val) = lookup("BINDCMD_INVALIDATION_SCOPE") {
            match val.trim().to_ascii_lowercase().as_str() {
                "any" => config.scope = InvalidationScope::AnyChange,
                "property" => config.scope = InvalidationScope::ObservedProperty,
                other => tracing::warn!(
                    message = "bindcmd.config.ignored",
                    key = "BINDCMD_INVALIDATION_SCOPE",
                    value = other
                ),
            }
        }
        if let Some(val) = lookup("BINDCMD_DEDUP") {
            match val.trim().to_ascii_lowercase().as_str() {
                "name" => config.dedup = DedupPolicy::PropertyName,
                "owner" => config.dedup = DedupPolicy::OwnerAndProperty,
                other => tracing::warn!(
                    message = "bindcmd.config.ignored",
                    key = "BINDCMD_DEDUP",
                    value = other
                ),
            }
        }
        config
    }
}
