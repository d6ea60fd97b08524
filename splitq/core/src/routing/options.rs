//! Dynamic Options
//!
//! Runtime-mutable rollout dials and the legacy disable list. Routers read
//! these on every call and never cache them.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Which rollout table a fraction belongs to
///
/// Queue and task rollouts are separate tables even when a task and a queue
/// share a name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutScope {
    /// Keyed by logical queue name
    Queue,
    /// Keyed by task name
    Task,
}

/// Source of routing options that may change between calls
pub trait OptionStore: Send + Sync {
    /// Current rollout fraction for `name`; `0.0` when unset
    fn rollout(&self, scope: RolloutScope, name: &str) -> f64;

    /// Whether the legacy override for `queue` is currently suppressed
    fn is_legacy_disabled(&self, queue: &str) -> bool;
}

/// In-process option store
#[derive(Debug, Default)]
pub struct InMemoryOptions {
    queue_rollout: RwLock<HashMap<String, f64>>,
    task_rollout: RwLock<HashMap<String, f64>>,
    legacy_disabled: RwLock<HashSet<String>>,
}

impl InMemoryOptions {
    /// Create an empty store (everything rolled back, nothing disabled)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, scope: RolloutScope) -> &RwLock<HashMap<String, f64>> {
        match scope {
            RolloutScope::Queue => &self.queue_rollout,
            RolloutScope::Task => &self.task_rollout,
        }
    }

    /// Set the rollout fraction for one name
    pub fn set_rollout(&self, scope: RolloutScope, name: impl Into<String>, fraction: f64) {
        let name = name.into();
        if !(0.0..=1.0).contains(&fraction) {
            tracing::warn!(
                name = %name,
                fraction,
                ?scope,
                "Rollout fraction outside [0, 1], it will be clamped when routing"
            );
        }
        self.table(scope).write().insert(name, fraction);
    }

    /// Remove the rollout entry for one name
    pub fn clear_rollout(&self, scope: RolloutScope, name: &str) {
        self.table(scope).write().remove(name);
    }

    /// Replace a whole rollout table
    pub fn replace_rollout(&self, scope: RolloutScope, table: HashMap<String, f64>) {
        *self.table(scope).write() = table;
    }

    /// Snapshot of a rollout table
    #[must_use]
    pub fn rollout_table(&self, scope: RolloutScope) -> HashMap<String, f64> {
        self.table(scope).read().clone()
    }

    /// Suppress the legacy override for `queue`
    pub fn disable_legacy(&self, queue: impl Into<String>) {
        self.legacy_disabled.write().insert(queue.into());
    }

    /// Re-enable the legacy override for `queue`
    pub fn enable_legacy(&self, queue: &str) {
        self.legacy_disabled.write().remove(queue);
    }

    /// Replace the legacy disable list
    pub fn replace_legacy_disabled<I, S>(&self, queues: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.legacy_disabled.write() = queues.into_iter().map(Into::into).collect();
    }
}

impl OptionStore for InMemoryOptions {
    fn rollout(&self, scope: RolloutScope, name: &str) -> f64 {
        self.table(scope).read().get(name).copied().unwrap_or(0.0)
    }

    fn is_legacy_disabled(&self, queue: &str) -> bool {
        self.legacy_disabled.read().contains(queue)
    }
}
