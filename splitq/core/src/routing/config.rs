//! Split Catalog
//!
//! Static description of which logical queues and tasks are split, how many
//! physical partitions back them, and how many of those currently take
//! traffic. Loaded once at startup and read-only afterwards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topology::KnownQueues;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building a catalog
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// `in_use`/`total` outside `1 <= in_use <= total`
    #[error("Invalid split for {name}: in_use={in_use}, total={total} (need 1 <= in_use <= total)")]
    InvalidSplit {
        /// Logical queue or task name
        name: String,
        /// Provisioned partitions
        total: usize,
        /// Partitions receiving traffic
        in_use: usize,
    },

    /// A task's default queue is not declared on the broker
    #[error("Queue {queue} used by task {task} is not declared")]
    UndeclaredQueue {
        /// Task whose configuration references the queue
        task: String,
        /// The undeclared queue
        queue: String,
    },
}

// ============================================================================
// Split Parameters
// ============================================================================

/// Partition counts for one logical queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Partitions provisioned on the broker, including idle ones
    total: usize,
    /// Partitions currently receiving traffic
    in_use: usize,
}

impl SplitConfig {
    /// Create a validated split
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidSplit`] unless `1 <= in_use <= total`.
    pub fn new(total: usize, in_use: usize) -> Result<Self, CatalogError> {
        let config = Self { total, in_use };
        config.validate("<unnamed>")?;
        Ok(config)
    }

    /// Partitions provisioned on the broker
    #[must_use]
    pub fn total(&self) -> usize {
        self.total
    }

    /// Partitions receiving traffic
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    fn validate(&self, name: &str) -> Result<(), CatalogError> {
        if self.total == 0 || self.in_use == 0 || self.in_use > self.total {
            return Err(CatalogError::InvalidSplit {
                name: name.to_string(),
                total: self.total,
                in_use: self.in_use,
            });
        }
        Ok(())
    }
}

/// Split parameters for a task, keyed by task name
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSplitConfig {
    /// Queue the task lands on when not overridden; also the partition base name
    pub default_queue: String,
    /// Partitioning of `default_queue`
    pub queues_config: SplitConfig,
}

impl TaskSplitConfig {
    /// Create a task split
    pub fn new(default_queue: impl Into<String>, queues_config: SplitConfig) -> Self {
        Self {
            default_queue: default_queue.into(),
            queues_config,
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Process-wide split configuration for queues and tasks
#[derive(Clone, Debug, Default)]
pub struct SplitCatalog {
    queues: HashMap<String, SplitConfig>,
    tasks: HashMap<String, TaskSplitConfig>,
}

impl SplitCatalog {
    /// Build a catalog, rejecting any malformed split
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidSplit`] naming the first offending entry.
    pub fn new(
        queues: HashMap<String, SplitConfig>,
        tasks: HashMap<String, TaskSplitConfig>,
    ) -> Result<Self, CatalogError> {
        for (name, config) in &queues {
            config.validate(name)?;
        }
        for (name, config) in &tasks {
            config.queues_config.validate(name)?;
        }

        Ok(Self { queues, tasks })
    }

    /// Split parameters for a logical queue, if it is split
    #[must_use]
    pub fn resolve_queue_split(&self, name: &str) -> Option<&SplitConfig> {
        self.queues.get(name)
    }

    /// Split parameters for a task, if it is split
    #[must_use]
    pub fn resolve_task_split(&self, task: &str) -> Option<&TaskSplitConfig> {
        self.tasks.get(task)
    }

    /// All queue splits
    pub fn queue_splits(&self) -> impl Iterator<Item = (&str, &SplitConfig)> {
        self.queues.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// All task splits
    pub fn task_splits(&self) -> impl Iterator<Item = (&str, &TaskSplitConfig)> {
        self.tasks.iter().map(|(name, config)| (name.as_str(), config))
    }

    /// Whether nothing is split
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty() && self.tasks.is_empty()
    }

    /// Check every task's default queue against the declared broker queues
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UndeclaredQueue`] for the first task whose
    /// `default_queue` is unknown to the broker.
    pub fn validate_destinations(&self, known: &KnownQueues) -> Result<(), CatalogError> {
        let mut tasks: Vec<_> = self.tasks.iter().collect();
        tasks.sort_by(|a, b| a.0.cmp(b.0));

        for (task, config) in tasks {
            if !known.contains(&config.default_queue) {
                return Err(CatalogError::UndeclaredQueue {
                    task: task.clone(),
                    queue: config.default_queue.clone(),
                });
            }
        }
        Ok(())
    }
}
