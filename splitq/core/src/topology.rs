//! Broker Topology
//!
//! Derives the queue declarations a broker needs for the split catalog.
//! Every provisioned partition is declared, including those beyond
//! `in_use`, so raising `in_use` later never requires new declarations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::routing::config::{SplitCatalog, SplitConfig};
use crate::routing::names::build_queue_names;

/// A queue to declare on the broker
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueDeclaration {
    /// Queue name
    pub name: String,
    /// Routing key bound to the queue; always the queue name
    pub routing_key: String,
}

impl QueueDeclaration {
    /// Declaration whose routing key equals its name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            routing_key: name.clone(),
            name,
        }
    }
}

fn build_queues(base: &str, config: &SplitConfig) -> impl Iterator<Item = QueueDeclaration> {
    build_queue_names(base, config.total())
        .into_iter()
        .map(QueueDeclaration::new)
}

/// Declarations for every partition of every split queue
///
/// Ordered by logical queue name, then partition number.
#[must_use]
pub fn make_split_queues(catalog: &SplitCatalog) -> Vec<QueueDeclaration> {
    let mut splits: Vec<_> = catalog.queue_splits().collect();
    splits.sort_by_key(|(name, _)| *name);

    splits
        .into_iter()
        .flat_map(|(name, config)| build_queues(name, config))
        .collect()
}

/// Declarations for every partition of every task's default queue
///
/// Ordered by task name, then partition number.
#[must_use]
pub fn make_split_task_queues(catalog: &SplitCatalog) -> Vec<QueueDeclaration> {
    let mut splits: Vec<_> = catalog.task_splits().collect();
    splits.sort_by_key(|(name, _)| *name);

    splits
        .into_iter()
        .flat_map(|(_, config)| build_queues(&config.default_queue, &config.queues_config))
        .collect()
}

/// Queue names the broker knows about
#[derive(Clone, Debug, Default)]
pub struct KnownQueues {
    names: HashSet<String>,
}

impl KnownQueues {
    /// Known queues from plain names
    pub fn new<I>(names: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            names: names.into_iter().collect(),
        }
    }

    /// Statically declared queues plus the full split topology of `catalog`
    pub fn with_split_topology<I>(declared: I, catalog: &SplitCatalog) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut known = Self::new(declared);
        known.names.extend(
            make_split_queues(catalog)
                .into_iter()
                .chain(make_split_task_queues(catalog))
                .map(|declaration| declaration.name),
        );
        known
    }

    /// Whether `name` is declared
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Number of known queues
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no queue is known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
