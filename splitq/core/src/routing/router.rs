//! Split Queue Routers
//!
//! The two entry points the dispatch layer calls before handing work to the
//! broker client:
//!
//! - [`SplitQueueRouter::route_for_queue`] always returns a queue name.
//! - [`SplitQueueTaskRouter::route_for_task`] returns a destination, or
//!   `None` to let the caller's own task-to-queue mapping apply.
//!
//! # Queue Decision Flow
//!
//! ```text
//! 1. Legacy route registered and not disabled  -> legacy route decides
//! 2. No split configured                       -> name unchanged
//! 3. Rollout inactive                          -> name unchanged
//! 4. Otherwise                                 -> next partition of the name
//! ```
//!
//! The task flow is the same minus step 1, with `None` in place of "name
//! unchanged" and partitions taken from the task's default queue.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::config::SplitCatalog;
use super::cursor::RoundRobinCursor;
use super::legacy::LegacyRegistry;
use super::metrics::{QueueOutcome, RouterMetrics, TaskOutcome};
use super::names::partition_name;
use super::options::{InMemoryOptions, OptionStore, RolloutScope};
use super::rollout::RolloutGate;

// ============================================================================
// Task Destination
// ============================================================================

/// Explicit queue override for a task
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskDestination {
    /// Queue the task should be published to
    pub queue: String,
}

impl TaskDestination {
    /// Destination for `queue`
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
        }
    }
}

impl fmt::Display for TaskDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.queue)
    }
}

// ============================================================================
// Queue Router
// ============================================================================

/// Resolves logical queue names to physical partitions
pub struct SplitQueueRouter {
    catalog: Arc<SplitCatalog>,
    legacy: LegacyRegistry,
    options: Arc<dyn OptionStore>,
    gate: RolloutGate,
    cursor: RoundRobinCursor,
    metrics: Option<Arc<RouterMetrics>>,
}

impl SplitQueueRouter {
    /// Create a queue router
    pub fn new(
        catalog: Arc<SplitCatalog>,
        legacy: LegacyRegistry,
        options: Arc<dyn OptionStore>,
        gate: RolloutGate,
    ) -> Self {
        tracing::debug!(
            legacy_routes = legacy.len(),
            policy = %gate.policy(),
            "Queue router created"
        );
        Self {
            catalog,
            legacy,
            options,
            gate,
            cursor: RoundRobinCursor::new(),
            metrics: None,
        }
    }

    /// Attach metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<RouterMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Destination queue for `queue`
    pub fn route_for_queue(&self, queue: &str) -> String {
        let (destination, outcome) = self.resolve(queue);

        tracing::trace!(queue, destination = %destination, ?outcome, "Routed queue");
        if let Some(metrics) = &self.metrics {
            metrics.record_queue(outcome, &destination);
        }
        destination
    }

    fn resolve(&self, queue: &str) -> (String, QueueOutcome) {
        if let Some(route) = self.legacy.get(queue) {
            if !self.options.is_legacy_disabled(queue) {
                return (route.next_destination(), QueueOutcome::Legacy);
            }
        }

        let Some(config) = self.catalog.resolve_queue_split(queue) else {
            return (queue.to_string(), QueueOutcome::NotConfigured);
        };

        if !self
            .gate
            .is_active(RolloutScope::Queue, queue, self.options.as_ref())
        {
            return (queue.to_string(), QueueOutcome::NotRolledOut);
        }

        let index = self.cursor.next_index(queue, config.in_use());
        (partition_name(queue, index), QueueOutcome::Split)
    }

    /// Round-robin state, keyed by queue name
    #[must_use]
    pub fn cursor(&self) -> &RoundRobinCursor {
        &self.cursor
    }

    /// The catalog this router reads
    #[must_use]
    pub fn catalog(&self) -> &SplitCatalog {
        &self.catalog
    }

    /// Registered legacy routes
    #[must_use]
    pub fn legacy(&self) -> &LegacyRegistry {
        &self.legacy
    }
}

// ============================================================================
// Task Router
// ============================================================================

/// Resolves task names to explicit partition destinations
pub struct SplitQueueTaskRouter {
    catalog: Arc<SplitCatalog>,
    options: Arc<dyn OptionStore>,
    gate: RolloutGate,
    cursor: RoundRobinCursor,
    metrics: Option<Arc<RouterMetrics>>,
}

impl SplitQueueTaskRouter {
    /// Create a task router
    pub fn new(catalog: Arc<SplitCatalog>, options: Arc<dyn OptionStore>, gate: RolloutGate) -> Self {
        tracing::debug!(policy = %gate.policy(), "Task router created");
        Self {
            catalog,
            options,
            gate,
            cursor: RoundRobinCursor::new(),
            metrics: None,
        }
    }

    /// Attach metrics
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<RouterMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Destination for `task`, or `None` to keep the caller's default
    pub fn route_for_task(&self, task: &str) -> Option<TaskDestination> {
        let (destination, outcome) = self.resolve(task);

        tracing::trace!(
            task,
            destination = destination.as_ref().map_or("-", |d| d.queue.as_str()),
            ?outcome,
            "Routed task"
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_task(outcome, destination.as_ref().map(|d| d.queue.as_str()));
        }
        destination
    }

    fn resolve(&self, task: &str) -> (Option<TaskDestination>, TaskOutcome) {
        let Some(config) = self.catalog.resolve_task_split(task) else {
            return (None, TaskOutcome::NotConfigured);
        };

        if !self
            .gate
            .is_active(RolloutScope::Task, task, self.options.as_ref())
        {
            return (None, TaskOutcome::NotRolledOut);
        }

        let index = self.cursor.next_index(task, config.queues_config.in_use());
        let queue = partition_name(&config.default_queue, index);
        (Some(TaskDestination { queue }), TaskOutcome::Split)
    }

    /// Round-robin state, keyed by task name
    #[must_use]
    pub fn cursor(&self) -> &RoundRobinCursor {
        &self.cursor
    }
}

// ============================================================================
// Router Set
// ============================================================================

/// Both routers over one catalog, sharing an option store and metrics
pub struct RouterSet {
    /// Queue router
    pub queue: SplitQueueRouter,
    /// Task router
    pub task: SplitQueueTaskRouter,
    /// Dynamic options both routers read
    pub options: Arc<InMemoryOptions>,
    /// Metrics both routers record into
    pub metrics: Arc<RouterMetrics>,
}

impl RouterSet {
    /// Wire both routers to the same catalog, options, and metrics
    #[must_use]
    pub fn new(
        catalog: Arc<SplitCatalog>,
        legacy: LegacyRegistry,
        options: Arc<InMemoryOptions>,
        gate: RolloutGate,
    ) -> Self {
        let metrics = Arc::new(RouterMetrics::new());
        let store: Arc<dyn OptionStore> = options.clone();

        let queue = SplitQueueRouter::new(Arc::clone(&catalog), legacy, Arc::clone(&store), gate)
            .with_metrics(Arc::clone(&metrics));
        let task = SplitQueueTaskRouter::new(catalog, store, gate).with_metrics(Arc::clone(&metrics));

        Self {
            queue,
            task,
            options,
            metrics,
        }
    }

    /// See [`SplitQueueRouter::route_for_queue`]
    pub fn route_for_queue(&self, queue: &str) -> String {
        self.queue.route_for_queue(queue)
    }

    /// See [`SplitQueueTaskRouter::route_for_task`]
    pub fn route_for_task(&self, task: &str) -> Option<TaskDestination> {
        self.task.route_for_task(task)
    }
}
