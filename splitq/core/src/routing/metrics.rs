//! Router Metrics
//!
//! Observability for routing decisions:
//! - Outcome counts per router (legacy, split, not configured, not rolled out)
//! - Per-destination counts, to check that partitions receive even load

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;

// ============================================================================
// Counter
// ============================================================================

/// A simple atomic counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Create a counter at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Add `n`
    pub fn add(&self, n: u64) {
        self.value.fetch_add(n, Ordering::Relaxed);
    }

    /// Current value
    #[must_use]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// How the queue router resolved a name
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOutcome {
    /// A legacy route chose the destination
    Legacy,
    /// Routed to a partition
    Split,
    /// No split configured; name passed through
    NotConfigured,
    /// Split configured but rollout inactive; name passed through
    NotRolledOut,
}

/// How the task router resolved a task
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Routed to a partition
    Split,
    /// No split configured; deferred to the caller
    NotConfigured,
    /// Split configured but rollout inactive; deferred to the caller
    NotRolledOut,
}

// ============================================================================
// Router Metrics
// ============================================================================

/// Centralized metrics shared by the queue and task routers
#[derive(Debug)]
pub struct RouterMetrics {
    pub queue_legacy: Counter,
    pub queue_split: Counter,
    pub queue_not_configured: Counter,
    pub queue_not_rolled_out: Counter,

    pub task_split: Counter,
    pub task_not_configured: Counter,
    pub task_not_rolled_out: Counter,

    /// Destination name -> times chosen by a split or legacy route
    destinations: RwLock<HashMap<String, Arc<Counter>>>,

    started_at: Instant,
}

impl RouterMetrics {
    /// Create new metrics collector
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue_legacy: Counter::new(),
            queue_split: Counter::new(),
            queue_not_configured: Counter::new(),
            queue_not_rolled_out: Counter::new(),
            task_split: Counter::new(),
            task_not_configured: Counter::new(),
            task_not_rolled_out: Counter::new(),
            destinations: RwLock::new(HashMap::new()),
            started_at: Instant::now(),
        }
    }

    /// Record a queue routing decision
    pub fn record_queue(&self, outcome: QueueOutcome, destination: &str) {
        match outcome {
            QueueOutcome::Legacy => self.queue_legacy.inc(),
            QueueOutcome::Split => self.queue_split.inc(),
            QueueOutcome::NotConfigured => self.queue_not_configured.inc(),
            QueueOutcome::NotRolledOut => self.queue_not_rolled_out.inc(),
        }
        if matches!(outcome, QueueOutcome::Legacy | QueueOutcome::Split) {
            self.destination_counter(destination).inc();
        }
    }

    /// Record a task routing decision
    pub fn record_task(&self, outcome: TaskOutcome, destination: Option<&str>) {
        match outcome {
            TaskOutcome::Split => self.task_split.inc(),
            TaskOutcome::NotConfigured => self.task_not_configured.inc(),
            TaskOutcome::NotRolledOut => self.task_not_rolled_out.inc(),
        }
        if let Some(destination) = destination {
            self.destination_counter(destination).inc();
        }
    }

    fn destination_counter(&self, destination: &str) -> Arc<Counter> {
        // Try read first
        if let Some(counter) = self.destinations.read().get(destination) {
            return Arc::clone(counter);
        }

        let mut destinations = self.destinations.write();
        Arc::clone(
            destinations
                .entry(destination.to_string())
                .or_insert_with(|| Arc::new(Counter::new())),
        )
    }

    /// Times `destination` was chosen
    #[must_use]
    pub fn destination_count(&self, destination: &str) -> u64 {
        self.destinations
            .read()
            .get(destination)
            .map_or(0, |counter| counter.get())
    }

    /// Get uptime
    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Point-in-time copy of every counter
    #[must_use]
    pub fn snapshot(&self) -> RouterMetricsSnapshot {
        let mut destinations: Vec<(String, u64)> = self
            .destinations
            .read()
            .iter()
            .map(|(name, counter)| (name.clone(), counter.get()))
            .collect();
        destinations.sort();

        RouterMetricsSnapshot {
            uptime_seconds: self.uptime().as_secs(),
            queue_legacy: self.queue_legacy.get(),
            queue_split: self.queue_split.get(),
            queue_not_configured: self.queue_not_configured.get(),
            queue_not_rolled_out: self.queue_not_rolled_out.get(),
            task_split: self.task_split.get(),
            task_not_configured: self.task_not_configured.get(),
            task_not_rolled_out: self.task_not_rolled_out.get(),
            destinations,
        }
    }

    /// Export as Prometheus format
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        output.push_str(
            "# HELP splitq_queue_routes_total Queue routing decisions by outcome\n\
             # TYPE splitq_queue_routes_total counter\n",
        );
        for (outcome, value) in [
            ("legacy", snapshot.queue_legacy),
            ("split", snapshot.queue_split),
            ("not_configured", snapshot.queue_not_configured),
            ("not_rolled_out", snapshot.queue_not_rolled_out),
        ] {
            output.push_str(&format!(
                "splitq_queue_routes_total{{outcome=\"{outcome}\"}} {value}\n"
            ));
        }
        output.push('\n');

        output.push_str(
            "# HELP splitq_task_routes_total Task routing decisions by outcome\n\
             # TYPE splitq_task_routes_total counter\n",
        );
        for (outcome, value) in [
            ("split", snapshot.task_split),
            ("not_configured", snapshot.task_not_configured),
            ("not_rolled_out", snapshot.task_not_rolled_out),
        ] {
            output.push_str(&format!(
                "splitq_task_routes_total{{outcome=\"{outcome}\"}} {value}\n"
            ));
        }
        output.push('\n');

        output.push_str(
            "# HELP splitq_destination_routes_total Units of work sent to each partition\n\
             # TYPE splitq_destination_routes_total counter\n",
        );
        for (queue, value) in &snapshot.destinations {
            output.push_str(&format!(
                "splitq_destination_routes_total{{queue=\"{queue}\"}} {value}\n"
            ));
        }

        output
    }
}

impl Default for RouterMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable copy of [`RouterMetrics`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RouterMetricsSnapshot {
    pub uptime_seconds: u64,
    pub queue_legacy: u64,
    pub queue_split: u64,
    pub queue_not_configured: u64,
    pub queue_not_rolled_out: u64,
    pub task_split: u64,
    pub task_not_configured: u64,
    pub task_not_rolled_out: u64,
    /// `(destination, count)` sorted by destination
    pub destinations: Vec<(String, u64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter() {
        let counter = Counter::new();
        counter.inc();
        counter.add(4);
        assert_eq!(counter.get(), 5);
    }

    #[test]
    fn test_queue_outcomes() {
        let metrics = RouterMetrics::new();
        metrics.record_queue(QueueOutcome::Split, "q_1");
        metrics.record_queue(QueueOutcome::Split, "q_2");
        metrics.record_queue(QueueOutcome::Split, "q_1");
        metrics.record_queue(QueueOutcome::NotConfigured, "other");
        metrics.record_queue(QueueOutcome::NotRolledOut, "q");
        metrics.record_queue(QueueOutcome::Legacy, "p_3");

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.queue_split, 3);
        assert_eq!(snapshot.queue_not_configured, 1);
        assert_eq!(snapshot.queue_not_rolled_out, 1);
        assert_eq!(snapshot.queue_legacy, 1);
        assert_eq!(
            snapshot.destinations,
            vec![
                ("p_3".to_string(), 1),
                ("q_1".to_string(), 2),
                ("q_2".to_string(), 1),
            ]
        );
        // Pass-through names are not destinations
        assert_eq!(metrics.destination_count("other"), 0);
    }

    #[test]
    fn test_task_outcomes() {
        let metrics = RouterMetrics::new();
        metrics.record_task(TaskOutcome::Split, Some("events_1"));
        metrics.record_task(TaskOutcome::NotConfigured, None);
        metrics.record_task(TaskOutcome::NotRolledOut, None);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.task_split, 1);
        assert_eq!(snapshot.task_not_configured, 1);
        assert_eq!(snapshot.task_not_rolled_out, 1);
        assert_eq!(metrics.destination_count("events_1"), 1);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = RouterMetrics::new();
        metrics.record_queue(QueueOutcome::Split, "q_1");

        let text = metrics.to_prometheus();
        assert!(text.contains("splitq_queue_routes_total{outcome=\"split\"} 1"));
        assert!(text.contains("splitq_destination_routes_total{queue=\"q_1\"} 1"));
        assert!(text.contains("splitq_task_routes_total{outcome=\"split\"} 0"));
    }

    #[test]
    fn test_snapshot_json() {
        let metrics = RouterMetrics::new();
        metrics.record_task(TaskOutcome::Split, Some("events_2"));

        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["task_split"], 1);
        assert_eq!(json["destinations"][0][0], "events_2");
        assert_eq!(json["destinations"][0][1], 1);
    }
}
