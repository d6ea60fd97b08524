#![allow(missing_docs)]
//! Split-Queue Routing
//!
//! Spreads a logical queue (or a task's default queue) over numbered
//! partitions `<name>_1 .. <name>_<total>`, rotating through the first
//! `in_use` of them. Operators control rollout and legacy overrides at
//! runtime through an [`OptionStore`].
//!
//! # Architecture
//!
//! ```text
//! +--------------------+      +--------------------+
//! |  SplitQueueRouter  |      | SplitQueueTaskRouter|
//! +---------+----------+      +----------+---------+
//!           |                            |
//!           v                            |
//! +--------------------+                 |
//! |   LegacyRegistry   |  <-- queue only, unless disabled
//! +---------+----------+                 |
//!           |                            |
//!           v                            v
//! +---------------------------------------------+
//! |  SplitCatalog  -->  RolloutGate  (options)  |
//! +----------------------+----------------------+
//!                        |
//!                        v
//!              +-------------------+
//!              | RoundRobinCursor  |  --> partition_name(name, i)
//!              +-------------------+
//! ```
//!
//! Each router owns its cursor, so queue and task rotations never
//! interfere even when a task's default queue is also a split queue.

pub mod config;
pub mod cursor;
pub mod legacy;
pub mod metrics;
pub mod names;
pub mod options;
pub mod rollout;
pub mod router;

pub use config::*;
pub use cursor::RoundRobinCursor;
pub use legacy::*;
pub use metrics::{QueueOutcome, RouterMetrics, RouterMetricsSnapshot, TaskOutcome};
pub use names::{build_queue_names, partition_name};
pub use options::*;
pub use rollout::*;
pub use router::*;
