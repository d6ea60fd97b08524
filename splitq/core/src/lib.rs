//! splitq Core - Split-Queue Routing for Task Brokers
//!
//! Decides which physical broker queue a unit of work goes to when a
//! logical queue has been split into numbered partitions. Producers ask a
//! router for a destination; the router answers with a plain queue name.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Producers                            │
//! │        route_for_queue(name)        route_for_task(task)      │
//! └───────────────┬───────────────────────────────┬──────────────┘
//!                 │                               │
//! ┌───────────────┴───────────────────────────────┴──────────────┐
//! │                        SPLITQ CORE                            │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐ │
//! │  │   Catalog    │  │   Options    │  │   Legacy Registry    │ │
//! │  │ (immutable)  │  │  (runtime)   │  │   (queue router)     │ │
//! │  └──────────────┘  └──────────────┘  └──────────────────────┘ │
//! │  ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐ │
//! │  │ Rollout Gate │  │   Cursors    │  │      Topology        │ │
//! │  └──────────────┘  └──────────────┘  └──────────────────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use splitq_core::{
//!     InMemoryOptions, LegacyRegistry, RolloutGate, RolloutScope, SplitCatalog, SplitConfig,
//!     SplitQueueRouter,
//! };
//!
//! let mut queues = HashMap::new();
//! queues.insert("events".to_string(), SplitConfig::new(4, 2).unwrap());
//! let catalog = Arc::new(SplitCatalog::new(queues, HashMap::new()).unwrap());
//!
//! let options = Arc::new(InMemoryOptions::new());
//! options.set_rollout(RolloutScope::Queue, "events", 1.0);
//!
//! let router = SplitQueueRouter::new(catalog, LegacyRegistry::new(), options, RolloutGate::default());
//! assert_eq!(router.route_for_queue("events"), "events_1");
//! assert_eq!(router.route_for_queue("events"), "events_2");
//! assert_eq!(router.route_for_queue("events"), "events_1");
//! assert_eq!(router.route_for_queue("unsplit"), "unsplit");
//! ```
//!
//! # Module Overview
//!
//! - [`routing`]: Catalog, rollout, cursors, legacy routes, and the routers
//! - [`topology`]: Queue declarations the broker needs for the catalog
//! - [`config`]: TOML configuration loading with environment overrides

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod routing;
pub mod topology;

// Routing exports
pub use routing::{
    build_queue_names, partition_name, CatalogError, CycleRoute, FixedRoute, InMemoryOptions,
    LegacyError, LegacyRegistry, LegacyRoute, LegacyStrategy, OptionStore, QueueOutcome,
    RolloutGate, RolloutPolicy, RolloutScope, RoundRobinCursor, RouterMetrics,
    RouterMetricsSnapshot, RouterSet, SplitCatalog, SplitConfig, SplitQueueRouter,
    SplitQueueTaskRouter, TaskDestination, TaskOutcome, TaskSplitConfig,
};

// Topology exports
pub use topology::{make_split_queues, make_split_task_queues, KnownQueues, QueueDeclaration};

// Config exports
pub use config::{
    apply_env_config, default_config_path, load_config, load_config_from_path, read_config_file,
    ConfigError, ConfigSource, SplitQueueConfig, SplitQueueToml,
};
