//! Integration Tests for Split-Queue Routing
//!
//! Drives the public API end to end: configuration file in, routing
//! decisions out.
//!
//! # Test Categories
//!
//! 1. Routing scenarios over a loaded configuration
//! 2. Runtime option changes
//! 3. Concurrent routing
//! 4. Topology and declaration checks

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use splitq_core::routing::stable_bucket;
use splitq_core::{
    make_split_queues, read_config_file, CycleRoute, InMemoryOptions, LegacyRegistry,
    RolloutGate, RolloutPolicy, RolloutScope, RouterSet, SplitCatalog, SplitConfig,
    SplitQueueConfig, SplitQueueRouter, TaskSplitConfig,
};

// ============================================================================
// Fixtures
// ============================================================================

const CONFIG: &str = r#"
[queues.q]
total = 5
in_use = 3

[queues.idle]
total = 3
in_use = 1

[queues.p]
total = 3
in_use = 3

[tasks.t]
default_queue = "q"
queues_config = { total = 5, in_use = 2 }

[legacy.p]
strategy = "cycle"
destinations = ["p_1", "p_2", "p_3"]

[options]
rollout = { q = 1.0, p = 1.0 }
task_rollout = { t = 1.0 }
"#;

fn load(content: &str) -> SplitQueueConfig {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    read_config_file(Some(file.path().to_path_buf())).unwrap()
}

fn routers() -> RouterSet {
    load(CONFIG).build_routers()
}

fn route_queue_n(routers: &RouterSet, name: &str, n: usize) -> Vec<String> {
    (0..n).map(|_| routers.route_for_queue(name)).collect()
}

fn route_task_n(routers: &RouterSet, name: &str, n: usize) -> Vec<Option<String>> {
    (0..n)
        .map(|_| routers.route_for_task(name).map(|d| d.queue))
        .collect()
}

// ============================================================================
// Scenario 1: Routing over a loaded configuration
// ============================================================================

#[test]
fn test_not_rolled_out_passes_through() {
    let routers = routers();

    assert_eq!(route_queue_n(&routers, "idle", 3), vec!["idle", "idle", "idle"]);
    assert_eq!(routers.queue.cursor().position("idle"), None);
}

#[test]
fn test_full_rollout_cycles_in_use_partitions() {
    let routers = routers();

    assert_eq!(route_queue_n(&routers, "q", 4), vec!["q_1", "q_2", "q_3", "q_1"]);
}

#[test]
fn test_legacy_route_ignores_catalog() {
    let routers = routers();

    assert_eq!(route_queue_n(&routers, "p", 3), vec!["p_1", "p_2", "p_3"]);
    assert_eq!(routers.queue.cursor().position("p"), None);
    assert_eq!(routers.metrics.snapshot().queue_legacy, 3);
}

#[test]
fn test_task_routing() {
    let routers = routers();

    assert_eq!(
        route_task_n(&routers, "t", 3),
        vec![
            Some("q_1".to_string()),
            Some("q_2".to_string()),
            Some("q_1".to_string()),
        ]
    );
    assert_eq!(route_task_n(&routers, "other", 2), vec![None, None]);
}

#[test]
fn test_unknown_queue_is_identity() {
    let routers = routers();

    for name in ["", "events", "q_1", "Q"] {
        assert_eq!(routers.route_for_queue(name), name);
    }
}

// ============================================================================
// Scenario 2: Runtime option changes
// ============================================================================

#[test]
fn test_rollback_takes_effect_next_call() {
    let routers = routers();

    assert_eq!(routers.route_for_queue("q"), "q_1");
    routers.options.set_rollout(RolloutScope::Queue, "q", 0.0);
    assert_eq!(routers.route_for_queue("q"), "q");
    routers.options.set_rollout(RolloutScope::Queue, "q", 1.0);

    // The rolled-back call did not advance the cursor
    assert_eq!(routers.route_for_queue("q"), "q_2");
}

#[test]
fn test_disabling_legacy_falls_through_to_split() {
    let routers = routers();

    routers.options.disable_legacy("p");
    assert_eq!(route_queue_n(&routers, "p", 4), vec!["p_1", "p_2", "p_3", "p_1"]);

    routers.options.enable_legacy("p");
    assert_eq!(routers.route_for_queue("p"), "p_1");
}

#[test]
fn test_task_rollout_without_split_is_noop() {
    let routers = routers();

    routers.options.set_rollout(RolloutScope::Task, "other", 1.0);
    assert_eq!(routers.route_for_task("other"), None);
}

#[test]
fn test_queue_and_task_rollouts_are_independent() {
    let routers = routers();

    routers.options.set_rollout(RolloutScope::Queue, "q", 0.0);
    assert_eq!(routers.route_for_queue("q"), "q");
    assert_eq!(routers.route_for_task("t").map(|d| d.queue), Some("q_1".to_string()));
}

#[test]
fn test_stable_hash_fraction_is_sticky() {
    let mut queues = HashMap::new();
    for i in 0..50 {
        queues.insert(format!("queue{i}"), SplitConfig::new(2, 2).unwrap());
    }
    let catalog = Arc::new(SplitCatalog::new(queues, HashMap::new()).unwrap());
    let options = Arc::new(InMemoryOptions::new());
    let router = SplitQueueRouter::new(
        Arc::clone(&catalog),
        LegacyRegistry::new(),
        options.clone(),
        RolloutGate::new(RolloutPolicy::StableHash),
    );

    for i in 0..50 {
        let name = format!("queue{i}");
        options.set_rollout(RolloutScope::Queue, name.clone(), 0.5);

        let routed = vec![router.route_for_queue(&name), router.route_for_queue(&name)];
        let expected = if stable_bucket(&name) < 0.5 {
            vec![format!("{name}_1"), format!("{name}_2")]
        } else {
            vec![name.clone(), name.clone()]
        };
        assert_eq!(routed, expected);
    }
}

// ============================================================================
// Scenario 3: Concurrent routing
// ============================================================================

#[test]
fn test_concurrent_routing_is_balanced() {
    const THREADS: usize = 8;
    const CALLS: usize = 300;

    let routers = routers();

    std::thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                for _ in 0..CALLS {
                    routers.route_for_queue("q");
                    routers.route_for_task("t");
                }
            });
        }
    });

    let metrics = &routers.metrics;
    // 2400 queue calls over 3 partitions
    for partition in ["q_1", "q_2", "q_3"] {
        let expected = (THREADS * CALLS / 3) as u64;
        let task_share = match partition {
            "q_1" | "q_2" => (THREADS * CALLS / 2) as u64,
            _ => 0,
        };
        assert_eq!(metrics.destination_count(partition), expected + task_share);
    }
    assert_eq!(metrics.destination_count("q_4"), 0);
    assert_eq!(metrics.snapshot().queue_split, (THREADS * CALLS) as u64);
    assert_eq!(metrics.snapshot().task_split, (THREADS * CALLS) as u64);
}

#[test]
fn test_concurrent_legacy_cycle() {
    let route = Arc::new(CycleRoute::new("p", vec!["p_1".into(), "p_2".into()]).unwrap());
    let mut legacy = LegacyRegistry::new();
    legacy.register("p", route);

    let routers = RouterSet::new(
        Arc::new(SplitCatalog::default()),
        legacy,
        Arc::new(InMemoryOptions::new()),
        RolloutGate::default(),
    );

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..100 {
                    routers.route_for_queue("p");
                }
            });
        }
    });

    assert_eq!(routers.metrics.destination_count("p_1"), 200);
    assert_eq!(routers.metrics.destination_count("p_2"), 200);
}

// ============================================================================
// Scenario 4: Topology and declarations
// ============================================================================

#[test]
fn test_topology_declares_idle_partitions() {
    let config = load(CONFIG);
    let names: Vec<String> = make_split_queues(&config.catalog)
        .into_iter()
        .map(|d| d.name)
        .collect();

    assert_eq!(
        names,
        vec![
            "idle_1", "idle_2", "idle_3", "p_1", "p_2", "p_3", "q_1", "q_2", "q_3", "q_4", "q_5",
        ]
    );
}

#[test]
fn test_declared_broker_queues_accept_split_defaults() {
    let config = load(
        r#"
[broker]
queues = ["events"]

[queues.q]
total = 2
in_use = 1

[tasks.t]
default_queue = "events"
queues_config = { total = 2, in_use = 1 }

[tasks.u]
default_queue = "q_2"
queues_config = { total = 1, in_use = 1 }
"#,
    );

    assert_eq!(config.declared_queues, Some(vec!["events".to_string()]));
}

#[test]
fn test_catalog_built_in_code_matches_file() {
    let mut tasks = HashMap::new();
    tasks.insert(
        "t".to_string(),
        TaskSplitConfig::new("q", SplitConfig::new(5, 2).unwrap()),
    );
    let catalog = SplitCatalog::new(HashMap::new(), tasks).unwrap();
    let loaded = load(CONFIG);

    assert_eq!(catalog.resolve_task_split("t"), loaded.catalog.resolve_task_split("t"));
}
