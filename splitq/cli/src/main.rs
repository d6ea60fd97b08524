//! splitq - Split-Queue Operator CLI
//!
//! Loads the split-queue configuration and answers the questions operators
//! ask before and during a rollout: is the file valid, which queues must the
//! broker declare, and where would the next N messages go.
//!
//! # Usage
//!
//! ```bash
//! # Validate the default config ($XDG_CONFIG_HOME/splitq/splitq.toml)
//! splitq check
//!
//! # Queues to declare on the broker
//! splitq --config /etc/splitq/splitq.toml topology
//!
//! # Where would the next 6 messages for a queue go at full rollout?
//! splitq route queue post_process_transactions --count 6 --rollout 1.0
//!
//! # Same, for a task, as JSON
//! splitq --json route task sentry.tasks.store.save_event_transaction --count 3
//!
//! # Verbose logging
//! RUST_LOG=splitq_core=trace splitq route queue events
//! ```
//!
//! # Environment Variables
//!
//! - `SPLITQ_CONFIG`: Configuration file path
//! - `SPLITQ_ROLLOUT_POLICY`: `stable_hash` or `sampled`
//! - `SPLITQ_LEGACY_DISABLED`: Comma-separated queues whose legacy routes are off
//! - `RUST_LOG`: Log level (trace, debug, info, warn, error)

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use splitq_core::{
    load_config, load_config_from_path, make_split_queues, make_split_task_queues,
    ConfigSource, QueueDeclaration, RolloutPolicy, RouterMetricsSnapshot, SplitQueueConfig,
};

/// splitq - inspect split-queue topology and routing
#[derive(Parser, Debug)]
#[command(name = "splitq")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, global = true, env = "SPLITQ_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate the configuration
    Check,

    /// Print every queue the broker must declare
    Topology,

    /// Run a router and print the destinations it picks
    Route {
        #[command(subcommand)]
        target: RouteTarget,
    },
}

#[derive(Subcommand, Debug)]
enum RouteTarget {
    /// Route a logical queue name
    Queue(RouteArgs),

    /// Route a task name
    Task(RouteArgs),
}

#[derive(clap::Args, Debug)]
struct RouteArgs {
    /// Queue or task name
    name: String,

    /// Number of routing calls to make
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Rollout fraction to set for this name before routing
    #[arg(short = 'r', long, value_name = "FRACTION")]
    rollout: Option<f64>,
}

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Serialize)]
struct CheckReport {
    source: ConfigSource,
    config_file: Option<PathBuf>,
    rollout_policy: RolloutPolicy,
    split_queues: usize,
    split_tasks: usize,
    legacy_routes: usize,
    declarations: usize,
}

#[derive(Debug, Serialize)]
struct TopologyReport {
    queues: Vec<QueueDeclaration>,
    task_queues: Vec<QueueDeclaration>,
}

#[derive(Debug, Serialize)]
struct RouteReport {
    name: String,
    /// `None` entries mean the task router deferred to the caller
    destinations: Vec<Option<String>>,
    metrics: RouterMetricsSnapshot,
}

fn check(config: &SplitQueueConfig) -> CheckReport {
    CheckReport {
        source: config.source(),
        config_file: config.config_file_path.clone(),
        rollout_policy: config.rollout_policy,
        split_queues: config.catalog.queue_splits().count(),
        split_tasks: config.catalog.task_splits().count(),
        legacy_routes: config.legacy.len(),
        declarations: make_split_queues(&config.catalog).len()
            + make_split_task_queues(&config.catalog).len(),
    }
}

fn topology(config: &SplitQueueConfig) -> TopologyReport {
    TopologyReport {
        queues: make_split_queues(&config.catalog),
        task_queues: make_split_task_queues(&config.catalog),
    }
}

fn route(config: &mut SplitQueueConfig, target: &RouteTarget) -> RouteReport {
    let (args, is_task) = match target {
        RouteTarget::Queue(args) => (args, false),
        RouteTarget::Task(args) => (args, true),
    };

    if let Some(fraction) = args.rollout {
        let table = if is_task {
            &mut config.task_rollout
        } else {
            &mut config.rollout
        };
        table.insert(args.name.clone(), fraction);
        config.set_source(ConfigSource::Cli);
    }

    let routers = config.build_routers();
    let destinations = (0..args.count)
        .map(|_| {
            if is_task {
                routers.route_for_task(&args.name).map(|d| d.queue)
            } else {
                Some(routers.route_for_queue(&args.name))
            }
        })
        .collect();

    RouteReport {
        name: args.name.clone(),
        destinations,
        metrics: routers.metrics.snapshot(),
    }
}

// ============================================================================
// Output
// ============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_check(report: &CheckReport) {
    match &report.config_file {
        Some(path) => println!("config: {} ({})", path.display(), report.source),
        None => println!("config: none ({})", report.source),
    }
    println!("rollout policy: {}", report.rollout_policy);
    println!("split queues: {}", report.split_queues);
    println!("split tasks: {}", report.split_tasks);
    println!("legacy routes: {}", report.legacy_routes);
    println!("declarations: {}", report.declarations);
}

fn print_topology(report: &TopologyReport) {
    for declaration in report.queues.iter().chain(&report.task_queues) {
        println!("{}", declaration.name);
    }
}

fn print_route(report: &RouteReport) {
    for destination in &report.destinations {
        println!("{}", destination.as_deref().unwrap_or("-"));
    }
}

// ============================================================================
// Main
// ============================================================================

fn load(path: Option<PathBuf>) -> Result<SplitQueueConfig> {
    match path {
        Some(path) => load_config_from_path(Some(path.clone()))
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => load_config().context("Failed to load default config"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("splitq=info".parse()?)
                .add_directive("splitq_core=info".parse()?),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = load(args.config)?;
    info!(source = %config.source(), "Configuration ready");

    match &args.command {
        Command::Check => {
            let report = check(&config);
            if args.json {
                print_json(&report)?;
            } else {
                print_check(&report);
            }
        }
        Command::Topology => {
            let report = topology(&config);
            if args.json {
                print_json(&report)?;
            } else {
                print_topology(&report);
            }
        }
        Command::Route { target } => {
            let report = route(&mut config, target);
            if args.json {
                print_json(&report)?;
            } else {
                print_route(&report);
            }
        }
    }

    Ok(())
}
