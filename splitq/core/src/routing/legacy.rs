//! Legacy Routes
//!
//! Hand-written routing that predates the split catalog. A queue with a
//! registered legacy route bypasses the catalog entirely (unless operators
//! disable it through the option store), and the route decides the
//! distribution itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a legacy route
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LegacyError {
    /// A cycle strategy with nothing to cycle over
    #[error("Legacy route for {queue} has no destinations")]
    EmptyCycle {
        /// Queue the route was registered for
        queue: String,
    },
}

/// A strategy that hands out destination queue names
pub trait LegacyRoute: Send + Sync + fmt::Debug {
    /// Destination for the next unit of work
    fn next_destination(&self) -> String;

    /// Every destination this route can return
    fn destinations(&self) -> Vec<String>;
}

/// Cycles through a fixed list of destinations in order
#[derive(Debug)]
pub struct CycleRoute {
    destinations: Vec<String>,
    next: AtomicUsize,
}

impl CycleRoute {
    /// Create a cycle over `destinations`, which must not be empty
    ///
    /// # Errors
    ///
    /// Returns [`LegacyError::EmptyCycle`] when `destinations` is empty.
    pub fn new(queue: &str, destinations: Vec<String>) -> Result<Self, LegacyError> {
        if destinations.is_empty() {
            return Err(LegacyError::EmptyCycle {
                queue: queue.to_string(),
            });
        }
        Ok(Self {
            destinations,
            next: AtomicUsize::new(0),
        })
    }
}

impl LegacyRoute for CycleRoute {
    fn next_destination(&self) -> String {
        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.destinations.len();
        self.destinations[index].clone()
    }

    fn destinations(&self) -> Vec<String> {
        self.destinations.clone()
    }
}

/// Always returns the same destination
#[derive(Clone, Debug)]
pub struct FixedRoute {
    destination: String,
}

impl FixedRoute {
    /// Create a route pinned to `destination`
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

impl LegacyRoute for FixedRoute {
    fn next_destination(&self) -> String {
        self.destination.clone()
    }

    fn destinations(&self) -> Vec<String> {
        vec![self.destination.clone()]
    }
}

/// Declarative form of the built-in routes, as written in configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum LegacyStrategy {
    /// Round-robin over `destinations`
    Cycle {
        /// Destinations in rotation order
        destinations: Vec<String>,
    },
    /// Always `destination`
    Fixed {
        /// The only destination
        destination: String,
    },
}

impl LegacyStrategy {
    /// Build the route for `queue`
    ///
    /// # Errors
    ///
    /// Returns [`LegacyError::EmptyCycle`] for a cycle with no destinations.
    pub fn build(&self, queue: &str) -> Result<Arc<dyn LegacyRoute>, LegacyError> {
        let route: Arc<dyn LegacyRoute> = match self {
            Self::Cycle { destinations } => Arc::new(CycleRoute::new(queue, destinations.clone())?),
            Self::Fixed { destination } => Arc::new(FixedRoute::new(destination.clone())),
        };
        Ok(route)
    }
}

/// Queue name to legacy route
#[derive(Clone, Debug, Default)]
pub struct LegacyRegistry {
    routes: HashMap<String, Arc<dyn LegacyRoute>>,
}

impl LegacyRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from declarative strategies
    ///
    /// # Errors
    ///
    /// Returns the first strategy that cannot be built.
    pub fn from_strategies(
        strategies: &HashMap<String, LegacyStrategy>,
    ) -> Result<Self, LegacyError> {
        let mut registry = Self::new();
        for (queue, strategy) in strategies {
            registry.register(queue.clone(), strategy.build(queue)?);
        }
        Ok(registry)
    }

    /// Register (or replace) the route for `queue`
    pub fn register(&mut self, queue: impl Into<String>, route: Arc<dyn LegacyRoute>) {
        self.routes.insert(queue.into(), route);
    }

    /// Route registered for `queue`
    #[must_use]
    pub fn get(&self, queue: &str) -> Option<&Arc<dyn LegacyRoute>> {
        self.routes.get(queue)
    }

    /// Registered queue names, sorted
    #[must_use]
    pub fn queues(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.routes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered routes
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether no route is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
