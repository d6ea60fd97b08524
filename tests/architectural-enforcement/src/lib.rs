//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - Routing decisions never perform I/O
//! - Routing decisions never sleep or block on a lock held across calls
//!
//! These tests are designed to catch violations early in the development cycle.

use std::path::PathBuf;

/// Workspace root, resolved from this package's manifest directory
#[must_use]
pub fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}
