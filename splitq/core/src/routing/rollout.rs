//! Rollout Gate
//!
//! Decides per call whether splitting is live for a logical name. The dial
//! is a fraction read fresh from the option store, so operators can turn a
//! split on or off without restarting dispatchers.
//!
//! `0.0` (or no entry) is always off and `1.0` is always on. Fractions in
//! between are resolved by the configured [`RolloutPolicy`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::options::{OptionStore, RolloutScope};

/// How intermediate rollout fractions are resolved
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RolloutPolicy {
    /// Each name hashes to a fixed point in `[0, 1)` and is active once the
    /// fraction passes it. Raising the dial only ever turns names on.
    #[default]
    StableHash,

    /// Every call draws a uniform sample; roughly `fraction` of the traffic
    /// for a name is split.
    Sampled,
}

impl fmt::Display for RolloutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StableHash => write!(f, "stable_hash"),
            Self::Sampled => write!(f, "sampled"),
        }
    }
}

impl FromStr for RolloutPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stable_hash" | "stable" | "hash" => Ok(Self::StableHash),
            "sampled" | "random" => Ok(Self::Sampled),
            other => Err(format!("unknown rollout policy: {other}")),
        }
    }
}

/// FNV-1a 32-bit hash
#[inline]
fn fnv1a32(data: &[u8]) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
    const FNV_PRIME: u32 = 16_777_619;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in data {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Fixed position of `name` in `[0, 1)`
#[must_use]
pub fn stable_bucket(name: &str) -> f64 {
    f64::from(fnv1a32(name.as_bytes())) / (f64::from(u32::MAX) + 1.0)
}

/// Evaluates whether splitting is active for a name
#[derive(Clone, Copy, Debug, Default)]
pub struct RolloutGate {
    policy: RolloutPolicy,
}

impl RolloutGate {
    /// Create a gate using `policy` for intermediate fractions
    #[must_use]
    pub fn new(policy: RolloutPolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect
    #[must_use]
    pub fn policy(&self) -> RolloutPolicy {
        self.policy
    }

    /// Read the current fraction for `name` and decide
    pub fn is_active(&self, scope: RolloutScope, name: &str, options: &dyn OptionStore) -> bool {
        self.admits(name, options.rollout(scope, name))
    }

    /// Decide for an already-known fraction
    #[must_use]
    pub fn admits(&self, name: &str, fraction: f64) -> bool {
        if fraction.is_nan() || fraction <= 0.0 {
            return false;
        }
        if fraction >= 1.0 {
            return true;
        }

        match self.policy {
            RolloutPolicy::StableHash => stable_bucket(name) < fraction,
            RolloutPolicy::Sampled => rand::random::<f64>() < fraction,
        }
    }
}
