//! Partition Naming
//!
//! A logical queue `q` split `n` ways is backed by the physical queues
//! `q_1` through `q_n`. Both the topology provisioning step and the routers
//! derive names from here so the two can never disagree.

/// Name of the partition at a zero-based `index` of `base`.
///
/// Partition numbering on the broker is one-based, so index 0 is `{base}_1`.
#[must_use]
pub fn partition_name(base: &str, index: usize) -> String {
    format!("{base}_{}", index + 1)
}

/// Ordered partition names for `base`, from `{base}_1` to `{base}_{count}`.
///
/// Returns an empty list when `count` is zero.
#[must_use]
pub fn build_queue_names(base: &str, count: usize) -> Vec<String> {
    (0..count).map(|index| partition_name(base, index)).collect()
}
