//! Novelty detection between consecutive snapshots.

use std::collections::HashSet;

use cqc_common::types::{LeaderboardEntry, Snapshot};

/// Entries of `current` whose id is absent from `previous`, in `current` order.
///
/// With no previous snapshot the current one is only a baseline and nothing is
/// reported. Entries whose display fields changed but whose id did not are not
/// new.
pub fn detect(previous: Option<&Snapshot>, current: &Snapshot) -> Vec<LeaderboardEntry> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let seen: HashSet<&str> = previous.entries().iter().map(|e| e.id.as_str()).collect();
    current
        .entries()
        .iter()
        .filter(|e| !seen.contains(e.id.as_str()))
        .cloned()
        .collect()
}
