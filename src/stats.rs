//! Runtime statistics snapshots.
//!
//! Stages expose a string-to-number mapping; the shape of the mapping is the
//! contract with the reporting layer, not its presentation.

use std::collections::HashMap;

/// Snapshot of a stage's named counters. Read-only copy, safe for
/// concurrent readers.
pub type NamedStats = HashMap<String, f64>;

/// Re-key a stage's stats with a `stage_name.counter` prefix so snapshots
/// from the whole graph can be merged into one mapping.
pub fn prefixed(stage_name: &str, stats: &NamedStats) -> NamedStats {
    stats
        .iter()
        .map(|(k, v)| (format!("{stage_name}.{k}"), *v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_keys() {
        let mut stats = NamedStats::new();
        stats.insert("messages_processed".to_string(), 7.0);
        let out = prefixed("tail_length", &stats);
        assert_eq!(out.get("tail_length.messages_processed"), Some(&7.0));
    }
}
