//! Process-wide periodic progress reporting.
//!
//! The pipeline driver polls stage stats and feeds the snapshots here; the
//! aggregator emits at most one human-readable line per interval. The
//! pipeline is rebuilt per input unit, so each unit's counters restart from
//! zero; `notify_stats_completed` folds a finished unit into the running
//! cumulative total. Call frequency is seconds-scale, not hot-path.

use crate::stats::NamedStats;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Counter consumed from the polled snapshots.
pub const RECORDS_WRITTEN: &str = "records_written";

/// Extract the writer counter from a snapshot, accepting both the bare key
/// and the `stage.`-prefixed form `PipelineGraph::sample_stats` produces.
fn records_written(stats: &NamedStats) -> u64 {
    if let Some(count) = stats.get(RECORDS_WRITTEN) {
        return *count as u64;
    }
    stats
        .iter()
        .filter(|(key, _)| {
            key.strip_suffix(RECORDS_WRITTEN)
                .is_some_and(|prefix| prefix.ends_with('.'))
        })
        .map(|(_, count)| *count)
        .sum::<f64>() as u64
}

struct ProgressState {
    started: Instant,
    next_report: Instant,
    /// Records from input units that have already completed.
    previous_units_total: u64,
    /// Records counted so far in the current unit.
    current_count: u64,
    units_completed: usize,
    units_with_known_count: usize,
    total_known_count: u64,
}

pub struct ProgressAggregator {
    interval: Duration,
    num_input_units: usize,
    state: Mutex<ProgressState>,
}

impl ProgressAggregator {
    pub fn new(interval: Duration, num_input_units: usize) -> Self {
        let now = Instant::now();
        Self {
            interval,
            num_input_units,
            state: Mutex::new(ProgressState {
                started: now,
                next_report: now + interval,
                previous_units_total: 0,
                current_count: 0,
                units_completed: 0,
                units_with_known_count: 0,
                total_known_count: 0,
            }),
        }
    }

    /// Consume a stats snapshot from the driver; reports when the interval
    /// has elapsed.
    pub fn update_stats(&self, stats: &NamedStats) {
        let mut state = self.state.lock().unwrap();
        state.current_count = records_written(stats);
        let now = Instant::now();
        if now >= state.next_report {
            self.report(&mut state, now);
            state.next_report = now + self.interval;
        }
    }

    /// Mark a logical unit boundary: the current unit's counters are about
    /// to restart from zero, so fold them into the cumulative total.
    pub fn notify_stats_completed(&self, stats: &NamedStats) {
        let mut state = self.state.lock().unwrap();
        let final_count = records_written(stats);
        state.previous_units_total += final_count;
        state.current_count = 0;
        state.units_completed += 1;
    }

    /// Record the exact record count of one input unit, refining the
    /// projected grand total.
    pub fn update_records_per_unit_estimate(&self, num_records_in_unit: u64) {
        let mut state = self.state.lock().unwrap();
        state.units_with_known_count += 1;
        state.total_known_count += num_records_in_unit;
    }

    /// Records observed so far across all units.
    pub fn cumulative_total(&self) -> u64 {
        let state = self.state.lock().unwrap();
        state.previous_units_total + state.current_count
    }

    fn projected_total(&self, state: &ProgressState) -> Option<u64> {
        if state.units_with_known_count == 0 {
            return None;
        }
        let per_unit = state.total_known_count as f64 / state.units_with_known_count as f64;
        let unknown_units = self
            .num_input_units
            .saturating_sub(state.units_with_known_count);
        Some(state.total_known_count + (per_unit * unknown_units as f64) as u64)
    }

    fn report(&self, state: &mut ProgressState, now: Instant) {
        let total = state.previous_units_total + state.current_count;
        let elapsed = now.duration_since(state.started).as_secs_f64();
        let rate = if elapsed > 0.0 {
            total as f64 / elapsed
        } else {
            0.0
        };
        match self.projected_total(state) {
            Some(projected) if projected > 0 => {
                let pct = (total as f64 / projected as f64 * 100.0).min(100.0);
                log::info!(
                    "processed {}/~{} records ({:.1}%), {:.0} records/s, unit {}/{}",
                    total,
                    projected,
                    pct,
                    rate,
                    state.units_completed + 1,
                    self.num_input_units
                );
            }
            _ => {
                log::info!(
                    "processed {} records, {:.0} records/s, unit {}/{}",
                    total,
                    rate,
                    state.units_completed + 1,
                    self.num_input_units
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(count: f64) -> NamedStats {
        let mut s = NamedStats::new();
        s.insert(RECORDS_WRITTEN.to_string(), count);
        s
    }

    #[test]
    fn test_prefixed_snapshot_keys_are_accepted() {
        let progress = ProgressAggregator::new(Duration::from_secs(60), 1);
        let mut snapshot = NamedStats::new();
        snapshot.insert("writer.records_written".to_string(), 120.0);
        snapshot.insert("writer.messages_processed".to_string(), 500.0);
        progress.update_stats(&snapshot);
        assert_eq!(progress.cumulative_total(), 120);
    }

    #[test]
    fn test_cumulative_total_tracks_current_unit() {
        let progress = ProgressAggregator::new(Duration::from_secs(60), 3);
        progress.update_stats(&stats(100.0));
        assert_eq!(progress.cumulative_total(), 100);
        progress.update_stats(&stats(250.0));
        assert_eq!(progress.cumulative_total(), 250);
    }

    #[test]
    fn test_totals_preserved_across_unit_boundary() {
        let progress = ProgressAggregator::new(Duration::from_secs(60), 3);
        progress.update_stats(&stats(250.0));
        progress.notify_stats_completed(&stats(250.0));
        // New unit: counters restart from zero, cumulative total holds.
        progress.update_stats(&stats(0.0));
        assert_eq!(progress.cumulative_total(), 250);
        progress.update_stats(&stats(40.0));
        assert_eq!(progress.cumulative_total(), 290);
    }

    #[test]
    fn test_projection_from_known_units() {
        let progress = ProgressAggregator::new(Duration::from_secs(60), 4);
        progress.update_records_per_unit_estimate(100);
        progress.update_records_per_unit_estimate(300);
        let state = progress.state.lock().unwrap();
        // 2 known units totalling 400, 2 unknown projected at 200 each.
        assert_eq!(progress.projected_total(&state), Some(800));
    }

    #[test]
    fn test_no_projection_without_known_units() {
        let progress = ProgressAggregator::new(Duration::from_secs(60), 4);
        let state = progress.state.lock().unwrap();
        assert_eq!(progress.projected_total(&state), None);
    }
}
