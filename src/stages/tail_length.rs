//! Tail-length stage: annotates reads with an estimated poly-tail length.
//!
//! Consumes `Read` messages and forwards every message kind unchanged and
//! in order. Per read: locate the primer (or plasmid flank) boundary by
//! edit-distance search, walk the tail run bridging short interruptions,
//! translate the run into a raw-signal range through the move table, and
//! estimate the tail length from the read's samples-per-base rate.

use crate::config::TailConfig;
use crate::error::{PushError, StageError};
use crate::messages::{Message, Polarity, SignalRead, TailInfo};
use crate::pipeline::{FaultReport, FlushOptions, MessageSink, StageCore};
use crate::realign::{locate, SubMatch};
use crate::sequence::moves_to_map;
use crate::stats::NamedStats;
use crossbeam_channel::{Receiver, Sender};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// How far into the read (from the relevant end) primers are searched for.
const SEARCH_WINDOW: usize = 150;

/// A primer match is accepted below one edit per this many primer bases.
const PRIMER_EDIT_DIVISOR: usize = 4;

/// Outcome of processing one read.
enum TailOutcome {
    Called { length: i32, signal_range: (usize, usize) },
    NotCalled,
    /// No usable primer/flank boundary or inconsistent move table; the
    /// read is forwarded unannotated.
    Unresolved,
}

/// Bridged tail run in base coordinates.
struct TailScan {
    /// Half-open base range spanning the outermost tail bases.
    range: (usize, usize),
    /// Number of actual tail bases inside the range (gaps excluded).
    matched: usize,
}

struct TailCalculator {
    config: TailConfig,
}

impl TailCalculator {
    fn new(config: TailConfig) -> Self {
        Self { config }
    }

    fn max_primer_edits(needle: &[u8]) -> usize {
        needle.len() / PRIMER_EDIT_DIVISOR
    }

    /// Accept a located match only below the edit threshold.
    fn accept(hit: Option<SubMatch>, max_edits: usize) -> Option<SubMatch> {
        hit.filter(|m| m.edits <= max_edits)
    }

    /// Walk forward from `from`, bridging runs of up to `interrupt`
    /// non-tail bases, and return the bridged run.
    fn scan_forward(seq: &[u8], from: usize, tail_base: u8, interrupt: usize) -> TailScan {
        let mut first = None;
        let mut last = None;
        let mut matched = 0usize;
        let mut gap = 0usize;
        for i in from..seq.len() {
            if seq[i] == tail_base {
                matched += 1;
                gap = 0;
                first.get_or_insert(i);
                last = Some(i);
            } else {
                gap += 1;
                if gap > interrupt {
                    break;
                }
            }
        }
        match (first, last) {
            (Some(f), Some(l)) => TailScan {
                range: (f, l + 1),
                matched,
            },
            _ => TailScan {
                range: (from, from),
                matched: 0,
            },
        }
    }

    /// Mirror of `scan_forward`, walking from `to` (exclusive) towards the
    /// start of the read.
    fn scan_backward(seq: &[u8], to: usize, tail_base: u8, interrupt: usize) -> TailScan {
        let mut first = None;
        let mut last = None;
        let mut matched = 0usize;
        let mut gap = 0usize;
        for i in (0..to).rev() {
            if seq[i] == tail_base {
                matched += 1;
                gap = 0;
                first.get_or_insert(i);
                last = Some(i);
            } else {
                gap += 1;
                if gap > interrupt {
                    break;
                }
            }
        }
        match (first, last) {
            (Some(f), Some(l)) => TailScan {
                range: (l, f + 1),
                matched,
            },
            _ => TailScan {
                range: (to, to),
                matched: 0,
            },
        }
    }

    /// Locate the tail run for a plasmid read: between the front and rear
    /// flanks, trying both read orientations.
    fn plasmid_scan(&self, seq: &[u8]) -> Option<TailScan> {
        let cfg = &self.config;
        let threshold = cfg.plasmid_flank_threshold;
        let interrupt = cfg.tail_interrupt_length;

        let front = Self::accept(locate(&cfg.plasmid_front_flank, seq), threshold);
        let rear = Self::accept(locate(&cfg.plasmid_rear_flank, seq), threshold);
        if let (Some(front), Some(rear)) = (front, rear) {
            if front.end <= rear.start {
                let scan = Self::scan_forward(&seq[..rear.start], front.end, b'A', interrupt);
                return Some(scan);
            }
        }

        // Reverse orientation: the tail reads as poly(T) between the
        // reverse-complemented rear and front flanks.
        let rc_rear = Self::accept(locate(&cfg.rc_plasmid_rear_flank, seq), threshold)?;
        let rc_front = Self::accept(locate(&cfg.rc_plasmid_front_flank, seq), threshold)?;
        if rc_rear.end <= rc_front.start {
            let scan = Self::scan_forward(&seq[..rc_front.start], rc_rear.end, b'T', interrupt);
            return Some(scan);
        }
        None
    }

    /// Locate the tail run in base coordinates, or `None` when no boundary
    /// candidate is found.
    fn tail_scan(&self, read: &SignalRead) -> Option<TailScan> {
        let seq = &read.seq;
        if seq.is_empty() {
            return None;
        }
        if self.config.is_plasmid {
            return self.plasmid_scan(seq);
        }
        let interrupt = self.config.tail_interrupt_length;
        match read.polarity {
            Polarity::Dna => {
                // cDNA: poly(A) immediately precedes the reverse-complemented
                // rear primer near the 3' end.
                let primer = &self.config.rc_rear_primer;
                let window_start = seq.len().saturating_sub(SEARCH_WINDOW);
                let hit = Self::accept(
                    locate(primer, &seq[window_start..]),
                    Self::max_primer_edits(primer),
                )?;
                let boundary = window_start + hit.start;
                Some(Self::scan_backward(seq, boundary, b'A', interrupt))
            }
            Polarity::Rna => {
                // RNA: poly(A) follows the front primer near the start.
                let primer = &self.config.front_primer;
                let window_end = SEARCH_WINDOW.min(seq.len());
                let hit = Self::accept(
                    locate(primer, &seq[..window_end]),
                    Self::max_primer_edits(primer),
                )?;
                Some(Self::scan_forward(seq, hit.end, b'A', interrupt))
            }
        }
    }

    fn process_read(&self, read: &SignalRead) -> TailOutcome {
        let Some(scan) = self.tail_scan(read) else {
            return TailOutcome::Unresolved;
        };
        if scan.matched == 0 {
            return TailOutcome::NotCalled;
        }

        let seq_to_sig = moves_to_map(&read.moves, read.block_stride, read.signal.len());
        // One entry per base plus the terminator; anything else means the
        // move table does not describe this sequence.
        if seq_to_sig.len() != read.seq.len() + 1 {
            log::debug!(
                "read {}: move table describes {} bases, sequence has {}",
                read.id,
                seq_to_sig.len().saturating_sub(1),
                read.seq.len()
            );
            return TailOutcome::Unresolved;
        }

        let signal_range = (seq_to_sig[scan.range.0], seq_to_sig[scan.range.1]);
        let samples_per_base = read.samples_per_base();
        if samples_per_base <= 0.0 {
            return TailOutcome::Unresolved;
        }
        let length =
            ((signal_range.1 - signal_range.0) as f32 / samples_per_base).round() as i32;

        if scan.matched < self.config.min_base_count {
            log::debug!(
                "read {}: tail run of {} base(s) below min_base_count {}",
                read.id,
                scan.matched,
                self.config.min_base_count
            );
            TailOutcome::NotCalled
        } else {
            TailOutcome::Called {
                length,
                signal_range,
            }
        }
    }
}

#[derive(Default)]
struct TailAggregator {
    num_called: AtomicU64,
    num_not_called: AtomicU64,
    num_unresolved: AtomicU64,
    total_tail_length: AtomicU64,
    // Tail calls are rare relative to per-sample work; one coarse lock is
    // plenty here.
    histogram: Mutex<BTreeMap<i32, u64>>,
}

impl TailAggregator {
    fn record_called(&self, length: i32) {
        self.num_called.fetch_add(1, Ordering::Relaxed);
        self.total_tail_length
            .fetch_add(length.max(0) as u64, Ordering::Relaxed);
        *self.histogram.lock().unwrap().entry(length).or_insert(0) += 1;
    }
}

/// The stage itself: shared scaffold plus the calculator and aggregation
/// state shared with its worker threads.
pub struct TailLengthStage {
    core: Arc<StageCore>,
    downstream: Arc<dyn MessageSink>,
    calculator: Arc<TailCalculator>,
    aggregator: Arc<TailAggregator>,
}

impl TailLengthStage {
    pub fn new(
        downstream: Arc<dyn MessageSink>,
        config: TailConfig,
        num_workers: usize,
        queue_capacity: usize,
    ) -> Result<Arc<Self>, StageError> {
        let stage = Arc::new(Self {
            core: Arc::new(StageCore::new("tail_length", queue_capacity, num_workers)),
            downstream,
            calculator: Arc::new(TailCalculator::new(config)),
            aggregator: Arc::new(TailAggregator::default()),
        });
        stage.spawn()?;
        Ok(stage)
    }

    fn spawn(&self) -> Result<(), StageError> {
        let core = Arc::clone(&self.core);
        let downstream = Arc::clone(&self.downstream);
        let calculator = Arc::clone(&self.calculator);
        let aggregator = Arc::clone(&self.aggregator);
        self.core.start(move |rx| {
            input_thread_fn(&core, &downstream, &calculator, &aggregator, rx);
        })
    }

    /// Tail-length histogram snapshot (length -> occurrence count).
    pub fn histogram(&self) -> BTreeMap<i32, u64> {
        self.aggregator.histogram.lock().unwrap().clone()
    }
}

fn input_thread_fn(
    core: &StageCore,
    downstream: &Arc<dyn MessageSink>,
    calculator: &TailCalculator,
    aggregator: &TailAggregator,
    rx: Receiver<Message>,
) {
    while let Ok(msg) = rx.recv() {
        let out = match msg {
            Message::Read(mut read) => {
                match calculator.process_read(&read) {
                    TailOutcome::Called {
                        length,
                        signal_range,
                    } => {
                        log::debug!(
                            "read {}: tail length {} over signal [{}, {})",
                            read.id,
                            length,
                            signal_range.0,
                            signal_range.1
                        );
                        read.tail = Some(TailInfo {
                            tail_length: length,
                            signal_range,
                        });
                        aggregator.record_called(length);
                    }
                    TailOutcome::NotCalled => {
                        aggregator.num_not_called.fetch_add(1, Ordering::Relaxed);
                    }
                    TailOutcome::Unresolved => {
                        aggregator.num_unresolved.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Message::Read(read)
            }
            other => other,
        };
        core.mark_processed();
        let read_id = out.read_id().map(str::to_string);
        if downstream.push(out).is_err() {
            core.report_fault(
                read_id,
                StageError::Fatal("downstream stage rejected message".to_string()),
            );
            break;
        }
    }
}

impl MessageSink for TailLengthStage {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn push(&self, msg: Message) -> Result<(), PushError> {
        self.core.push(msg)
    }

    fn terminate(&self, opts: &FlushOptions) {
        if self.core.terminate(opts) {
            // Queue drained and workers joined: downstream has seen every
            // upstream message, so end-of-stream is safe to emit.
            if self.downstream.push(Message::EndOfStream).is_err() {
                self.core.report_fault(
                    None,
                    StageError::Fatal("downstream rejected end-of-stream".to_string()),
                );
            }
        }
    }

    fn restart(&self) -> Result<(), StageError> {
        self.spawn()
    }

    fn sample_stats(&self) -> NamedStats {
        let mut stats = self.core.base_stats();
        let called = self.aggregator.num_called.load(Ordering::Relaxed);
        let total = self.aggregator.total_tail_length.load(Ordering::Relaxed);
        stats.insert("reads_called".to_string(), called as f64);
        stats.insert(
            "reads_not_called".to_string(),
            self.aggregator.num_not_called.load(Ordering::Relaxed) as f64,
        );
        stats.insert(
            "reads_unresolved".to_string(),
            self.aggregator.num_unresolved.load(Ordering::Relaxed) as f64,
        );
        stats.insert(
            "average_tail_length".to_string(),
            if called > 0 {
                total as f64 / called as f64
            } else {
                0.0
            },
        );
        stats
    }

    fn set_fault_sender(&self, tx: Sender<FaultReport>) {
        self.core.set_fault_sender(tx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_forward_contiguous() {
        let scan = TailCalculator::scan_forward(b"CCAAAAAGTT", 2, b'A', 0);
        assert_eq!(scan.range, (2, 7));
        assert_eq!(scan.matched, 5);
    }

    #[test]
    fn test_scan_forward_bridges_interruptions() {
        // Two A-runs separated by a 2-base gap; bridged at interrupt=2,
        // split at interrupt=1.
        let seq = b"AAAACCAAA";
        let bridged = TailCalculator::scan_forward(seq, 0, b'A', 2);
        assert_eq!(bridged.range, (0, 9));
        assert_eq!(bridged.matched, 7);
        let split = TailCalculator::scan_forward(seq, 0, b'A', 1);
        assert_eq!(split.range, (0, 4));
        assert_eq!(split.matched, 4);
    }

    #[test]
    fn test_scan_backward_mirrors_forward() {
        let scan = TailCalculator::scan_backward(b"CCAAAAAGTT", 7, b'A', 0);
        assert_eq!(scan.range, (2, 7));
        assert_eq!(scan.matched, 5);
    }

    #[test]
    fn test_scan_no_tail_bases() {
        let scan = TailCalculator::scan_forward(b"CCGGTT", 0, b'A', 0);
        assert_eq!(scan.matched, 0);
        assert_eq!(scan.range.0, scan.range.1);
    }
}
