//! The stage contract and the shared worker scaffold.
//!
//! A stage is a concurrent node with a bounded input queue and one or more
//! worker threads. Downstream dispatch goes through the `MessageSink` trait
//! object so stages compose freely and tests can plug in mock sinks.

use super::queue::BoundedQueue;
use crate::error::{PushError, StageError};
use crate::messages::Message;
use crate::stats::NamedStats;
use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;

/// Stage lifecycle: `Created -> Running <-> (Terminating -> Terminated)`.
/// Restart is only legal from `Created` or `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Created,
    Running,
    Terminating,
    Terminated,
}

impl StageState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageState::Created => "created",
            StageState::Running => "running",
            StageState::Terminating => "terminating",
            StageState::Terminated => "terminated",
        }
    }
}

/// Termination options. Draining blocks until the queue empties and all
/// in-flight processing completes; non-draining discards queued messages.
#[derive(Debug, Clone, Copy)]
pub struct FlushOptions {
    pub drain: bool,
}

impl FlushOptions {
    pub fn drain() -> Self {
        Self { drain: true }
    }

    pub fn discard() -> Self {
        Self { drain: false }
    }
}

impl Default for FlushOptions {
    fn default() -> Self {
        Self::drain()
    }
}

/// Structured failure report sent over the supervisory channel, decoupled
/// from the data-forwarding path. Sibling stages keep running.
#[derive(Debug)]
pub struct FaultReport {
    pub stage: &'static str,
    /// Count of messages the stage had processed when the fault occurred.
    pub message_index: u64,
    pub read_id: Option<String>,
    pub error: StageError,
}

/// A concurrent processing node that accepts messages.
pub trait MessageSink: Send + Sync {
    fn name(&self) -> &'static str;

    /// Enqueue a message for processing. Blocks while the input queue is
    /// full; fails with `Rejected` when the stage is terminating.
    fn push(&self, msg: Message) -> Result<(), PushError>;

    /// Stop accepting pushes, drain (or discard) queued messages, join the
    /// worker threads, and only then forward `EndOfStream` downstream.
    fn terminate(&self, opts: &FlushOptions);

    /// Spawn a fresh set of workers. Legal only when not already running.
    fn restart(&self) -> Result<(), StageError>;

    /// Lock-free counter snapshot, safe to call concurrently with
    /// processing.
    fn sample_stats(&self) -> NamedStats {
        NamedStats::new()
    }

    /// Wire the stage into a supervisory fault channel. Called by the
    /// pipeline graph when the stage is added.
    fn set_fault_sender(&self, _tx: Sender<FaultReport>) {}
}

/// Shared scaffold owned by each concrete stage: input queue, worker
/// handles, lifecycle state, and push/processed counters.
pub struct StageCore {
    name: &'static str,
    queue: BoundedQueue,
    num_workers: usize,
    workers: Mutex<Vec<JoinHandle<()>>>,
    state: Mutex<StageState>,
    pushed: AtomicU64,
    processed: AtomicU64,
    faults: Mutex<Option<Sender<FaultReport>>>,
}

impl StageCore {
    pub fn new(name: &'static str, queue_capacity: usize, num_workers: usize) -> Self {
        assert!(num_workers > 0, "stage needs at least one worker");
        Self {
            name,
            queue: BoundedQueue::new(queue_capacity),
            num_workers,
            workers: Mutex::new(Vec::new()),
            state: Mutex::new(StageState::Created),
            pushed: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            faults: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn state(&self) -> StageState {
        *self.state.lock().unwrap()
    }

    pub fn push(&self, msg: Message) -> Result<(), PushError> {
        self.queue.push(msg)?;
        self.pushed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Record one processed message; returns the running count.
    pub fn mark_processed(&self) -> u64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn set_fault_sender(&self, tx: Sender<FaultReport>) {
        *self.faults.lock().unwrap() = Some(tx);
    }

    pub fn report_fault(&self, read_id: Option<String>, error: StageError) {
        let fault = FaultReport {
            stage: self.name,
            message_index: self.processed(),
            read_id,
            error,
        };
        log::error!(
            "[{}] fault at message {} (read {:?}): {}",
            fault.stage,
            fault.message_index,
            fault.read_id,
            fault.error
        );
        if let Some(tx) = self.faults.lock().unwrap().as_ref() {
            let _ = tx.send(fault);
        }
    }

    /// Spawn the worker threads, each looping on a receiver clone until the
    /// queue disconnects. Resets the per-run counters.
    pub fn start<F>(&self, work: F) -> Result<(), StageError>
    where
        F: Fn(Receiver<Message>) + Send + Clone + 'static,
    {
        let mut state = self.state.lock().unwrap();
        match *state {
            StageState::Created | StageState::Terminated => {}
            s => {
                return Err(StageError::InvalidState {
                    stage: self.name,
                    operation: "start",
                    state: s.as_str(),
                });
            }
        }
        self.queue.reopen();
        self.pushed.store(0, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);

        let mut workers = self.workers.lock().unwrap();
        for i in 0..self.num_workers {
            let f = work.clone();
            let rx = self.queue.receiver();
            let handle = std::thread::Builder::new()
                .name(format!("{}-{}", self.name, i))
                .spawn(move || f(rx))?;
            workers.push(handle);
        }
        *state = StageState::Running;
        log::debug!("[{}] started {} worker thread(s)", self.name, self.num_workers);
        Ok(())
    }

    /// Close the queue, join workers, and transition to `Terminated`.
    /// Returns false when the stage had already terminated (the caller then
    /// skips its end-of-stream forwarding).
    pub fn terminate(&self, opts: &FlushOptions) -> bool {
        {
            let mut state = self.state.lock().unwrap();
            match *state {
                StageState::Running => *state = StageState::Terminating,
                StageState::Created => {
                    *state = StageState::Terminated;
                    self.queue.close();
                    return true;
                }
                StageState::Terminating | StageState::Terminated => return false,
            }
        }

        self.queue.close();
        if !opts.drain {
            let discarded = self.queue.purge();
            if discarded > 0 {
                log::warn!("[{}] discarded {} queued message(s)", self.name, discarded);
            }
        }

        let handles: Vec<_> = self.workers.lock().unwrap().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                self.report_fault(None, StageError::WorkerPanic);
            }
        }

        *self.state.lock().unwrap() = StageState::Terminated;
        log::debug!(
            "[{}] terminated after {} message(s)",
            self.name,
            self.processed()
        );
        true
    }

    /// Counters every stage exposes; concrete stages merge their own on top.
    pub fn base_stats(&self) -> NamedStats {
        let mut stats = NamedStats::new();
        stats.insert(
            "messages_pushed".to_string(),
            self.pushed.load(Ordering::Relaxed) as f64,
        );
        stats.insert("messages_processed".to_string(), self.processed() as f64);
        stats.insert("queue_depth".to_string(), self.queue.len() as f64);
        stats
    }
}
