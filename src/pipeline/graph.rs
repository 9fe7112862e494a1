//! Wiring of stages into a pipeline.
//!
//! Stages are added sinks-first: a stage holds an `Arc` to its downstream
//! sink, so every downstream outlives the upstreams that reference it and
//! teardown in reverse order is safe. The last stage added is the entry
//! point for pushes.

use super::sink::{FaultReport, FlushOptions, MessageSink};
use crate::error::{PushError, StageError};
use crate::messages::Message;
use crate::stats::{prefixed, NamedStats};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;

pub struct PipelineGraph {
    /// Construction order: sinks first, sources last.
    stages: Vec<Arc<dyn MessageSink>>,
    fault_tx: Sender<FaultReport>,
    fault_rx: Receiver<FaultReport>,
}

impl Default for PipelineGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineGraph {
    pub fn new() -> Self {
        let (fault_tx, fault_rx) = unbounded();
        Self {
            stages: Vec::new(),
            fault_tx,
            fault_rx,
        }
    }

    /// Sender half of the supervisory channel, for stages constructed
    /// outside `add_stage`.
    pub fn fault_sender(&self) -> Sender<FaultReport> {
        self.fault_tx.clone()
    }

    /// Add a stage (downstream stages must be added before the stages that
    /// push into them). Wires the stage into the fault channel and returns
    /// its node index.
    pub fn add_stage(&mut self, stage: Arc<dyn MessageSink>) -> usize {
        stage.set_fault_sender(self.fault_tx.clone());
        self.stages.push(stage);
        self.stages.len() - 1
    }

    /// The entry stage: the most recently added one.
    pub fn entry(&self) -> Option<&Arc<dyn MessageSink>> {
        self.stages.last()
    }

    /// Push a message into the entry stage.
    pub fn push(&self, msg: Message) -> Result<(), PushError> {
        match self.entry() {
            Some(stage) => stage.push(msg),
            None => Err(PushError::Rejected),
        }
    }

    /// Terminate source-to-sink so each stage drains before its downstream
    /// observes `EndOfStream`.
    pub fn terminate(&self, opts: &FlushOptions) {
        for stage in self.stages.iter().rev() {
            log::debug!("terminating stage [{}]", stage.name());
            stage.terminate(opts);
        }
    }

    /// Restart sink-to-source so a stage's downstream is accepting messages
    /// before the stage itself starts forwarding.
    pub fn restart(&self) -> Result<(), StageError> {
        for stage in &self.stages {
            stage.restart()?;
        }
        Ok(())
    }

    /// Merged counter snapshot across all stages, keyed
    /// `stage_name.counter`.
    pub fn sample_stats(&self) -> NamedStats {
        let mut merged = NamedStats::new();
        for stage in &self.stages {
            merged.extend(prefixed(stage.name(), &stage.sample_stats()));
        }
        merged
    }

    /// Drain any faults reported since the last call.
    pub fn take_faults(&self) -> Vec<FaultReport> {
        self.fault_rx.try_iter().collect()
    }
}
