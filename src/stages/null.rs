//! Null sink: input messages go nowhere.

use crate::error::{PushError, StageError};
use crate::messages::Message;
use crate::pipeline::{FaultReport, FlushOptions, MessageSink, StageCore};
use crate::stats::NamedStats;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

pub struct NullStage {
    core: Arc<StageCore>,
}

impl NullStage {
    pub fn new(num_workers: usize, queue_capacity: usize) -> Result<Arc<Self>, StageError> {
        let stage = Arc::new(Self {
            core: Arc::new(StageCore::new("null", queue_capacity, num_workers)),
        });
        stage.spawn()?;
        Ok(stage)
    }

    fn spawn(&self) -> Result<(), StageError> {
        let core = Arc::clone(&self.core);
        self.core.start(move |rx: Receiver<Message>| {
            while let Ok(msg) = rx.recv() {
                drop(msg);
                core.mark_processed();
            }
        })
    }
}

impl MessageSink for NullStage {
    fn name(&self) -> &'static str {
        self.core.name()
    }

    fn push(&self, msg: Message) -> Result<(), PushError> {
        self.core.push(msg)
    }

    fn terminate(&self, opts: &FlushOptions) {
        self.core.terminate(opts);
    }

    fn restart(&self) -> Result<(), StageError> {
        self.spawn()
    }

    fn sample_stats(&self) -> NamedStats {
        self.core.base_stats()
    }

    fn set_fault_sender(&self, tx: Sender<FaultReport>) {
        self.core.set_fault_sender(tx);
    }
}
