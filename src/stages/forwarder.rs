//! Callback sink: hands every message to a supplied closure.
//!
//! This is the boundary to the output collaborator (serialization lives
//! behind the callback) and doubles as the mock sink for pipeline tests.

use crate::error::{PushError, StageError};
use crate::messages::Message;
use crate::pipeline::{FaultReport, FlushOptions, MessageSink, StageCore};
use crate::stats::NamedStats;
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;

pub struct ForwarderStage {
    core: Arc<StageCore>,
    callback: Arc<dyn Fn(Message) + Send + Sync>,
}

impl ForwarderStage {
    pub fn new<F>(
        num_workers: usize,
        queue_capacity: usize,
        callback: F,
    ) -> Result<Arc<Self>, StageError>
    where
        F: Fn(Message) + Send + Sync + 'static,
    {
        let stage = Arc::new(Self {
            core: Arc::new(StageCore::new("forwarder", queue_capacity, num_workers)),
            callback: Arc::new(callback),
        });
        stage.spawn()?;
        Ok(stage)
    }

    fn spawn(&self) -> Result<(), StageError> {
        let core = Arc::clone(&self.core);
        let callback = Arc::clone(&self.callback);
        self.core.start(move |rx: Receiver<Message>| {
            while let Ok(msg) = rx.recv() {
                core.mark_processed();
                (callback)(msg);
            }
        })
    }
}

impl MessageSink for ForwarderStage {
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
