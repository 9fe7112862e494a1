//! The streaming pipeline substrate: bounded queues, the stage contract,
//! and the graph wiring stages together.

pub mod graph;
pub mod queue;
pub mod sink;

pub use graph::PipelineGraph;
pub use queue::BoundedQueue;
pub use sink::{FaultReport, FlushOptions, MessageSink, StageCore, StageState};
