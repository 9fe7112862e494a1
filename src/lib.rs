pub mod config; // Tail-calling configuration (primers, flanks, thresholds)
pub mod error;
pub mod messages; // Message payloads flowing through the pipeline graph
pub mod pipeline; // Stage contract, bounded queues, pipeline graph
pub mod progress; // Periodic progress reporting across input units
pub mod realign; // Signal-to-sequence realignment (overlap search + move tables)
pub mod sequence; // Base/quality lookup tables and move-table helpers
pub mod stages; // Concrete pipeline stages
pub mod stats;

pub use error::{PushError, RealignError, StageError};
pub use messages::{Message, OutputRecord, Polarity, SignalRead, TailInfo};
pub use pipeline::{FaultReport, FlushOptions, MessageSink, PipelineGraph, StageState};
pub use realign::{realign_moves, Overlap, RealignResult};
