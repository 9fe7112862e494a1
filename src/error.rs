//! Error taxonomy for the pipeline and the realignment engine.
//!
//! `PushError` is recoverable by the caller (retry after restart, or drop).
//! `RealignError` is surfaced to the realignment caller and never silently
//! mapped to an empty or truncated move table. `StageError` covers worker
//! failures reported through the supervisory fault channel.

use thiserror::Error;

/// Push attempted on a terminating or terminated stage.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PushError {
    #[error("push rejected: stage is not accepting messages")]
    Rejected,
}

/// Realignment cannot establish a usable correspondence between sequences.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RealignError {
    #[error("no overlap found between query and target sequences")]
    NoOverlap,

    #[error("overlap region between query and target is empty")]
    DegenerateOverlap,
}

/// Unrecoverable per-stage failures, reported through the fault channel
/// rather than aborting the whole process.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("stage {stage}: cannot {operation} from state {state}")]
    InvalidState {
        stage: &'static str,
        operation: &'static str,
        state: &'static str,
    },

    #[error("worker thread panicked")]
    WorkerPanic,

    #[error(transparent)]
    Realign(#[from] RealignError),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{0}")]
    Fatal(String),
}
