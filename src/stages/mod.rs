//! Concrete pipeline stages.

pub mod forwarder;
pub mod null;
pub mod tail_length;

pub use forwarder::ForwarderStage;
pub use null::NullStage;
pub use tail_length::TailLengthStage;
