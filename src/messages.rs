//! Message payloads flowing through the pipeline graph.
//!
//! Ownership transfers on every push: the sender relinquishes the message
//! and the receiver exclusively owns it until forwarded or consumed.

/// Strand chemistry of a read. RNA reads carry their poly(A) region near the
/// start of the called sequence, DNA (cDNA) reads near the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Dna,
    Rna,
}

/// Tail annotation produced by the tail-length stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailInfo {
    /// Estimated tail length in bases.
    pub tail_length: i32,
    /// Raw-signal sample range `[start, end)` attributed to the tail.
    pub signal_range: (usize, usize),
}

/// A basecalled signal read as produced by the inference collaborator.
#[derive(Debug, Clone)]
pub struct SignalRead {
    pub id: String,
    pub client_id: u32,
    pub polarity: Polarity,
    /// Raw signal samples.
    pub signal: Vec<i16>,
    /// Called base sequence (ASCII `ACGT`).
    pub seq: Vec<u8>,
    /// Per-base quality, phred+33.
    pub qual: Vec<u8>,
    /// One 0/1 flag per raw-signal block; flag=1 marks the block containing
    /// the start of a new base. The count of 1-flags equals `seq.len()`.
    pub moves: Vec<u8>,
    /// Raw-signal samples per move-table block.
    pub block_stride: usize,
    /// Filled in by the tail-length stage when a tail is called.
    pub tail: Option<TailInfo>,
}

impl SignalRead {
    /// Mean number of raw-signal samples per called base.
    pub fn samples_per_base(&self) -> f32 {
        if self.seq.is_empty() {
            return 0.0;
        }
        self.signal.len() as f32 / self.seq.len() as f32
    }
}

/// Opaque output record produced by excluded collaborators; the core only
/// guarantees delivery ordering, not format.
#[derive(Debug, Clone)]
pub struct OutputRecord {
    pub id: String,
    pub payload: Vec<u8>,
}

/// The closed set of payloads a stage can receive.
#[derive(Debug)]
pub enum Message {
    Read(Box<SignalRead>),
    Output(OutputRecord),
    EndOfStream,
}

impl Message {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Message::EndOfStream)
    }

    /// Read id for fault context, when the message carries one.
    pub fn read_id(&self) -> Option<&str> {
        match self {
            Message::Read(read) => Some(&read.id),
            Message::Output(record) => Some(&record.id),
            Message::EndOfStream => None,
        }
    }
}
