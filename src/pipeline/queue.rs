//! Bounded multi-producer queue feeding a stage's worker threads.
//!
//! Built on a `crossbeam_channel` bounded channel plus a termination
//! channel: closing the termination side wakes producers blocked on a full
//! queue so they observe `Rejected` instead of hanging. Workers keep
//! receiving after close until the queue drains and disconnects, which is
//! what gives stages their drain-complete termination guarantee.

use crate::error::PushError;
use crate::messages::Message;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::Mutex;

struct Endpoints {
    tx: Option<Sender<Message>>,
    rx: Receiver<Message>,
    term_tx: Option<Sender<()>>,
    term_rx: Receiver<()>,
}

impl Endpoints {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        let (term_tx, term_rx) = bounded(0);
        Self {
            tx: Some(tx),
            rx,
            term_tx: Some(term_tx),
            term_rx,
        }
    }
}

pub struct BoundedQueue {
    capacity: usize,
    endpoints: Mutex<Endpoints>,
}

impl BoundedQueue {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            capacity,
            endpoints: Mutex::new(Endpoints::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue a message, blocking while the queue is full. Fails with
    /// `Rejected` once the queue is closed, including for producers already
    /// blocked at that point. A push racing `close` may still be accepted;
    /// it is then drained by the workers before termination completes, so
    /// the no-message-loss and end-of-stream-last guarantees hold either way.
    pub fn push(&self, msg: Message) -> Result<(), PushError> {
        let (tx, term_rx) = {
            let guard = self.endpoints.lock().unwrap();
            match &guard.tx {
                Some(tx) => (tx.clone(), guard.term_rx.clone()),
                None => return Err(PushError::Rejected),
            }
        };
        // The lock is released before blocking: a full queue must not stall
        // concurrent closers or stat samplers.
        crossbeam_channel::select! {
            send(tx, msg) -> res => res.map_err(|_| PushError::Rejected),
            recv(term_rx) -> _ => Err(PushError::Rejected),
        }
    }

    /// Consumer endpoint for a worker thread. `recv` returns messages in
    /// push order and disconnects once the queue is closed and empty.
    pub fn receiver(&self) -> Receiver<Message> {
        self.endpoints.lock().unwrap().rx.clone()
    }

    /// Stop accepting pushes and wake blocked producers.
    pub fn close(&self) {
        let mut guard = self.endpoints.lock().unwrap();
        guard.tx.take();
        guard.term_tx.take();
    }

    /// Discard queued messages without processing them. Racing workers may
    /// still pop some; callers use this only for non-draining termination.
    pub fn purge(&self) -> usize {
        let rx = self.receiver();
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }

    /// Recreate the channel pair for a restarted stage. Receivers handed to
    /// previous workers stay bound to the old, closed channel.
    pub fn reopen(&self) {
        *self.endpoints.lock().unwrap() = Endpoints::new(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.endpoints.lock().unwrap().rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
