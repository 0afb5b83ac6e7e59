//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus is the **observation channel** for circulation events: a pub/sub
//! mechanism distributing events to any number of consumers. It is
//! intentionally lightweight and makes minimal assumptions:
//!
//! - **Transport-agnostic**: works with in-memory channels today; nothing in
//!   the contract precludes another transport later.
//! - **Broadcast semantics**: each subscriber gets a copy of every event.
//! - **No persistence**: the bus distributes, it does not store. All state in
//!   this system is process-lifetime only.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription receives a copy of all events published after it was
/// created. Designed for single-threaded consumption: the whole system runs
/// on one logical thread of control, so a consumer drains with `try_recv`
/// between user-initiated operations.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued.
    pub fn drain(&self) -> Vec<M> {
        let mut out = Vec::new();
        while let Ok(m) = self.try_recv() {
            out.push(m);
        }
        out
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish()` can fail; failures are surfaced to the caller, which decides
/// whether the operation as a whole fails. Consumers must tolerate events
/// arriving more than once if a caller retries.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
