use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use duosweep_protocol::ServerMessage;
use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use thiserror::Error;
use web_time::Instant;

pub type ConnectionId = u64;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

pub fn next_connection_id() -> ConnectionId {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("connection {0} is closed")]
pub struct SendError(pub ConnectionId);

/// One live client channel. Sends never block and fail once the peer is gone.
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;
    fn send(&self, message: ServerMessage) -> Result<(), SendError>;
}

/// A connection backed by an unbounded queue, drained by the transport's writer task.
#[derive(Debug, Clone)]
pub struct ChannelConnection {
    id: ConnectionId,
    outbox: UnboundedSender<ServerMessage>,
}

impl ChannelConnection {
    pub fn new(id: ConnectionId) -> (Self, UnboundedReceiver<ServerMessage>) {
        let (outbox, inbox) = mpsc::unbounded();
        (Self { id, outbox }, inbox)
    }
}

impl Connection for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn send(&self, message: ServerMessage) -> Result<(), SendError> {
        self.outbox
            .unbounded_send(message)
            .map_err(|_| SendError(self.id))
    }
}

/// Source of "now" for turn clocks and idle eviction.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
