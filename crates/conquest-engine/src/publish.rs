//! Observation channels.
//!
//! State goes out on `watch` slots: a new value overwrites the old one and readers always see
//! the latest. Events go out on a bounded `broadcast` ring: each subscriber gets every event
//! emitted after it subscribed, unless it falls more than the capacity behind, in which case
//! the oldest undelivered events are dropped and counted. Publishing never waits on a reader.

use std::sync::Arc;

use conquest_core::GameState;
use conquest_protocol::GameEvent;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::warn;

/// A published state value. Revisions increase by one with every publication.
#[derive(Clone, Debug)]
pub struct StateUpdate {
    pub revision: u64,
    pub state: Arc<GameState>,
}

#[derive(Clone, Debug)]
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit to every current subscriber. Emitting with no subscribers is not an error.
    pub fn publish(&self, event: GameEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> EventSubscription {
        EventSubscription {
            rx: self.tx.subscribe(),
            dropped: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

pub struct EventSubscription {
    rx: broadcast::Receiver<GameEvent>,
    dropped: u64,
}

impl EventSubscription {
    /// Next event, or `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<GameEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => self.record_lag(missed),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<GameEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(missed)) => self.record_lag(missed),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Events this subscriber lost by falling behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn record_lag(&mut self, missed: u64) {
        self.dropped += missed;
        warn!(missed, total = self.dropped, "event subscriber lagged");
    }
}
