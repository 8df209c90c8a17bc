//! In-process fan-out of transition facts.
//!
//! [`BroadcastMirror`] hands every fact to any number of subscribers over a tokio
//! broadcast channel. A mirror writer (outside this workspace) subscribes and applies
//! facts to its own store; slow subscribers lag and skip rather than block publishers.

use std::future::Future;
use std::pin::Pin;
use ticketchain_core::mirror::{MirrorError, MirrorSink, TransitionFact};
use tokio::sync::broadcast;

/// Broadcast-channel [`MirrorSink`].
#[derive(Clone, Debug)]
pub struct BroadcastMirror {
    sender: broadcast::Sender<TransitionFact>,
}

impl BroadcastMirror {
    /// Create a mirror whose subscribers buffer up to `capacity` facts each.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to facts published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TransitionFact> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl MirrorSink for BroadcastMirror {
    fn publish(
        &self,
        fact: TransitionFact,
    ) -> Pin<Box<dyn Future<Output = Result<(), MirrorError>> + Send + '_>> {
        Box::pin(async move {
            self.sender
                .send(fact)
                .map(|_| ())
                .map_err(|_| MirrorError::Unavailable("no mirror subscribers".to_string()))
        })
    }
}
