// src/feed.rs
//! "Something changed" signals for live result pages.
//!
//! Events never carry data. A subscriber that sees one should re-read the
//! poll list and derive everything again from that snapshot.
use std::{convert::Infallible, fmt};

use axum::response::sse::Event;
use futures::{stream, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Polls,
    Votes,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Polls => f.write_str("polls"),
            Change::Votes => f.write_str("votes"),
        }
    }
}

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<Change>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, change: Change) {
        // No subscribers is normal when nobody has a page open.
        let receivers = self.sender.send(change).unwrap_or(0);
        debug!(%change, receivers, "published change");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Change> {
        self.sender.subscribe()
    }

    /// SSE stream of `change` events; a lagging subscriber gets a single `resync`.
    pub fn events(&self) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
        stream::unfold(self.subscribe(), |mut receiver| async move {
            let event = match receiver.recv().await {
                Ok(change) => Event::default().event("change").data(change.to_string()),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "change feed subscriber lagged");
                    Event::default().event("resync").data("polls")
                }
                Err(RecvError::Closed) => return None,
            };
            Some((Ok(event), receiver))
        })
    }
}
