// Router event bus
//
// Broadcasts allowance changes, routing table changes and executed exchanges
// to any number of subscribers. Sends never block and never fail the caller.
//
// Numan Thabit 2025 Nov

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::router::routes::{AssetId, VenueId};

/// Which table an admin operation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    MajorRoutes,
    MinorEdges,
    LpEntries,
    Adapters,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RouterEvent {
    AllowanceGranted {
        venue: VenueId,
        asset: AssetId,
    },
    AllowanceRevoked {
        venue: VenueId,
        asset: AssetId,
    },
    TablesChanged {
        table: TableKind,
        created: usize,
        deleted: usize,
    },
    Exchanged {
        caller: String,
        from: AssetId,
        to: AssetId,
        amount_in: u128,
        amount_out: u128,
    },
}

#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<RouterEvent>,
}

impl EventBus {
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RouterEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: RouterEvent) {
        // no subscribers is fine
        let _ = self.tx.send(event);
    }

    pub fn publish_all(&self, events: impl IntoIterator<Item = RouterEvent>) {
        for event in events {
            trace!(?event, "router event");
            self.publish(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
