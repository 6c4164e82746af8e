use alloy::primitives::Address;
use store::Transfer;
use tokio::sync::broadcast;

const FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    NewBlock,
    Reorg,
    NewHistory,
    RecentHistoryReady,
    FetchError,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub event_type: EventType,
    pub block_number: Option<u64>,
    pub accounts: Vec<Address>,
}

impl Event {
    pub fn new(event_type: EventType, block_number: Option<u64>, accounts: Vec<Address>) -> Self {
        Self { event_type, block_number, accounts }
    }
}

/// Fan-out of engine events to any number of subscribers.
///
/// Delivery is at most once: nothing is replayed to late or lagging subscribers.
#[derive(Clone, Debug)]
pub struct EventFeed {
    tx: broadcast::Sender<Event>,
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new(FEED_CAPACITY)
    }
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: Event) {
        tracing::debug!("Event {:?} at {:?}", event.event_type, event.block_number);
        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}

/// Sorted, de-duplicated owners of `transfers`.
pub fn unique_accounts(transfers: &[Transfer]) -> Vec<Address> {
    let mut accounts: Vec<Address> = transfers.iter().map(|transfer| transfer.address).collect();
    accounts.sort();
    accounts.dedup();
    accounts
}
