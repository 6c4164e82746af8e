use std::sync::Arc;

use alloy::primitives::Address;
use chain::ChainClient;
use store::Persistence;

use crate::args::Args;
use crate::balance::cache::BalanceCache;
use crate::event::{Event, EventFeed, EventType};

/// Collaborators shared by every command of one engine instance.
pub struct SyncContext {
    pub client: Arc<dyn ChainClient>,
    pub store: Arc<dyn Persistence>,
    pub feed: EventFeed,
    pub cache: Arc<BalanceCache>,
    pub args: Args,
}

impl SyncContext {
    pub fn new(
        client: Arc<dyn ChainClient>,
        store: Arc<dyn Persistence>,
        feed: EventFeed,
        args: Args,
    ) -> Self {
        Self { client, store, feed, cache: Arc::new(BalanceCache::new()), args }
    }
}

impl SyncContext {
    /// Raises `FetchError` once per failure streak, when it reaches the configured threshold.
    pub fn report_failure(
        &self,
        consecutive: u32,
        block_number: Option<u64>,
        accounts: &[Address],
    ) {
        let threshold = self.args.max_consecutive_errors;
        if threshold > 0 && consecutive == threshold {
            tracing::error!("{consecutive} consecutive failures syncing {accounts:?}");
            self.feed.send(Event::new(EventType::FetchError, block_number, accounts.to_vec()));
        }
    }
}
