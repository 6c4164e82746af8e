use std::sync::Arc;

use alloy::primitives::Address;
use eyre::Result;
use store::model::Header;
use store::{SyncOption, Transfer};
use sync::Runnable;
use tokio_util::sync::CancellationToken;

use crate::context::SyncContext;
use crate::downloader::erc20::Erc20TransfersDownloader;
use crate::downloader::eth::EthTransferDownloader;
use crate::downloader::handle::TransferDownloader;
use crate::error::EngineError;
use crate::event::{Event, EventType, unique_accounts};

/// Follows the chain head one block per tick, resolving reorgs against the store.
pub struct NewBlocksCommand {
    ctx: Arc<SyncContext>,
    accounts: Vec<Address>,
    eth: EthTransferDownloader,
    erc20: Erc20TransfersDownloader,
    previous: Option<Header>,
}

impl NewBlocksCommand {
    /// Without `previous`, the first tick accepts the current head as is.
    pub fn new(ctx: Arc<SyncContext>, accounts: Vec<Address>, previous: Option<Header>) -> Self {
        let eth =
            EthTransferDownloader::new(ctx.client.clone(), ctx.cache.clone(), accounts.clone());
        let erc20 = Erc20TransfersDownloader::new(ctx.client.clone(), accounts.clone());
        Self { ctx, accounts, eth, erc20, previous }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.erc20 = self.erc20.with_cancellation(token);
        self
    }

    pub fn previous(&self) -> Option<Header> {
        self.previous
    }

    /// Headers to add and to remove so that the store ends on `latest`'s fork.
    ///
    /// Both lists are ordered from the tip down. Nothing is returned when
    /// `latest` is already stored.
    pub async fn on_new_block(
        &self,
        previous: Option<&Header>,
        latest: Header,
    ) -> Result<(Vec<Header>, Vec<Header>)> {
        if self.ctx.store.header_exists(latest.hash).await? {
            return Ok((Vec::new(), Vec::new()));
        }
        let Some(previous) = previous else {
            return Ok((vec![latest], Vec::new()));
        };
        if previous.hash == latest.parent_hash {
            return Ok((vec![latest], Vec::new()));
        }

        tracing::warn!(
            "Reorg spotted at {}: stored {} but new parent is {}",
            latest.number,
            previous.hash,
            latest.parent_hash
        );
        let (mut added, mut removed) = (Vec::new(), Vec::new());
        let mut latest = latest;
        let mut from = Some(*previous);
        while let Some(local) = from.filter(|local| local.hash != latest.parent_hash) {
            if removed.len() as u64 >= self.ctx.args.safety_depth {
                let depth = removed.len();
                tracing::warn!("Reorg deeper than {depth} blocks, stopping at {}", local.number);
                break;
            }
            removed.push(local);
            added.push(latest);
            latest = match self.ctx.client.header_by_hash(latest.parent_hash).await {
                Ok(parent) => parent,
                Err(e) if e.is_not_found() => {
                    return Err(EngineError::MissingParent(latest.parent_hash).into());
                }
                Err(e) => return Err(e.into()),
            };
            from = match latest.number.checked_sub(1) {
                Some(number) => self.ctx.store.get_header_by_number(number).await?,
                None => None,
            };
        }
        added.push(latest);
        Ok((added, removed))
    }

    async fn get_transfers(&self, header: &Header) -> Result<Vec<Transfer>> {
        let (mut eth, erc20) =
            tokio::try_join!(self.eth.get_transfers(header), self.erc20.get_transfers(header))?;
        eth.extend(erc20);
        Ok(eth)
    }

    /// Processes the block after `previous`. Returns the event it emitted, if any.
    pub async fn tick(&mut self) -> Result<Option<Event>> {
        let number = self.previous.map(|previous| previous.number + 1);
        let latest = match self.ctx.client.header_by_number(number).await {
            Ok(header) => header,
            Err(e) if e.is_not_found() => {
                tracing::trace!("Block {number:?} not produced yet");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let (added, removed) = self.on_new_block(self.previous.as_ref(), latest).await?;
        if added.is_empty() && removed.is_empty() {
            tracing::debug!("Block {} already stored", latest.number);
            self.previous = Some(latest);
            return Ok(None);
        }

        if !removed.is_empty() {
            // Balances are cached by number and may belong to the dropped fork.
            self.ctx.cache.clear();
        }
        let mut transfers = Vec::new();
        for header in &added {
            transfers.extend(self.get_transfers(header).await?);
        }
        self.ctx
            .store
            .process_transfers(&transfers, &self.accounts, &added, &removed, SyncOption::ALL)
            .await?;
        // Only a committed block becomes the new cursor.
        self.previous = Some(latest);

        let accounts = unique_accounts(&transfers);
        let event = match removed.last() {
            Some(deepest) => Event::new(EventType::Reorg, Some(deepest.number), accounts),
            None => Event::new(EventType::NewBlock, Some(latest.number), accounts),
        };
        tracing::info!(
            "Block {} synced: +{} -{} headers, {} transfers",
            latest.number,
            added.len(),
            removed.len(),
            transfers.len()
        );
        self.ctx.feed.send(event.clone());
        Ok(Some(event))
    }
}

#[async_trait::async_trait]
impl Runnable for NewBlocksCommand {
    async fn run(&mut self, _token: &CancellationToken) -> Result<()> {
        self.tick().await.map(|_| ())
    }

    fn on_failure(&mut self, _error: &eyre::Report, consecutive: u32) {
        let next = self.previous.map(|previous| previous.number + 1);
        self.ctx.report_failure(consecutive, next, &self.accounts);
    }
}
