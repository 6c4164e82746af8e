use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::{Address, U256};
use chain::ChainClient;
use eyre::Result;
use store::{Persistence, SyncOption, Transfer};
use sync::{QueuedAtomicGroup, TaskError, cancellable};
use tokio_util::sync::CancellationToken;

use crate::balance::cache::BalanceCache;
use crate::downloader::eth::EthTransferDownloader;

/// Everything one account's bisection needs.
pub struct Bisection {
    pub client: Arc<dyn ChainClient>,
    pub cache: Arc<BalanceCache>,
    pub downloader: Arc<EthTransferDownloader>,
    pub store: Arc<dyn Persistence>,
    pub address: Address,
}

impl Bisection {
    async fn balances(&self, low: u64, high: u64) -> Result<(U256, U256)> {
        let client = self.client.as_ref();
        let (low, high) = tokio::try_join!(
            self.cache.balance_at(client, self.address, low),
            self.cache.balance_at(client, self.address, high),
        )?;
        Ok((low, high))
    }
}

/// Task group of a concurrent bisection plus what its leaves found.
#[derive(Clone)]
pub struct ConcurrentDownloader {
    group: QueuedAtomicGroup,
    found: Arc<Mutex<Found>>,
}

#[derive(Default)]
struct Found {
    transfers: Vec<Transfer>,
    blocks: Vec<u64>,
}

impl ConcurrentDownloader {
    pub fn new(parent: &CancellationToken, concurrency: usize) -> Self {
        Self {
            group: QueuedAtomicGroup::new(parent, concurrency),
            found: Arc::new(Mutex::new(Found::default())),
        }
    }

    fn push(&self, block: u64, transfers: Vec<Transfer>) {
        let mut found = self.found.lock().unwrap_or_else(PoisonError::into_inner);
        found.blocks.push(block);
        found.transfers.extend(transfers);
    }

    pub fn transfers(&self) -> Vec<Transfer> {
        self.found.lock().unwrap_or_else(PoisonError::into_inner).transfers.clone()
    }

    /// Blocks the leaves downloaded, in completion order.
    pub fn blocks(&self) -> Vec<u64> {
        self.found.lock().unwrap_or_else(PoisonError::into_inner).blocks.clone()
    }

    pub async fn wait(&self) -> Result<(), TaskError> {
        self.group.wait().await
    }
}

/// Spawns the bisection of `[low, high]` onto `concurrent`.
///
/// Equal balances at both ends end the branch. An adjacent pair downloads
/// block `high` and commits its transfers on its own; anything wider is split
/// at the midpoint and both halves run concurrently.
pub fn download_eth_concurrently(
    concurrent: &ConcurrentDownloader,
    bisection: Arc<Bisection>,
    low: u64,
    high: u64,
) {
    if high <= low {
        return;
    }
    let spawner = concurrent.clone();
    concurrent.group.add(move |token| async move {
        let (low_balance, high_balance) = cancellable(&token, bisection.balances(low, high)).await?;
        if low_balance == high_balance {
            return Ok(());
        }
        if high - low == 1 {
            let transfers =
                cancellable(&token, bisection.downloader.get_transfers_by_number(high)).await?;
            if !transfers.is_empty() {
                let accounts = [bisection.address];
                bisection
                    .store
                    .process_transfers(&transfers, &accounts, &[], &[], SyncOption::NONE)
                    .await?;
            }
            tracing::debug!("Block {high} changed balance of {}", bisection.address);
            spawner.push(high, transfers);
            return Ok(());
        }
        let mid = low + (high - low) / 2;
        download_eth_concurrently(&spawner, bisection.clone(), low, mid);
        download_eth_concurrently(&spawner, bisection, mid, high);
        Ok(())
    });
}

/// One step taken by [`BinaryIterativeDownloader::next`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub low: u64,
    pub high: u64,
    pub transfers: Vec<Transfer>,
}

/// Single-threaded bisection that can checkpoint after every step.
///
/// Everything above `high` has been covered. Each step either downloads the
/// adjacent pair `(high - 1, high)` or narrows the window, and can be undone
/// with [`revert`](Self::revert) if the caller fails to persist it.
pub struct BinaryIterativeDownloader {
    bisection: Arc<Bisection>,
    floor: u64,
    low: u64,
    high: u64,
    previous: (u64, u64),
}

impl BinaryIterativeDownloader {
    pub fn new(bisection: Arc<Bisection>, from: u64, to: u64) -> Self {
        Self { bisection, floor: from, low: from, high: to, previous: (from, to) }
    }

    pub fn low(&self) -> u64 {
        self.low
    }

    pub fn high(&self) -> u64 {
        self.high
    }

    pub fn finished(&self) -> bool {
        self.high <= self.floor
    }

    fn halve(&self, number: u64) -> u64 {
        self.floor + (number - self.floor) / 2
    }

    pub async fn next(&mut self) -> Result<Step> {
        let (low, high) = (self.low, self.high);
        let (low_balance, high_balance) = self.bisection.balances(low, high).await?;
        let mut transfers = Vec::new();
        if low_balance != high_balance && high - low > 1 {
            self.previous = (low, high);
            self.low = low + (high - low) / 2;
        } else {
            if low_balance != high_balance {
                transfers = self.bisection.downloader.get_transfers_by_number(high).await?;
            }
            self.previous = (low, high);
            self.high = low;
            self.low = self.halve(low);
        }
        Ok(Step { low, high, transfers })
    }

    pub fn revert(&mut self) {
        (self.low, self.high) = self.previous;
    }
}
