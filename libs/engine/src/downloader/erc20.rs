use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::{Address, B256, U256, keccak256};
use chain::ChainClient;
use chain::types::{ChainLog, LogQuery, LogScope};
use eyre::{Result, eyre};
use store::model::Header;
use store::{Transfer, TransferType};
use sync::AtomicGroup;
use tokio_util::sync::CancellationToken;

use crate::downloader::handle::{BatchDownloader, TransferDownloader};

pub const TRANSFER_EVENT_SIGNATURE: &str = "Transfer(address,address,uint256)";

/// `keccak256(tx_hash ‖ be_u32(log_index))`
pub fn token_transfer_id(transaction_hash: B256, log_index: u64) -> B256 {
    let mut preimage = [0u8; 36];
    preimage[..32].copy_from_slice(transaction_hash.as_slice());
    // Log indexes above u32::MAX do not occur in practice.
    preimage[32..].copy_from_slice(&(log_index as u32).to_be_bytes());
    keccak256(preimage)
}

/// Token transfers, found through `Transfer` event logs with a watched
/// account as sender or receiver topic.
pub struct Erc20TransfersDownloader {
    client: Arc<dyn ChainClient>,
    accounts: Vec<Address>,
    signature: B256,
    cancel: CancellationToken,
}

impl Erc20TransfersDownloader {
    pub fn new(client: Arc<dyn ChainClient>, accounts: Vec<Address>) -> Self {
        let signature = keccak256(TRANSFER_EVENT_SIGNATURE);
        Self { client, accounts, signature, cancel: CancellationToken::new() }
    }

    /// Log resolution stops once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn outbound(&self, scope: LogScope, address: Address) -> LogQuery {
        LogQuery { scope, topics: [Some(self.signature), Some(address.into_word()), None] }
    }

    fn inbound(&self, scope: LogScope, address: Address) -> LogQuery {
        LogQuery { scope, topics: [Some(self.signature), None, Some(address.into_word())] }
    }

    async fn logs_of(&self, scope: LogScope, address: Address) -> Result<Vec<ChainLog>> {
        let outbound = self.outbound(scope, address);
        let inbound = self.inbound(scope, address);
        let (sent, received) = tokio::try_join!(
            self.client.filter_logs(&outbound),
            self.client.filter_logs(&inbound),
        )?;
        // Self-transfers match both queries.
        let mut seen = HashSet::new();
        Ok(sent
            .into_iter()
            .chain(received)
            .filter(|log| seen.insert((log.transaction_hash, log.log_index)))
            .collect())
    }

    async fn get_transfers_in_scope(
        &self,
        scope: LogScope,
        known: Option<Header>,
    ) -> Result<Vec<Transfer>> {
        let mut transfers = Vec::new();
        for address in &self.accounts {
            let logs = self.logs_of(scope, *address).await?;
            if logs.is_empty() {
                continue;
            }
            transfers.extend(self.transfers_from_logs(logs, *address, known).await?);
        }
        transfers.sort_by_key(|transfer| (transfer.block.number, transfer.log_index));
        Ok(transfers)
    }

    /// Resolves every log concurrently; the first failure cancels the rest.
    async fn transfers_from_logs(
        &self,
        logs: Vec<ChainLog>,
        address: Address,
        known: Option<Header>,
    ) -> Result<Vec<Transfer>> {
        let group = AtomicGroup::new(&self.cancel);
        let results = Arc::new(Mutex::new(Vec::with_capacity(logs.len())));
        for log in logs {
            let client = self.client.clone();
            let results = results.clone();
            group.add(move |token| async move {
                let transfer = sync::cancellable(
                    &token,
                    transfer_from_log(client.as_ref(), log, address, known),
                )
                .await?;
                results.lock().unwrap_or_else(PoisonError::into_inner).push(transfer);
                Ok(())
            });
        }
        group.wait().await?;
        let mut results = results.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(std::mem::take(&mut *results))
    }
}

async fn transfer_from_log(
    client: &dyn ChainClient,
    log: ChainLog,
    address: Address,
    known: Option<Header>,
) -> Result<Transfer> {
    let block = async {
        match known {
            Some(header) if header.hash == log.block_hash => Ok(header),
            _ => client.header_by_hash(log.block_hash).await,
        }
    };
    let (tx, receipt, block) = tokio::try_join!(
        client.transaction_by_hash(log.transaction_hash),
        client.transaction_receipt(log.transaction_hash),
        block,
    )?;
    let from = log
        .topic(1)
        .map(|topic| Address::from_word(*topic))
        .ok_or_else(|| eyre!("transfer log {} without sender", log.transaction_hash))?;
    Ok(Transfer {
        transfer_type: TransferType::Erc20,
        id: token_transfer_id(log.transaction_hash, log.log_index),
        address,
        block,
        transaction_hash: log.transaction_hash,
        log_index: Some(log.log_index),
        signer: tx.from,
        from,
        to: log.topic(2).map(|topic| Address::from_word(*topic)),
        contract: Some(log.address),
        // Non-fungible transfers carry the id as a topic and no amount.
        value: U256::try_from_be_slice(&log.data).unwrap_or_default(),
        receipt_status: receipt.status,
    })
}

#[async_trait::async_trait]
impl TransferDownloader for Erc20TransfersDownloader {
    async fn get_transfers(&self, header: &Header) -> Result<Vec<Transfer>> {
        let scope = LogScope::Block(header.hash);
        let transfers = self.get_transfers_in_scope(scope, Some(*header)).await?;
        tracing::debug!("Block {} has {} token transfers", header.number, transfers.len());
        Ok(transfers)
    }
}

#[async_trait::async_trait]
impl BatchDownloader for Erc20TransfersDownloader {
    async fn get_transfers_in_range(&self, from: u64, to: u64) -> Result<Vec<Transfer>> {
        let started = std::time::Instant::now();
        let transfers = self.get_transfers_in_scope(LogScope::Range { from, to }, None).await?;
        tracing::debug!(
            "Found {} token transfers in [{from}, {to}] in {:?}",
            transfers.len(),
            started.elapsed()
        );
        Ok(transfers)
    }
}
