use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::{Address, TxHash};
use chain::ChainClient;
use chain::types::{ChainBlock, ChainTransaction};
use eyre::Result;
use futures_util::future::try_join_all;
use store::model::Header;
use store::{Transfer, TransferType};

use crate::balance::cache::BalanceCache;
use crate::downloader::handle::TransferDownloader;

/// Native-coin transfers, found by comparing balances around a block.
///
/// A block is scanned only for accounts whose balance changed in it. Within
/// the block a transaction matches an account when it is sent to it, or signed
/// by it with an empty payload. Balance changes that no transaction explains
/// (fees of contract calls, rewards) yield no transfer.
pub struct EthTransferDownloader {
    client: Arc<dyn ChainClient>,
    cache: Arc<BalanceCache>,
    accounts: Vec<Address>,
}

impl EthTransferDownloader {
    pub fn new(
        client: Arc<dyn ChainClient>,
        cache: Arc<BalanceCache>,
        accounts: Vec<Address>,
    ) -> Self {
        Self { client, cache, accounts }
    }

    pub fn accounts(&self) -> &[Address] {
        &self.accounts
    }

    /// Scans block `number` for every watched account, without a balance check.
    pub async fn get_transfers_by_number(&self, number: u64) -> Result<Vec<Transfer>> {
        let block = self.client.block_by_number(number).await?;
        self.transfers_in_block(&block, &self.accounts).await
    }

    async fn changed_accounts(&self, header: &Header) -> Result<Vec<Address>> {
        let Some(parent) = header.number.checked_sub(1) else {
            // Genesis has nothing to compare against.
            return Ok(self.accounts.clone());
        };
        let client = self.client.as_ref();
        let comparisons = self.accounts.iter().map(|address| async move {
            let before = self.cache.balance_at(client, *address, parent).await?;
            let after = self.cache.balance_at(client, *address, header.number).await?;
            Ok::<_, eyre::Report>((*address, before != after))
        });
        let changed = try_join_all(comparisons).await?;
        let changed = changed.into_iter().filter(|(_, changed)| *changed);
        Ok(changed.map(|(address, _)| address).collect())
    }

    async fn transfers_in_block(
        &self,
        block: &ChainBlock,
        accounts: &[Address],
    ) -> Result<Vec<Transfer>> {
        let mut receipts = HashMap::<TxHash, bool>::new();
        let mut transfers = Vec::new();
        for tx in &block.transactions {
            for account in accounts.iter().filter(|account| matches(tx, **account)) {
                let status = match receipts.get(&tx.hash) {
                    Some(status) => *status,
                    None => {
                        let receipt = self.client.transaction_receipt(tx.hash).await?;
                        receipts.insert(tx.hash, receipt.status);
                        receipt.status
                    }
                };
                transfers.push(Transfer {
                    transfer_type: TransferType::Eth,
                    id: tx.hash,
                    address: *account,
                    block: block.header,
                    transaction_hash: tx.hash,
                    log_index: None,
                    signer: tx.from,
                    from: tx.from,
                    to: tx.to,
                    contract: None,
                    value: tx.value,
                    receipt_status: status,
                });
            }
        }
        Ok(transfers)
    }
}

fn matches(tx: &ChainTransaction, account: Address) -> bool {
    tx.to == Some(account) || (tx.from == account && tx.input.is_empty())
}

#[async_trait::async_trait]
impl TransferDownloader for EthTransferDownloader {
    async fn get_transfers(&self, header: &Header) -> Result<Vec<Transfer>> {
        let changed = self.changed_accounts(header).await?;
        if changed.is_empty() {
            return Ok(Vec::new());
        }
        let block = self.client.block_by_hash(header.hash).await?;
        let transfers = self.transfers_in_block(&block, &changed).await?;
        tracing::debug!("Block {} has {} native transfers", header.number, transfers.len());
        Ok(transfers)
    }
}
