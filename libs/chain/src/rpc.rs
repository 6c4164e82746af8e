use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use alloy::consensus::Transaction as TxTrait;
use alloy::eips::{BlockId, BlockNumberOrTag};
use alloy::network::TransactionResponse;
use alloy::primitives::{Address, BlockHash, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::{
    Block, Filter, Log, Transaction, TransactionInput, TransactionReceipt, TransactionRequest,
};
use alloy::transports::http::reqwest::Url;

use crate::client::{ChainClient, ChainError};
use crate::metrics::{NoopMetrics, RpcMetrics};
use crate::types::{
    ChainBlock, ChainLog, ChainReceipt, ChainTransaction, Header, LogQuery, LogScope,
};

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

const MAINNET_CHAIN_ID: u64 = 1;
const BINANCE_CHAIN_ID: u64 = 56;
const BINANCE_TEST_CHAIN_ID: u64 = 97;
const OPTIMISM_CHAIN_ID: u64 = 10;
const ARBITRUM_CHAIN_ID: u64 = 42161;

/// Average block time of the chain, used as the head polling period.
pub fn polling_period_by_chain(chain_id: u64) -> Duration {
    match chain_id {
        MAINNET_CHAIN_ID => Duration::from_secs(12),
        BINANCE_CHAIN_ID | BINANCE_TEST_CHAIN_ID => Duration::from_secs(3),
        OPTIMISM_CHAIN_ID => Duration::from_secs(2),
        ARBITRUM_CHAIN_ID => Duration::from_secs(1),
        _ => Duration::from_secs(4),
    }
}

/// Read-only JSON-RPC client. Every call is bounded by `timeout` and counted by `metrics`.
#[derive(Clone)]
pub struct NodeClient {
    provider: DynProvider,
    timeout: Duration,
    metrics: Arc<dyn RpcMetrics>,
}

impl NodeClient {
    pub fn new(rpc_url: Url) -> Self {
        Self::with_metrics(rpc_url, DEFAULT_RPC_TIMEOUT, Arc::new(NoopMetrics))
    }

    pub fn with_metrics(rpc_url: Url, timeout: Duration, metrics: Arc<dyn RpcMetrics>) -> Self {
        let rpc_client = RpcClient::new_http(rpc_url);
        let provider = ProviderBuilder::new().connect_client(rpc_client).erased();
        Self { provider, timeout, metrics }
    }

    pub fn borrow_provider(&self) -> &DynProvider {
        &self.provider
    }

    pub async fn get_chain_id(&self) -> Result<u64, ChainError> {
        self.call("eth_chainId", async { Ok(self.provider.get_chain_id().await?) }).await
    }

    async fn call<T, F>(&self, method: &'static str, request: F) -> Result<T, ChainError>
    where
        F: Future<Output = Result<T, ChainError>>,
    {
        self.metrics.record(method);
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("RPC call {method} timed out after {:?}", self.timeout);
                Err(ChainError::Timeout(method))
            }
        }
    }

    async fn fetch_block(&self, id: BlockId, full: bool) -> Result<Block, ChainError> {
        let method = match id {
            BlockId::Hash(_) => "eth_getBlockByHash",
            BlockId::Number(_) => "eth_getBlockByNumber",
        };
        self.call(method, async {
            let block = match id {
                BlockId::Hash(hash) => {
                    let request = self.provider.get_block_by_hash(hash.block_hash);
                    if full { request.full().await? } else { request.await? }
                }
                BlockId::Number(tag) => {
                    let request = self.provider.get_block_by_number(tag);
                    if full { request.full().await? } else { request.await? }
                }
            };
            block.ok_or_else(|| ChainError::NotFound(format!("block {id:?}")))
        })
        .await
    }
}

fn header_from_block(block: &Block) -> Header {
    Header {
        number: block.header.number,
        hash: block.header.hash,
        parent_hash: block.header.parent_hash,
        timestamp: block.header.timestamp,
    }
}

fn transaction_from(tx: &Transaction) -> ChainTransaction {
    ChainTransaction {
        hash: tx.tx_hash(),
        from: TransactionResponse::from(tx),
        to: TxTrait::to(tx),
        input: TxTrait::input(tx).clone(),
        value: TxTrait::value(tx),
    }
}

fn block_from(block: &Block) -> ChainBlock {
    ChainBlock {
        header: header_from_block(block),
        transactions: block.transactions.txns().map(transaction_from).collect(),
    }
}

fn log_from(log: &Log) -> Result<ChainLog, ChainError> {
    let missing = |field: &str| ChainError::Decode(format!("log without {field}"));
    Ok(ChainLog {
        address: log.address(),
        topics: log.topics().to_vec(),
        data: log.data().data.clone(),
        block_number: log.block_number.ok_or_else(|| missing("block_number"))?,
        block_hash: log.block_hash.ok_or_else(|| missing("block_hash"))?,
        transaction_hash: log.transaction_hash.ok_or_else(|| missing("transaction_hash"))?,
        log_index: log.log_index.ok_or_else(|| missing("log_index"))?,
    })
}

fn receipt_from(receipt: &TransactionReceipt) -> Result<ChainReceipt, ChainError> {
    Ok(ChainReceipt {
        transaction_hash: receipt.transaction_hash,
        status: receipt.status(),
        logs: receipt.inner.logs().iter().map(log_from).collect::<Result<_, _>>()?,
    })
}

fn filter_from(query: &LogQuery) -> Filter {
    let mut filter = match query.scope {
        LogScope::Block(hash) => Filter::new().at_block_hash(hash),
        LogScope::Range { from, to } => Filter::new().from_block(from).to_block(to),
    };
    if let Some(signature) = query.topics[0] {
        filter = filter.event_signature(signature);
    }
    if let Some(topic) = query.topics[1] {
        filter = filter.topic1(topic);
    }
    if let Some(topic) = query.topics[2] {
        filter = filter.topic2(topic);
    }
    filter
}

#[async_trait::async_trait]
impl ChainClient for NodeClient {
    async fn header_by_number(&self, number: Option<u64>) -> Result<Header, ChainError> {
        let tag = number.map(BlockNumberOrTag::Number).unwrap_or(BlockNumberOrTag::Latest);
        let block = self.fetch_block(BlockId::Number(tag), false).await?;
        Ok(header_from_block(&block))
    }

    async fn header_by_hash(&self, hash: BlockHash) -> Result<Header, ChainError> {
        let block = self.fetch_block(BlockId::from(hash), false).await?;
        Ok(header_from_block(&block))
    }

    async fn balance_at(&self, address: Address, number: u64) -> Result<U256, ChainError> {
        self.call("eth_getBalance", async {
            Ok(self.provider.get_balance(address).block_id(BlockId::number(number)).await?)
        })
        .await
    }

    async fn nonce_at(&self, address: Address, number: u64) -> Result<u64, ChainError> {
        self.call("eth_getTransactionCount", async {
            Ok(self
                .provider
                .get_transaction_count(address)
                .block_id(BlockId::number(number))
                .await?)
        })
        .await
    }

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainError> {
        let filter = filter_from(query);
        let logs = self
            .call("eth_getLogs", async { Ok(self.provider.get_logs(&filter).await?) })
            .await?;
        logs.iter()
            // Pending logs carry no block number yet; only confirmed ones are indexed.
            .filter(|log| log.block_number.is_some())
            .map(log_from)
            .collect()
    }

    async fn transaction_by_hash(&self, hash: TxHash) -> Result<ChainTransaction, ChainError> {
        let tx = self
            .call("eth_getTransactionByHash", async {
                Ok(self.provider.get_transaction_by_hash(hash).await?)
            })
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("transaction {hash}")))?;
        Ok(transaction_from(&tx))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<ChainReceipt, ChainError> {
        let receipt = self
            .call("eth_getTransactionReceipt", async {
                Ok(self.provider.get_transaction_receipt(hash).await?)
            })
            .await?
            .ok_or_else(|| ChainError::NotFound(format!("receipt {hash}")))?;
        receipt_from(&receipt)
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<ChainBlock, ChainError> {
        let block = self.fetch_block(BlockId::from(hash), true).await?;
        Ok(block_from(&block))
    }

    async fn block_by_number(&self, number: u64) -> Result<ChainBlock, ChainError> {
        let block = self.fetch_block(BlockId::number(number), true).await?;
        Ok(block_from(&block))
    }

    async fn call_contract(
        &self,
        to: Address,
        data: Bytes,
        number: Option<u64>,
    ) -> Result<Bytes, ChainError> {
        let request = TransactionRequest::default().to(to).input(TransactionInput::new(data));
        let block = number.map(BlockId::number).unwrap_or(BlockId::latest());
        self.call("eth_call", async { Ok(self.provider.call(request).block(block).await?) }).await
    }
}
