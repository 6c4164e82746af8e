use alloy::primitives::{Address, BlockHash, Bytes, TxHash, U256};
use alloy::transports::{RpcError, TransportErrorKind};

use crate::types::{ChainBlock, ChainLog, ChainReceipt, ChainTransaction, Header, LogQuery};

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rpc call {0} timed out")]
    Timeout(&'static str),
    #[error("rpc error: {0}")]
    Rpc(#[from] RpcError<TransportErrorKind>),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl ChainError {
    /// Requested object does not exist (yet) on the remote chain.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ChainError::NotFound(_))
    }
}

/// Read-only view of a chain. Implementations must be safe to call concurrently.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// `None` requests the current head.
    async fn header_by_number(&self, number: Option<u64>) -> Result<Header, ChainError>;

    async fn header_by_hash(&self, hash: BlockHash) -> Result<Header, ChainError>;

    async fn balance_at(&self, address: Address, number: u64) -> Result<U256, ChainError>;

    async fn nonce_at(&self, address: Address, number: u64) -> Result<u64, ChainError>;

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainError>;

    async fn transaction_by_hash(&self, hash: TxHash) -> Result<ChainTransaction, ChainError>;

    async fn transaction_receipt(&self, hash: TxHash) -> Result<ChainReceipt, ChainError>;

    async fn block_by_hash(&self, hash: BlockHash) -> Result<ChainBlock, ChainError>;

    async fn block_by_number(&self, number: u64) -> Result<ChainBlock, ChainError>;

    async fn call_contract(
        &self,
        to: Address,
        data: Bytes,
        number: Option<u64>,
    ) -> Result<Bytes, ChainError>;
}
