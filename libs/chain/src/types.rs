use alloy::primitives::{Address, B256, BlockHash, Bytes, TxHash, U256};

/// Minimal chain-tip descriptor, independent of the full block payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Header {
    pub number: u64,
    pub hash: BlockHash,
    pub parent_hash: BlockHash,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainTransaction {
    pub hash: TxHash,
    /// Recovered signer.
    pub from: Address,
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainBlock {
    pub header: Header,
    pub transactions: Vec<ChainTransaction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub block_hash: BlockHash,
    pub transaction_hash: TxHash,
    pub log_index: u64,
}

impl ChainLog {
    pub fn topic(&self, index: usize) -> Option<&B256> {
        self.topics.get(index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainReceipt {
    pub transaction_hash: TxHash,
    pub status: bool,
    pub logs: Vec<ChainLog>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogScope {
    Block(BlockHash),
    /// Inclusive on both ends.
    Range { from: u64, to: u64 },
}

/// Event-log filter. A `None` topic matches anything at that position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub scope: LogScope,
    pub topics: [Option<B256>; 3],
}

impl LogQuery {
    pub fn matches(&self, log: &ChainLog) -> bool {
        let in_scope = match self.scope {
            LogScope::Block(hash) => log.block_hash == hash,
            LogScope::Range { from, to } => (from..=to).contains(&log.block_number),
        };
        in_scope
            && self.topics.iter().enumerate().all(|(i, wanted)| match wanted {
                None => true,
                Some(topic) => log.topic(i) == Some(topic),
            })
    }
}
