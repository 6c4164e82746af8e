use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::{Address, B256, BlockHash, Bytes, TxHash, U256, keccak256};
use chain::metrics::{CallCounter, RpcMetrics};
use chain::types::{ChainBlock, ChainLog, ChainReceipt, ChainTransaction, Header, LogQuery};
use chain::{ChainClient, ChainError};
use engine::Args;
use engine::context::SyncContext;
use engine::downloader::erc20::TRANSFER_EVENT_SIGNATURE;
use engine::event::EventFeed;
use store::Persistence;

pub const BASE_BALANCE: u64 = 1_000_000;

pub fn block_hash(number: u64, fork: u8) -> BlockHash {
    let mut bytes = [0u8; 32];
    bytes[0] = fork;
    bytes[24..].copy_from_slice(&number.to_be_bytes());
    B256::from(bytes)
}

struct State {
    /// Canonical chain, indexed by number.
    blocks: Vec<ChainBlock>,
    forks: Vec<u8>,
    receipts: HashMap<TxHash, ChainReceipt>,
    failing_tokens: HashSet<Address>,
    token_balances: HashMap<(Address, Address), U256>,
    nonce: u64,
    /// Blocks above are not produced yet.
    hidden_after: Option<u64>,
}

impl State {
    fn visible(&self) -> &[ChainBlock] {
        let len = match self.hidden_after {
            Some(number) => self.blocks.len().min(number as usize + 1),
            None => self.blocks.len(),
        };
        &self.blocks[..len]
    }
}

/// Scripted chain: blocks, native payments, token logs, balances derived from them.
pub struct FakeChain {
    state: Mutex<State>,
    pub calls: CallCounter,
}

impl FakeChain {
    /// Empty canonical chain `0..=tip` on fork 0.
    pub fn new(tip: u64) -> Arc<Self> {
        let chain = Self {
            state: Mutex::new(State {
                blocks: Vec::new(),
                forks: Vec::new(),
                receipts: HashMap::new(),
                failing_tokens: HashSet::new(),
                token_balances: HashMap::new(),
                nonce: 0,
                hidden_after: None,
            }),
            calls: CallCounter::new(),
        };
        chain.extend(tip + 1, 0);
        Arc::new(chain)
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn tip(&self) -> u64 {
        self.state().visible().len() as u64 - 1
    }

    /// Pretends blocks above `number` were not produced yet.
    pub fn hide_after(&self, number: u64) {
        self.state().hidden_after = Some(number);
    }

    pub fn reveal(&self) {
        self.state().hidden_after = None;
    }

    pub fn header(&self, number: u64) -> Header {
        self.state().blocks[number as usize].header
    }

    /// Appends `count` empty blocks on `fork`.
    pub fn extend(&self, count: u64, fork: u8) {
        let mut state = self.state();
        for _ in 0..count {
            let number = state.blocks.len() as u64;
            let parent_hash = state.blocks.last().map(|b| b.header.hash).unwrap_or_default();
            let header = Header {
                number,
                hash: block_hash(number, fork),
                parent_hash,
                timestamp: 1_700_000_000 + number * 12,
            };
            state.blocks.push(ChainBlock { header, transactions: Vec::new() });
            state.forks.push(fork);
        }
    }

    /// Replaces the last `depth` blocks with empty ones on `fork`.
    pub fn reorg(&self, depth: u64, fork: u8) {
        {
            let mut state = self.state();
            let keep = state.blocks.len() - depth as usize;
            state.blocks.truncate(keep);
            state.forks.truncate(keep);
        }
        self.extend(depth, fork);
    }

    fn push_tx(&self, number: u64, tx: ChainTransaction, logs: Vec<ChainLog>) -> TxHash {
        let mut state = self.state();
        let receipt = ChainReceipt { transaction_hash: tx.hash, status: true, logs };
        state.receipts.insert(tx.hash, receipt);
        state.blocks[number as usize].transactions.push(tx.clone());
        tx.hash
    }

    fn next_tx_hash(&self, number: u64) -> TxHash {
        let mut state = self.state();
        state.nonce += 1;
        let fork = state.forks[number as usize];
        let preimage =
            [&[fork][..], &number.to_be_bytes()[..], &state.nonce.to_be_bytes()[..]].concat();
        keccak256(preimage)
    }

    /// Native payment in block `number`.
    pub fn pay(&self, number: u64, from: Address, to: Address, value: u64) -> TxHash {
        let hash = self.next_tx_hash(number);
        let value = U256::from(value);
        let tx = ChainTransaction { hash, from, to: Some(to), input: Bytes::new(), value };
        self.push_tx(number, tx, Vec::new())
    }

    /// Token `Transfer` log emitted by a call signed by `from`.
    pub fn token_transfer(
        &self,
        number: u64,
        token: Address,
        from: Address,
        to: Address,
        value: u64,
    ) -> TxHash {
        let hash = self.next_tx_hash(number);
        let header = self.header(number);
        let log_index = self.state().blocks[number as usize].transactions.len() as u64;
        let log = ChainLog {
            address: token,
            topics: vec![keccak256(TRANSFER_EVENT_SIGNATURE), from.into_word(), to.into_word()],
            data: Bytes::from(U256::from(value).to_be_bytes::<32>().to_vec()),
            block_number: number,
            block_hash: header.hash,
            transaction_hash: hash,
            log_index,
        };
        let tx = ChainTransaction {
            hash,
            from,
            to: Some(token),
            input: Bytes::from(vec![0xa9, 0x05, 0x9c, 0xbb]),
            value: U256::ZERO,
        };
        self.push_tx(number, tx, vec![log])
    }

    pub fn set_token_balance(&self, account: Address, token: Address, balance: u64) {
        self.state().token_balances.insert((account, token), U256::from(balance));
    }

    pub fn fail_token(&self, token: Address) {
        self.state().failing_tokens.insert(token);
    }

    fn block_at(&self, number: u64) -> Result<ChainBlock, ChainError> {
        self.state()
            .visible()
            .get(number as usize)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("block {number}")))
    }

    fn block_with_hash(&self, hash: BlockHash) -> Result<ChainBlock, ChainError> {
        self.state()
            .visible()
            .iter()
            .find(|block| block.header.hash == hash)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("block {hash}")))
    }
}

#[async_trait::async_trait]
impl ChainClient for FakeChain {
    async fn header_by_number(&self, number: Option<u64>) -> Result<Header, ChainError> {
        self.calls.record("eth_getBlockByNumber");
        let number = number.unwrap_or_else(|| self.tip());
        Ok(self.block_at(number)?.header)
    }

    async fn header_by_hash(&self, hash: BlockHash) -> Result<Header, ChainError> {
        self.calls.record("eth_getBlockByHash");
        Ok(self.block_with_hash(hash)?.header)
    }

    async fn balance_at(&self, address: Address, number: u64) -> Result<U256, ChainError> {
        self.calls.record("eth_getBalance");
        let state = self.state();
        let blocks = state
            .visible()
            .get(..=number as usize)
            .ok_or_else(|| ChainError::NotFound(format!("block {number}")))?;
        let mut balance = U256::from(BASE_BALANCE);
        for tx in blocks.iter().flat_map(|block| &block.transactions) {
            if tx.to == Some(address) {
                balance += tx.value;
            }
            if tx.from == address {
                balance -= tx.value;
            }
        }
        Ok(balance)
    }

    async fn nonce_at(&self, address: Address, number: u64) -> Result<u64, ChainError> {
        self.calls.record("eth_getTransactionCount");
        let state = self.state();
        let blocks = state
            .visible()
            .get(..=number as usize)
            .ok_or_else(|| ChainError::NotFound(format!("block {number}")))?;
        let transactions = blocks.iter().flat_map(|block| &block.transactions);
        Ok(transactions.filter(|tx| tx.from == address).count() as u64)
    }

    async fn filter_logs(&self, query: &LogQuery) -> Result<Vec<ChainLog>, ChainError> {
        self.calls.record("eth_getLogs");
        let state = self.state();
        Ok(state
            .visible()
            .iter()
            .flat_map(|block| &block.transactions)
            .filter_map(|tx| state.receipts.get(&tx.hash))
            .flat_map(|receipt| &receipt.logs)
            .filter(|log| query.matches(log))
            .cloned()
            .collect())
    }

    async fn transaction_by_hash(&self, hash: TxHash) -> Result<ChainTransaction, ChainError> {
        self.calls.record("eth_getTransactionByHash");
        self.state()
            .visible()
            .iter()
            .flat_map(|block| &block.transactions)
            .find(|tx| tx.hash == hash)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("transaction {hash}")))
    }

    async fn transaction_receipt(&self, hash: TxHash) -> Result<ChainReceipt, ChainError> {
        self.calls.record("eth_getTransactionReceipt");
        self.state()
            .receipts
            .get(&hash)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("receipt {hash}")))
    }

    async fn block_by_hash(&self, hash: BlockHash) -> Result<ChainBlock, ChainError> {
        self.calls.record("eth_getBlockByHash");
        self.block_with_hash(hash)
    }

    async fn block_by_number(&self, number: u64) -> Result<ChainBlock, ChainError> {
        self.calls.record("eth_getBlockByNumber");
        self.block_at(number)
    }

    async fn call_contract(
        &self,
        to: Address,
        data: Bytes,
        _number: Option<u64>,
    ) -> Result<Bytes, ChainError> {
        self.calls.record("eth_call");
        let state = self.state();
        if state.failing_tokens.contains(&to) {
            return Err(ChainError::Timeout("eth_call"));
        }
        let account = Address::from_slice(&data[16..36]);
        let balance = state.token_balances.get(&(account, to)).copied().unwrap_or_default();
        Ok(Bytes::from(balance.to_be_bytes::<32>().to_vec()))
    }
}

pub fn context(
    chain: Arc<FakeChain>,
    store: Arc<dyn Persistence>,
    feed: EventFeed,
    args: Args,
) -> Arc<SyncContext> {
    Arc::new(SyncContext::new(chain, store, feed, args))
}

pub fn test_args(accounts: Vec<Address>) -> Args {
    let mut args = Args::new(accounts, 1337);
    args.poll_interval = std::time::Duration::from_millis(10);
    args.retry_interval = std::time::Duration::from_millis(10);
    args.safety_depth = 5;
    args
}
