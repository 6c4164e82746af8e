use std::time::Duration;

use alloy::primitives::Address;
use chain::rpc::{DEFAULT_RPC_TIMEOUT, polling_period_by_chain};

pub const DEFAULT_SAFETY_DEPTH: u64 = 15;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_BISECT_CONCURRENCY: usize = 16;
pub const DEFAULT_MAX_CONSECUTIVE_ERRORS: u32 = 3;

const BINANCE_CHAIN_ID: u64 = 56;
const GOERLI_CHAIN_ID: u64 = 5;

/// Blocks per `eth_getLogs` range query. Some providers cap the range.
pub fn erc20_batch_size_by_chain(chain_id: u64) -> u64 {
    match chain_id {
        BINANCE_CHAIN_ID => 5_000,
        GOERLI_CHAIN_ID => 100_000,
        _ => 500_000,
    }
}

/// How native-coin history is backfilled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EthBackfill {
    /// Fan the whole range out at once; the cursor moves when the tree completes.
    #[default]
    Concurrent,
    /// One bisection step at a time, checkpointing the cursor after every step.
    Resumable,
}

#[derive(Debug, Clone)]
pub struct Args {
    pub accounts: Vec<Address>,
    pub chain_id: u64,
    pub poll_interval: Duration,
    pub safety_depth: u64,
    pub retry_interval: Duration,
    pub rpc_timeout: Duration,
    pub erc20_batch_size: u64,
    pub bisect_concurrency: usize,
    pub eth_backfill: EthBackfill,
    /// Lowest block historical sync walks down to.
    pub history_floor: u64,
    /// Narrow each account's history to roughly its last 20 transactions.
    pub first_range_heuristic: bool,
    /// Consecutive command failures that raise a `FetchError` event. Zero disables it.
    pub max_consecutive_errors: u32,
}

impl Args {
    pub fn new(accounts: Vec<Address>, chain_id: u64) -> Self {
        Self {
            accounts,
            chain_id,
            poll_interval: polling_period_by_chain(chain_id),
            safety_depth: DEFAULT_SAFETY_DEPTH,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            erc20_batch_size: erc20_batch_size_by_chain(chain_id),
            bisect_concurrency: DEFAULT_BISECT_CONCURRENCY,
            eth_backfill: EthBackfill::default(),
            history_floor: 0,
            first_range_heuristic: false,
            max_consecutive_errors: DEFAULT_MAX_CONSECUTIVE_ERRORS,
        }
    }
}
