use clap::Parser;
use clap::{arg, command};

use crate::cli::read::CliBackfill;

#[derive(Parser, Debug)]
#[command(about = "Sync wallet transfers and follow the chain head", long_about = None)]
pub struct Args {
    /// Node Provider connection string
    #[arg(short, long)]
    pub rpc_url: String,

    /// SQLite connection string
    #[arg(short, long)]
    pub db_url: String,

    /// Accounts to sync (comma-separated)
    #[arg(short, long)]
    pub addresses: String,

    /// Chain id, read from the node when omitted
    #[arg(long)]
    pub chain_id: Option<u64>,

    /// Blocks below the head considered final
    #[arg(long, default_value_t = engine::args::DEFAULT_SAFETY_DEPTH)]
    pub safety_depth: u64,

    /// Poll interval in milliseconds, defaults to the chain block time
    #[arg(long)]
    pub poll_interval: Option<u64>,

    /// Blocks per token log query, defaults to a chain-specific size
    #[arg(long)]
    pub erc20_batch_size: Option<u64>,

    /// Native history backfill strategy
    #[arg(long, value_enum, default_value = "concurrent")]
    pub eth_backfill: CliBackfill,

    /// Lowest block history sync walks down to
    #[arg(long, default_value_t = 0)]
    pub history_floor: u64,

    /// Only sync roughly the last 20 transactions of each account
    #[arg(long, default_value_t = false)]
    pub first_range_heuristic: bool,

    /// Consecutive failures that raise a fetch error event (0 disables)
    #[arg(long, default_value_t = engine::args::DEFAULT_MAX_CONSECUTIVE_ERRORS)]
    pub max_consecutive_errors: u32,
}
