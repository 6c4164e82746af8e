use alloy::primitives::Address;
use clap::Parser;

use crate::cli::query::read::{Entity, FromBlock};

#[derive(Parser, Debug)]
#[command(about = "Select synced results", long_about = None)]
pub struct Query {
    /// SQLite connection string
    #[arg(short, long)]
    pub db_url: String,

    /// Account to read
    #[arg(short, long)]
    pub address: Address,

    /// Entity to query
    #[arg(short, long, value_enum)]
    pub entity: Entity,

    /// From block number, or `last`
    #[arg(long, default_value = "0")]
    pub from_block: FromBlock,

    /// To block number (inclusive)
    #[arg(long)]
    pub to_block: Option<u64>,
}
