use clap::command;
use clap::{Parser, Subcommand};

use crate::cli::query::args::Query;

use super::engine::args::Args;

#[derive(Parser, Debug)]
#[command(name = "wallet-indexer")]
#[command(about = "CLI tool for syncing wallet transfers", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the sync reactor
    Engine(Args),
    Select(Query),
}
