use std::sync::Arc;
use std::time::Duration;

use alloy::transports::http::reqwest::Url;
use chain::metrics::CallCounter;
use chain::rpc::{DEFAULT_RPC_TIMEOUT, NodeClient};
use engine::{Args, EventFeed, Reactor};
use eyre::Result;
use store::SqliteStore;

use crate::cli::engine::args::Args as CliArgs;
use crate::cli::read;

/// Maps CLI flags onto engine args. Unset values fall back to chain defaults.
pub fn engine_args(cli: &CliArgs, chain_id: u64) -> Result<Args> {
    let mut args = Args::new(read::parse_addresses(&cli.addresses)?, chain_id);
    args.safety_depth = cli.safety_depth;
    if let Some(poll_interval) = cli.poll_interval {
        args.poll_interval = Duration::from_millis(poll_interval);
    }
    if let Some(batch_size) = cli.erc20_batch_size {
        args.erc20_batch_size = batch_size;
    }
    args.eth_backfill = cli.eth_backfill.clone().into();
    args.history_floor = cli.history_floor;
    args.first_range_heuristic = cli.first_range_heuristic;
    args.max_consecutive_errors = cli.max_consecutive_errors;
    Ok(args)
}

pub async fn start(cli: &CliArgs) -> Result<()> {
    let calls = Arc::new(CallCounter::new());
    let node_client =
        NodeClient::with_metrics(Url::parse(&cli.rpc_url)?, DEFAULT_RPC_TIMEOUT, calls.clone());
    let chain_id = match cli.chain_id {
        Some(chain_id) => chain_id,
        None => node_client.get_chain_id().await?,
    };
    let args = engine_args(cli, chain_id)?;
    let store = SqliteStore::init(&cli.db_url).await?;

    tracing::info!("Starting the reactor {args:?}");
    let reactor = Reactor::new(Arc::new(node_client), Arc::new(store), EventFeed::default(), args);

    let mut events = reactor.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(
                "{:?} at {:?} for {:?}",
                event.event_type,
                event.block_number,
                event.accounts
            );
        }
    });
    reactor.start()?;

    // Wait for user to request shutdown (SIGINT)
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down reactor...");

    reactor.stop().await?;
    tracing::info!("{} RPC calls: {:?}", calls.total(), calls.snapshot());
    Ok(())
}
