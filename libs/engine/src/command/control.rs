use std::sync::Arc;

use alloy::primitives::Address;
use eyre::Result;
use store::SyncOption;
use store::model::Header;
use sync::{FiniteCommand, Group, Interrupted, Runnable};
use tokio_util::sync::CancellationToken;

use crate::command::erc20_historical::Erc20HistoricalCommand;
use crate::command::eth_historical::EthHistoricalCommand;
use crate::command::guard::RunningSet;
use crate::context::SyncContext;
use crate::error::EngineError;
use crate::event::{Event, EventType};

/// Starts native and token history of `address` up to `target` on `group`.
///
/// Fails without starting anything if either history is already running.
pub fn spawn_history(
    group: &Group,
    ctx: &Arc<SyncContext>,
    running: &RunningSet,
    address: Address,
    target: u64,
) -> Result<(), EngineError> {
    let eth_claim = running.claim(address, SyncOption::ETH)?;
    let erc20_claim = running.claim(address, SyncOption::ERC20)?;
    let retry = ctx.args.retry_interval;

    let eth = EthHistoricalCommand::new(ctx.clone(), address, target);
    group.add(move |token| async move {
        let _claim = eth_claim;
        FiniteCommand::new(retry, eth).run(token).await.map(|_| ())
    });
    let erc20 = Erc20HistoricalCommand::new(ctx.clone(), address, target);
    group.add(move |token| async move {
        let _claim = erc20_claim;
        FiniteCommand::new(retry, erc20).run(token).await.map(|_| ())
    });
    Ok(())
}

/// Brings every account's history up to `head - safety_depth`, blocks missed
/// since the last run included. The head follower starts after that target.
pub struct ControlCommand {
    ctx: Arc<SyncContext>,
    running: RunningSet,
    accounts: Vec<Address>,
    live_start: Option<Header>,
}

impl ControlCommand {
    pub fn new(ctx: Arc<SyncContext>, running: RunningSet, accounts: Vec<Address>) -> Self {
        Self { ctx, running, accounts, live_start: None }
    }

    /// Set once a run succeeded.
    pub fn live_start(&self) -> Option<Header> {
        self.live_start
    }
}

#[async_trait::async_trait]
impl Runnable for ControlCommand {
    async fn run(&mut self, token: &CancellationToken) -> Result<()> {
        let head = self.ctx.client.header_by_number(None).await?;
        let target_number = head.number.saturating_sub(self.ctx.args.safety_depth);
        let target = self.ctx.client.header_by_number(Some(target_number)).await?;
        tracing::info!("Syncing history of {} accounts up to {target_number}", self.accounts.len());

        let group = Group::new(token);
        for account in &self.accounts {
            let spawned =
                spawn_history(&group, &self.ctx, &self.running, *account, target_number);
            if let Err(e) = spawned {
                tracing::warn!("Skipping history of {account}: {e}");
            }
        }
        group.wait().await;
        if token.is_cancelled() {
            return Err(Interrupted::Cancelled.into());
        }

        self.ctx.feed.send(Event::new(
            EventType::RecentHistoryReady,
            Some(target_number),
            self.accounts.clone(),
        ));
        self.live_start = Some(target);
        Ok(())
    }
}
