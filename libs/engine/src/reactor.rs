use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alloy::primitives::Address;
use chain::ChainClient;
use store::Persistence;
use sync::{FiniteCommand, Group, InfiniteCommand};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::args::Args;
use crate::command::control::{ControlCommand, spawn_history};
use crate::command::guard::RunningSet;
use crate::command::new_blocks::NewBlocksCommand;
use crate::context::SyncContext;
use crate::error::EngineError;
use crate::event::{Event, EventFeed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactorState {
    Idle,
    Running,
    Stopped,
}

enum Lifecycle {
    Idle,
    Running(Group),
    Stopped,
}

/// Owns the sync of a set of accounts: history first, then the chain head.
pub struct Reactor {
    ctx: Arc<SyncContext>,
    running: RunningSet,
    root: CancellationToken,
    lifecycle: Mutex<Lifecycle>,
}

impl Reactor {
    pub fn new(
        client: Arc<dyn ChainClient>,
        store: Arc<dyn Persistence>,
        feed: EventFeed,
        args: Args,
    ) -> Self {
        Self {
            ctx: Arc::new(SyncContext::new(client, store, feed, args)),
            running: RunningSet::new(),
            root: CancellationToken::new(),
            lifecycle: Mutex::new(Lifecycle::Idle),
        }
    }

    pub fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.ctx.feed.subscribe()
    }

    pub fn state(&self) -> ReactorState {
        match *self.lifecycle() {
            Lifecycle::Idle => ReactorState::Idle,
            Lifecycle::Running(_) => ReactorState::Running,
            Lifecycle::Stopped => ReactorState::Stopped,
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs the control pass, then follows the chain head until stopped.
    pub fn start(&self) -> Result<(), EngineError> {
        let mut lifecycle = self.lifecycle();
        if !matches!(*lifecycle, Lifecycle::Idle) {
            return Err(EngineError::AlreadyStarted);
        }

        let group = Group::new(&self.root);
        let ctx = self.ctx.clone();
        let running = self.running.clone();
        group.add(move |token| async move {
            let accounts = ctx.args.accounts.clone();
            let control = ControlCommand::new(ctx.clone(), running, accounts.clone());
            let control =
                FiniteCommand::new(ctx.args.retry_interval, control).run(token.clone()).await?;
            let previous = control.live_start();
            tracing::info!("Following chain head after block {:?}", previous.map(|h| h.number));

            let live = NewBlocksCommand::new(ctx.clone(), accounts, previous)
                .with_cancellation(token.clone());
            InfiniteCommand::new(ctx.args.poll_interval, live).run(token).await;
            tracing::info!("Stopped following chain head");
            Ok(())
        });
        *lifecycle = Lifecycle::Running(group);
        tracing::info!("Reactor started for {} accounts", self.ctx.args.accounts.len());
        Ok(())
    }

    /// Cancels every command and waits for in-flight work to exit. Committed work stays.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let group = {
            let mut lifecycle = self.lifecycle();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Running(group) => group,
                other => {
                    *lifecycle = other;
                    return Err(EngineError::ReactorNotRunning);
                }
            }
        };
        group.stop().await;
        tracing::info!("Reactor stopped");
        Ok(())
    }

    /// Backfills `address` while running. The head follower keeps its own account set.
    pub async fn sync_history(&self, address: Address) -> Result<(), EngineError> {
        let group = match &*self.lifecycle() {
            Lifecycle::Running(group) => group.clone(),
            _ => return Err(EngineError::ReactorNotRunning),
        };
        let head = self.ctx.client.header_by_number(None).await?;
        let target = head.number.saturating_sub(self.ctx.args.safety_depth);
        spawn_history(&group, &self.ctx, &self.running, address, target)
    }

    pub fn is_syncing_history(&self, address: Address) -> bool {
        self.running.is_running(address, store::SyncOption::ETH)
            || self.running.is_running(address, store::SyncOption::ERC20)
    }
}
