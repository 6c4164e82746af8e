use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use alloy::primitives::Address;
use eyre::Result;
use store::{SyncOption, Transfer};
use sync::{Interrupted, Runnable};
use tokio_util::sync::CancellationToken;

use crate::command::history::{Fill, HistoryRange, commit_history, resolve_ranges};
use crate::context::SyncContext;
use crate::downloader::erc20::Erc20TransfersDownloader;
use crate::downloader::iterative::IterativeDownloader;
use crate::event::{Event, EventType};

/// Token history of one account, in fixed-size log range batches.
pub struct Erc20HistoricalCommand {
    ctx: Arc<SyncContext>,
    address: Address,
    target: u64,
    ranges: Option<VecDeque<HistoryRange>>,
    iterator: Option<IterativeDownloader>,
}

impl Erc20HistoricalCommand {
    pub fn new(ctx: Arc<SyncContext>, address: Address, target: u64) -> Self {
        Self { ctx, address, target, ranges: None, iterator: None }
    }

    async fn setup(
        &self,
        token: &CancellationToken,
        range: HistoryRange,
    ) -> Result<IterativeDownloader> {
        if range.fill == Fill::Backward {
            self.commit(&[range.to], &[], SyncOption::ERC20).await?;
        }
        let client = self.ctx.client.clone();
        let downloader = Erc20TransfersDownloader::new(client, vec![self.address])
            .with_cancellation(token.clone());
        Ok(IterativeDownloader::new(
            Arc::new(downloader),
            self.ctx.args.erc20_batch_size,
            range.from,
            range.to,
        ))
    }

    async fn drain(
        &self,
        token: &CancellationToken,
        range: HistoryRange,
        iterator: &mut IterativeDownloader,
    ) -> Result<()> {
        while !iterator.finished() {
            if token.is_cancelled() {
                return Err(Interrupted::Cancelled.into());
            }
            let batch = iterator.next().await?;
            // Gap batches leave the cursor alone until the whole gap is stored.
            let cursor = match range.fill {
                Fill::Backward => vec![batch.from],
                Fill::Gap => Vec::new(),
            };
            let option = range.step_option(SyncOption::ERC20);
            if let Err(e) = self.commit(&cursor, &batch.transfers, option).await {
                iterator.revert();
                let (from, to) = (batch.from, batch.to);
                tracing::error!("Failed to persist token batch [{from}, {to}]: {e:?}");
                return Err(e);
            }
            if !batch.transfers.is_empty() {
                let event =
                    Event::new(EventType::NewHistory, Some(batch.from), vec![self.address]);
                self.ctx.feed.send(event);
            }
        }
        Ok(())
    }

    async fn commit(
        &self,
        numbers: &[u64],
        transfers: &[Transfer],
        option: SyncOption,
    ) -> Result<()> {
        commit_history(&self.ctx, self.address, numbers, transfers, option).await
    }

    async fn run_range(&mut self, token: &CancellationToken, range: HistoryRange) -> Result<()> {
        let started = Instant::now();
        let mut iterator = match self.iterator.take() {
            Some(iterator) => iterator,
            None => self.setup(token, range).await?,
        };
        let result = self.drain(token, range, &mut iterator).await;
        let cursor = iterator.cursor();
        self.iterator = Some(iterator);
        result?;
        if range.fill == Fill::Gap {
            self.commit(&[range.to], &[], SyncOption::ERC20).await?;
        }
        tracing::info!(
            "Token history of {} in {range:?} done down to {cursor} in {:?}",
            self.address,
            started.elapsed()
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl Runnable for Erc20HistoricalCommand {
    async fn run(&mut self, token: &CancellationToken) -> Result<()> {
        if self.ranges.is_none() {
            let ranges =
                resolve_ranges(&self.ctx, self.address, SyncOption::ERC20, self.target).await?;
            self.ranges = Some(ranges.into());
        }
        while let Some(range) = self.ranges.as_ref().and_then(|ranges| ranges.front().copied()) {
            self.run_range(token, range).await?;
            self.iterator = None;
            if let Some(ranges) = self.ranges.as_mut() {
                ranges.pop_front();
            }
        }
        Ok(())
    }

    fn on_failure(&mut self, _error: &eyre::Report, consecutive: u32) {
        self.ctx.report_failure(consecutive, Some(self.target), &[self.address]);
    }
}
