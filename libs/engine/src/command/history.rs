use alloy::primitives::Address;
use eyre::Result;
use store::{SyncOption, Transfer};

use crate::command::range::find_first_range;
use crate::context::SyncContext;

/// How a range records its progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Below every synced header. The cursor follows each step down from `to`.
    Backward,
    /// Between the latest synced header and the target. Only `to` is marked, once complete.
    Gap,
}

/// Inclusive block range one historical command still has to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryRange {
    pub from: u64,
    pub to: u64,
    pub fill: Fill,
}

impl HistoryRange {
    pub fn backward(from: u64, to: u64) -> Self {
        Self { from, to, fill: Fill::Backward }
    }

    pub fn gap(from: u64, to: u64) -> Self {
        Self { from, to, fill: Fill::Gap }
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    /// Option stored with the transfers of a step, and with the step cursor if any.
    pub fn step_option(&self, option: SyncOption) -> SyncOption {
        match self.fill {
            Fill::Backward => option,
            Fill::Gap => SyncOption::NONE,
        }
    }
}

/// Ranges `option` history of `address` still misses below `target`, newest first.
///
/// Blocks missed since the latest synced header (live cursors included) come
/// first, then whatever lies between the floor and the earliest synced header.
pub async fn resolve_ranges(
    ctx: &SyncContext,
    address: Address,
    option: SyncOption,
    target: u64,
) -> Result<Vec<HistoryRange>> {
    let earliest = ctx.store.get_earliest_synced(address, option).await?;
    let latest = ctx.store.get_latest_synced(address, option).await?;

    let mut ranges = Vec::new();
    let fresh = earliest.is_none();
    let to = match (earliest, latest) {
        (Some(earliest), Some(latest)) => {
            let gap = HistoryRange::gap(latest.number, target);
            if !gap.is_empty() {
                ranges.push(gap);
            }
            earliest.number.min(target)
        }
        _ => target,
    };

    let floor = ctx.args.history_floor;
    // With the heuristic, history below the first synced range is never extended.
    let from = match ctx.args.first_range_heuristic {
        true if fresh && to > floor => {
            find_first_range(ctx.client.as_ref(), &ctx.cache, address, to).await?.max(floor)
        }
        true => to,
        false => floor,
    };
    let backward = HistoryRange::backward(from.min(to), to);
    if !backward.is_empty() {
        ranges.push(backward);
    }
    tracing::debug!("{option:?} history of {address}: {ranges:?}");
    Ok(ranges)
}

/// Persists `transfers` of `address` and marks the headers at `numbers` with `option`.
pub async fn commit_history(
    ctx: &SyncContext,
    address: Address,
    numbers: &[u64],
    transfers: &[Transfer],
    option: SyncOption,
) -> Result<()> {
    if numbers.is_empty() && transfers.is_empty() {
        return Ok(());
    }
    let mut headers = Vec::with_capacity(numbers.len());
    for number in numbers {
        headers.push(ctx.client.header_by_number(Some(*number)).await?);
    }
    ctx.store.process_transfers(transfers, &[address], &headers, &[], option).await
}
