use alloy::primitives::Address;
use chain::ChainClient;
use eyre::Result;

use crate::balance::cache::BalanceCache;

const GOAL: u64 = 20;
const TOLERANCE: u64 = 5;
const MAX_ITERATIONS: usize = 50;

/// Block from which `account` sent roughly its last 20 transactions before `to`.
///
/// Binary search on the account nonce. Accounts with at most 20 transactions
/// get `0`; otherwise the search stops once `20 <= sent <= 25` or after 50 probes.
pub async fn find_first_range(
    client: &dyn ChainClient,
    cache: &BalanceCache,
    account: Address,
    to: u64,
) -> Result<u64> {
    let first_nonce = cache.nonce_at(client, account, to).await?;
    tracing::info!("Looking for the last {GOAL} transactions of {account} (nonce {first_nonce})");
    if first_nonce <= GOAL {
        return Ok(0);
    }

    let (mut from, mut to) = (0u64, to);
    let mut sent = first_nonce;
    for _ in 0..MAX_ITERATIONS {
        if sent > GOAL {
            from = from + (to - from) / 2;
        } else {
            let diff = (to - from) / 2;
            to = from;
            from = from.saturating_sub(diff);
        }
        let nonce = cache.nonce_at(client, account, from).await?;
        sent = first_nonce.saturating_sub(nonce);
        tracing::debug!("Nonce of {account} at {from} is {nonce}, {sent} sent since");
        if (GOAL..=GOAL + TOLERANCE).contains(&sent) {
            break;
        }
    }

    tracing::info!("History range of {account} starts at {from}");
    Ok(from)
}
