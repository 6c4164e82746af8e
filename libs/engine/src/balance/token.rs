use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, U256};
use chain::ChainClient;
use futures_util::future::join_all;

/// `balanceOf(address)`
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

fn balance_of_call(account: Address) -> Bytes {
    let mut data = Vec::with_capacity(36);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(account.into_word().as_slice());
    data.into()
}

async fn token_balance(
    client: &dyn ChainClient,
    account: Address,
    token: Address,
    number: Option<u64>,
) -> U256 {
    match client.call_contract(token, balance_of_call(account), number).await {
        Ok(output) if output.len() >= 32 => U256::from_be_slice(&output[..32]),
        Ok(output) => {
            let len = output.len();
            tracing::warn!("Token {token} returned {len} bytes for balanceOf({account})");
            U256::ZERO
        }
        Err(e) => {
            // One broken token contract must not fail the whole batch.
            tracing::warn!("Failed to fetch balance of {account} in token {token}: {e}");
            U256::ZERO
        }
    }
}

/// Balances of every `(account, token)` pair, `account -> token -> balance`.
/// A pair whose call fails is reported as zero.
pub async fn get_token_balances(
    client: &dyn ChainClient,
    accounts: &[Address],
    tokens: &[Address],
    number: Option<u64>,
) -> HashMap<Address, HashMap<Address, U256>> {
    let pairs: Vec<(Address, Address)> = accounts
        .iter()
        .flat_map(|account| tokens.iter().map(move |token| (*account, *token)))
        .collect();
    let balances = join_all(
        pairs.iter().map(|(account, token)| token_balance(client, *account, *token, number)),
    )
    .await;

    let mut result: HashMap<Address, HashMap<Address, U256>> = HashMap::new();
    for ((account, token), balance) in pairs.into_iter().zip(balances) {
        result.entry(account).or_default().insert(token, balance);
    }
    result
}
