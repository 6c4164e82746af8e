use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use alloy::primitives::{Address, U256};
use chain::{ChainClient, ChainError};

#[derive(Default)]
struct Entries {
    balances: HashMap<(Address, u64), U256>,
    nonces: HashMap<(Address, u64), u64>,
}

/// Memoized `(address, block) -> balance` and nonce lookups.
///
/// Shared by concurrent bisection tasks behind one mutex. Entries are never
/// evicted; a miss only costs an extra RPC call.
#[derive(Default)]
pub struct BalanceCache {
    entries: Mutex<Entries>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn balance_at(
        &self,
        client: &dyn ChainClient,
        address: Address,
        number: u64,
    ) -> Result<U256, ChainError> {
        if let Some(balance) = self.lock().balances.get(&(address, number)) {
            return Ok(*balance);
        }
        let balance = client.balance_at(address, number).await?;
        self.lock().balances.insert((address, number), balance);
        Ok(balance)
    }

    pub async fn nonce_at(
        &self,
        client: &dyn ChainClient,
        address: Address,
        number: u64,
    ) -> Result<u64, ChainError> {
        if let Some(nonce) = self.lock().nonces.get(&(address, number)) {
            return Ok(*nonce);
        }
        let nonce = client.nonce_at(address, number).await?;
        self.lock().nonces.insert((address, number), nonce);
        Ok(nonce)
    }

    pub fn len(&self) -> usize {
        let entries = self.lock();
        entries.balances.len() + entries.nonces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.balances.clear();
        entries.nonces.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
