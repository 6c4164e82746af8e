use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use alloy::primitives::Address;
use store::SyncOption;

use crate::error::EngineError;

type Keys = Arc<Mutex<HashSet<(Address, SyncOption)>>>;

/// Historical commands currently running, one per `(address, option)`.
#[derive(Clone, Default)]
pub struct RunningSet {
    keys: Keys,
}

/// Ownership of one `(address, option)` cursor. Released on drop.
pub struct Claim {
    keys: Keys,
    key: (Address, SyncOption),
}

impl RunningSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects, rather than queues, a second claim for a running key.
    pub fn claim(&self, address: Address, option: SyncOption) -> Result<Claim, EngineError> {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if !keys.insert((address, option)) {
            return Err(EngineError::AlreadyRunning { address, option });
        }
        Ok(Claim { keys: self.keys.clone(), key: (address, option) })
    }

    pub fn is_running(&self, address: Address, option: SyncOption) -> bool {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).contains(&(address, option))
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).remove(&self.key);
    }
}
