use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use alloy::primitives::{Address, B256, BlockHash};
use async_trait::async_trait;
use eyre::{Result, eyre};

use crate::handle::Persistence;
use crate::model::{Header, SyncOption, SyncedHeader, Transfer, TransferType};

#[derive(Default)]
struct Tables {
    headers: HashMap<(Address, BlockHash), SyncedHeader>,
    transfers: HashMap<(Address, TransferType, B256), Transfer>,
}

impl Tables {
    fn upsert_header(&mut self, address: Address, header: &Header, sync: SyncOption) {
        self.headers
            .entry((address, header.hash))
            .and_modify(|stored| stored.sync |= sync)
            .or_insert(SyncedHeader { header: *header, sync });
    }

    fn synced(&self, address: Address, option: SyncOption) -> impl Iterator<Item = &Header> {
        self.headers
            .iter()
            .filter(move |((owner, _), stored)| *owner == address && stored.sync.contains(option))
            .map(|(_, stored)| &stored.header)
    }
}

/// In-process [`Persistence`] with the same commit semantics as the SQLite store.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// `n > 0` fails the n-th next commit.
    fail_in: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `process_transfers` fail without touching any table.
    pub fn fail_next_process(&self) {
        self.fail_process_after(0);
    }

    /// Lets `successes` commits through, then fails the next one.
    pub fn fail_process_after(&self, successes: usize) {
        self.fail_in.store(successes + 1, Ordering::SeqCst);
    }

    pub fn transfer_count(&self) -> usize {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner).transfers.len()
    }
}

#[async_trait]
impl Persistence for MemoryStore {
    async fn get_earliest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<Header>> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.synced(address, option).min_by_key(|header| header.number).copied())
    }

    async fn get_latest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<Header>> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.synced(address, option).max_by_key(|header| header.number).copied())
    }

    async fn get_header_by_number(&self, number: u64) -> Result<Option<Header>> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .headers
            .values()
            .filter(|stored| stored.header.number == number)
            .max_by_key(|stored| stored.sync.bits())
            .map(|stored| stored.header))
    }

    async fn header_exists(&self, hash: BlockHash) -> Result<bool> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.headers.keys().any(|(_, stored)| *stored == hash))
    }

    async fn process_transfers(
        &self,
        transfers: &[Transfer],
        accounts: &[Address],
        added: &[Header],
        removed: &[Header],
        option: SyncOption,
    ) -> Result<()> {
        let countdown =
            self.fail_in.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if countdown == Ok(1) {
            return Err(eyre!("injected persistence failure"));
        }
        let mut tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        for header in removed {
            tables.headers.retain(|(_, hash), _| *hash != header.hash);
            tables.transfers.retain(|_, transfer| transfer.block.hash != header.hash);
        }
        for transfer in transfers {
            tables.upsert_header(transfer.address, &transfer.block, SyncOption::NONE);
            tables.transfers.insert(
                (transfer.address, transfer.transfer_type, transfer.id),
                transfer.clone(),
            );
        }
        for header in added {
            for account in accounts {
                tables.upsert_header(*account, header, option);
            }
        }
        Ok(())
    }

    async fn get_transfers(
        &self,
        address: Address,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<Transfer>> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut transfers: Vec<Transfer> = tables
            .transfers
            .values()
            .filter(|transfer| {
                transfer.address == address
                    && transfer.block.number >= from
                    && to.is_none_or(|to| transfer.block.number <= to)
            })
            .cloned()
            .collect();
        transfers.sort_by_key(|transfer| (transfer.block.number, transfer.log_index));
        Ok(transfers)
    }

    async fn get_headers(&self, address: Address) -> Result<Vec<SyncedHeader>> {
        let tables = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        let mut headers: Vec<SyncedHeader> = tables
            .headers
            .iter()
            .filter(|((owner, _), _)| *owner == address)
            .map(|(_, stored)| *stored)
            .collect();
        headers.sort_by_key(|stored| stored.header.number);
        Ok(headers)
    }
}
