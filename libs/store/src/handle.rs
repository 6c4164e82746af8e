use alloy::primitives::{Address, BlockHash};
use async_trait::async_trait;
use eyre::Result;

use crate::model::{Header, SyncOption, SyncedHeader, Transfer};

/// Storage boundary of the sync engine.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn get_earliest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<Header>>;

    async fn get_latest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<Header>>;

    /// Any stored header at `number`, regardless of the account it was stored for.
    async fn get_header_by_number(&self, number: u64) -> Result<Option<Header>>;

    async fn header_exists(&self, hash: BlockHash) -> Result<bool>;

    /// Single all-or-nothing commit point.
    ///
    /// Deletes `removed` headers (for every account) together with their
    /// transfers, stores every transfer along with its owning header, and
    /// marks each `added` header as synced with `option` for each of `accounts`.
    async fn process_transfers(
        &self,
        transfers: &[Transfer],
        accounts: &[Address],
        added: &[Header],
        removed: &[Header],
        option: SyncOption,
    ) -> Result<()>;

    /// Transfers of `address` in `[from, to]`, oldest first. `to = None` means no upper bound.
    async fn get_transfers(
        &self,
        address: Address,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<Transfer>>;

    async fn get_headers(&self, address: Address) -> Result<Vec<SyncedHeader>>;
}
