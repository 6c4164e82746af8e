use alloy::primitives::{Address, BlockHash};
use async_trait::async_trait;
use eyre::{Result, WrapErr};

use crate::client::Client;
use crate::handle::Persistence;
use crate::header::{self, model::HeaderRow};
use crate::model::{Header, SyncOption, SyncedHeader, Transfer};
use crate::transfer::{self, model::TransferRow};

/// [`Persistence`] over SQLite. Every `process_transfers` call is one database transaction.
#[derive(Clone)]
pub struct SqliteStore {
    client: Client,
    headers: header::store::Store,
    transfers: transfer::store::Store,
}

impl SqliteStore {
    pub fn new(client: Client) -> Self {
        Self {
            headers: header::store::Store::new(client.clone()),
            transfers: transfer::store::Store::new(client.clone()),
            client,
        }
    }

    pub async fn init(database_url: &str) -> Result<Self> {
        let client = Client::init(database_url).await?;
        Ok(Self::new(client))
    }
}

fn to_header(row: Option<HeaderRow>) -> Result<Option<Header>> {
    row.as_ref().map(Header::try_from).transpose()
}

#[async_trait]
impl Persistence for SqliteStore {
    async fn get_earliest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<Header>> {
        to_header(self.headers.get_earliest_synced(address, option).await?)
    }

    async fn get_latest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<Header>> {
        to_header(self.headers.get_latest_synced(address, option).await?)
    }

    async fn get_header_by_number(&self, number: u64) -> Result<Option<Header>> {
        to_header(self.headers.get_header_by_number(number).await?)
    }

    async fn header_exists(&self, hash: BlockHash) -> Result<bool> {
        Ok(self.headers.header_exists(hash).await?)
    }

    async fn process_transfers(
        &self,
        transfers: &[Transfer],
        accounts: &[Address],
        added: &[Header],
        removed: &[Header],
        option: SyncOption,
    ) -> Result<()> {
        // Dropping the transaction on any early return rolls it back.
        let mut tx = self.client.pool().begin().await?;

        for header in removed {
            let blocks = header::store::delete_header(&mut tx, header.hash).await?;
            let deleted = transfer::store::delete_transfers_in_block(&mut tx, header.hash).await?;
            tracing::debug!(
                "Removed block {} ({blocks} rows, {deleted} transfers)",
                header.number
            );
        }

        for transfer in transfers {
            let owner = HeaderRow::new(transfer.address, &transfer.block, SyncOption::NONE);
            header::store::upsert_header(&mut tx, &owner).await?;
            transfer::store::upsert_transfer(&mut tx, &TransferRow::from(transfer)).await?;
        }

        for header in added {
            for account in accounts {
                let row = HeaderRow::new(*account, header, option);
                header::store::upsert_header(&mut tx, &row).await?;
            }
        }

        tx.commit().await.wrap_err("commit transfers")?;
        Ok(())
    }

    async fn get_transfers(
        &self,
        address: Address,
        from: u64,
        to: Option<u64>,
    ) -> Result<Vec<Transfer>> {
        let rows = self.transfers.get_transfers(address, from, to).await?;
        rows.iter().map(Transfer::try_from).collect()
    }

    async fn get_headers(&self, address: Address) -> Result<Vec<SyncedHeader>> {
        let rows = self.headers.get_headers(address).await?;
        rows.iter().map(SyncedHeader::try_from).collect()
    }
}
