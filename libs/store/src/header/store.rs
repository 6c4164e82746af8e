use alloy::primitives::{Address, BlockHash};
use sqlx::{Error, SqliteConnection};

use crate::client::Client;
use crate::header::model::HeaderRow;
use crate::model::SyncOption;
use crate::utils::to_sql_int;

#[derive(Clone)]
pub struct Store {
    client: Client,
}

impl Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_earliest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<HeaderRow>, Error> {
        let query = r#"
            SELECT address, number, hash, parent_hash, timestamp, sync
            FROM blocks
            WHERE address = ? AND (sync & ?) = ?
            ORDER BY number ASC
            LIMIT 1
            "#;
        let bits = i64::from(option.bits());
        sqlx::query_as(query)
            .bind(address.as_slice())
            .bind(bits)
            .bind(bits)
            .fetch_optional(self.client.pool())
            .await
    }

    pub async fn get_latest_synced(
        &self,
        address: Address,
        option: SyncOption,
    ) -> Result<Option<HeaderRow>, Error> {
        let query = r#"
            SELECT address, number, hash, parent_hash, timestamp, sync
            FROM blocks
            WHERE address = ? AND (sync & ?) = ?
            ORDER BY number DESC
            LIMIT 1
            "#;
        let bits = i64::from(option.bits());
        sqlx::query_as(query)
            .bind(address.as_slice())
            .bind(bits)
            .bind(bits)
            .fetch_optional(self.client.pool())
            .await
    }

    pub async fn get_header_by_number(&self, number: u64) -> Result<Option<HeaderRow>, Error> {
        let query = r#"
            SELECT address, number, hash, parent_hash, timestamp, sync
            FROM blocks
            WHERE number = ?
            ORDER BY sync DESC
            LIMIT 1
            "#;
        sqlx::query_as(query).bind(to_sql_int(number)).fetch_optional(self.client.pool()).await
    }

    pub async fn header_exists(&self, hash: BlockHash) -> Result<bool, Error> {
        let query = "SELECT COUNT(*) FROM blocks WHERE hash = ?";
        let count: i64 =
            sqlx::query_scalar(query).bind(hash.as_slice()).fetch_one(self.client.pool()).await?;
        Ok(count > 0)
    }

    pub async fn get_headers(&self, address: Address) -> Result<Vec<HeaderRow>, Error> {
        let query = r#"
            SELECT address, number, hash, parent_hash, timestamp, sync
            FROM blocks
            WHERE address = ?
            ORDER BY number ASC
            "#;
        sqlx::query_as(query).bind(address.as_slice()).fetch_all(self.client.pool()).await
    }
}

/// Inserts the header or widens the sync bits of the stored one.
pub async fn upsert_header(conn: &mut SqliteConnection, header: &HeaderRow) -> Result<(), Error> {
    let query = r#"
        INSERT INTO blocks (address, number, hash, parent_hash, timestamp, sync)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT (address, hash) DO UPDATE SET sync = sync | excluded.sync
        "#;
    sqlx::query(query)
        .bind(&header.address)
        .bind(header.number)
        .bind(&header.hash)
        .bind(&header.parent_hash)
        .bind(header.timestamp)
        .bind(header.sync)
        .execute(conn)
        .await?;
    Ok(())
}

/// Deletes the header for every account. Returns the number of rows removed.
pub async fn delete_header(conn: &mut SqliteConnection, hash: BlockHash) -> Result<u64, Error> {
    let result =
        sqlx::query("DELETE FROM blocks WHERE hash = ?").bind(hash.as_slice()).execute(conn).await?;
    Ok(result.rows_affected())
}
