use alloy::primitives::{Address, BlockHash};
use sqlx::{Error, SqliteConnection};

use crate::client::Client;
use crate::transfer::model::TransferRow;
use crate::utils::to_sql_int;

#[derive(Clone)]
pub struct Store {
    client: Client,
}

impl Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn get_transfers(
        &self,
        address: Address,
        from_block: u64,
        to_block: Option<u64>,
    ) -> Result<Vec<TransferRow>, Error> {
        let query = r#"
            SELECT
                t.address, t.transfer_type, t.id, t.block_number, t.block_hash,
                b.parent_hash, t.timestamp, t.transaction_hash, t.log_index, t.signer,
                t.from_address, t.to_address, t.contract_address, t.amount, t.receipt_status
            FROM transfers t
            JOIN blocks b ON b.address = t.address AND b.hash = t.block_hash
            WHERE t.address = ? AND t.block_number >= ? AND t.block_number <= ?
            ORDER BY t.block_number ASC, t.log_index ASC
            "#;
        sqlx::query_as(query)
            .bind(address.as_slice())
            .bind(to_sql_int(from_block))
            .bind(to_block.map(to_sql_int).unwrap_or(i64::MAX))
            .fetch_all(self.client.pool())
            .await
    }
}

pub async fn upsert_transfer(
    conn: &mut SqliteConnection,
    transfer: &TransferRow,
) -> Result<(), Error> {
    let query = r#"
        INSERT OR REPLACE INTO transfers (
            address, transfer_type, id, block_number, block_hash, timestamp,
            transaction_hash, log_index, signer, from_address, to_address,
            contract_address, amount, receipt_status
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#;
    sqlx::query(query)
        .bind(&transfer.address)
        .bind(&transfer.transfer_type)
        .bind(&transfer.id)
        .bind(transfer.block_number)
        .bind(&transfer.block_hash)
        .bind(transfer.timestamp)
        .bind(&transfer.transaction_hash)
        .bind(transfer.log_index)
        .bind(&transfer.signer)
        .bind(&transfer.from_address)
        .bind(&transfer.to_address)
        .bind(&transfer.contract_address)
        .bind(&transfer.amount)
        .bind(transfer.receipt_status)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_transfers_in_block(
    conn: &mut SqliteConnection,
    block_hash: BlockHash,
) -> Result<u64, Error> {
    let result = sqlx::query("DELETE FROM transfers WHERE block_hash = ?")
        .bind(block_hash.as_slice())
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
