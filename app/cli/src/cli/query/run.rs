use eyre::{Result, eyre};
use store::{Persistence, SqliteStore, SyncOption};

use crate::cli::query::args::Query;
use crate::cli::query::read::{Entity, FromBlock};
use crate::cli::query::response::{CursorResponse, TransferResponse};

pub async fn select(query: &Query) -> Result<()> {
    let store = SqliteStore::init(&query.db_url).await?;

    let from_block_number = match query.from_block {
        FromBlock::Number(block_number) => Ok(block_number),
        FromBlock::Last => match store.get_latest_synced(query.address, SyncOption::LIVE).await? {
            None => Err(eyre!("No live block synced for {}", query.address)),
            Some(header) => Ok(header.number),
        },
    };

    match query.entity {
        Entity::Transfer => {
            let block_number = from_block_number?;
            let transfers = store.get_transfers(query.address, block_number, query.to_block).await?;

            if transfers.is_empty() {
                println!("No Transfers Found")
            } else {
                let response: Vec<TransferResponse> =
                    transfers.into_iter().map(TransferResponse).collect();
                println!("{}", serde_json::to_string_pretty(&response)?);
            }
        }
        Entity::Cursor => {
            let block_number = from_block_number?;
            let to_block = query.to_block.unwrap_or(u64::MAX);
            let response: Vec<CursorResponse> = store
                .get_headers(query.address)
                .await?
                .into_iter()
                .filter(|synced| synced.sync != SyncOption::NONE)
                .filter(|synced| (block_number..=to_block).contains(&synced.header.number))
                .map(CursorResponse)
                .collect();

            if response.is_empty() {
                return Err(eyre!("No Cursor Found"));
            }
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
