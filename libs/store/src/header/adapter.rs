use alloy::primitives::{Address, B256};
use eyre::{Result, eyre};
use std::convert::TryFrom;

use crate::header::model::HeaderRow;
use crate::model::{Header, SyncOption, SyncedHeader};
use crate::utils::to_sql_int;

impl HeaderRow {
    pub fn new(address: Address, header: &Header, sync: SyncOption) -> Self {
        Self {
            address: address.to_vec(),
            number: to_sql_int(header.number),
            hash: header.hash.to_vec(),
            parent_hash: header.parent_hash.to_vec(),
            timestamp: to_sql_int(header.timestamp),
            sync: i64::from(sync.bits()),
        }
    }
}

impl TryFrom<&HeaderRow> for Header {
    type Error = eyre::Report;

    fn try_from(row: &HeaderRow) -> Result<Self> {
        Ok(Header {
            number: u64::try_from(row.number)?,
            hash: B256::try_from(&row.hash[..]).map_err(|_| eyre!("malformed block hash"))?,
            parent_hash: B256::try_from(&row.parent_hash[..])
                .map_err(|_| eyre!("malformed parent hash"))?,
            timestamp: u64::try_from(row.timestamp)?,
        })
    }
}

impl TryFrom<&HeaderRow> for SyncedHeader {
    type Error = eyre::Report;

    fn try_from(row: &HeaderRow) -> Result<Self> {
        let sync = u8::try_from(row.sync)?;
        Ok(SyncedHeader { header: Header::try_from(row)?, sync: SyncOption::from_bits(sync) })
    }
}
