use alloy::primitives::{Address, B256, U256};
use eyre::{Result, eyre};
use std::convert::TryFrom;

use crate::model::{Header, Transfer};
use crate::transfer::model::TransferRow;
use crate::utils::to_sql_int;

impl From<&Transfer> for TransferRow {
    fn from(transfer: &Transfer) -> Self {
        Self {
            address: transfer.address.to_vec(),
            transfer_type: transfer.transfer_type.as_str().to_string(),
            id: transfer.id.to_vec(),
            block_number: to_sql_int(transfer.block.number),
            block_hash: transfer.block.hash.to_vec(),
            parent_hash: transfer.block.parent_hash.to_vec(),
            timestamp: to_sql_int(transfer.block.timestamp),
            transaction_hash: transfer.transaction_hash.to_vec(),
            log_index: transfer.log_index.map(to_sql_int),
            signer: transfer.signer.to_vec(),
            from_address: transfer.from.to_vec(),
            to_address: transfer.to.map(|to| to.to_vec()),
            contract_address: transfer.contract.map(|contract| contract.to_vec()),
            amount: transfer.value.to_be_bytes::<32>().to_vec(),
            receipt_status: transfer.receipt_status,
        }
    }
}

fn address(bytes: &[u8], field: &str) -> Result<Address> {
    Address::try_from(bytes).map_err(|_| eyre!("malformed {field}"))
}

fn hash(bytes: &[u8], field: &str) -> Result<B256> {
    B256::try_from(bytes).map_err(|_| eyre!("malformed {field}"))
}

impl TryFrom<&TransferRow> for Transfer {
    type Error = eyre::Report;

    fn try_from(row: &TransferRow) -> Result<Self> {
        Ok(Transfer {
            transfer_type: row.transfer_type.parse()?,
            id: hash(&row.id, "id")?,
            address: address(&row.address, "address")?,
            block: Header {
                number: u64::try_from(row.block_number)?,
                hash: hash(&row.block_hash, "block_hash")?,
                parent_hash: hash(&row.parent_hash, "parent_hash")?,
                timestamp: u64::try_from(row.timestamp)?,
            },
            transaction_hash: hash(&row.transaction_hash, "transaction_hash")?,
            log_index: row.log_index.map(u64::try_from).transpose()?,
            signer: address(&row.signer, "signer")?,
            from: address(&row.from_address, "from_address")?,
            to: row.to_address.as_deref().map(|to| address(to, "to_address")).transpose()?,
            contract: row
                .contract_address
                .as_deref()
                .map(|contract| address(contract, "contract_address"))
                .transpose()?,
            value: U256::try_from_be_slice(&row.amount).ok_or_else(|| eyre!("malformed amount"))?,
            receipt_status: row.receipt_status,
        })
    }
}
