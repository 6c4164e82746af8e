use std::fmt::{Debug, Formatter, Result};

use crate::{transfer::model::TransferRow, utils};

impl Debug for TransferRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        f.debug_struct("Transfer")
            .field("address", &utils::bytes_to_address(&self.address))
            .field("transfer_type", &self.transfer_type)
            .field("id", &utils::bytes_to_hex(&self.id))
            .field("block_number", &self.block_number)
            .field("block_hash", &utils::bytes_to_hex(&self.block_hash))
            .field("transaction_hash", &utils::bytes_to_hex(&self.transaction_hash))
            .field("log_index", &self.log_index)
            .field("from_address", &utils::bytes_to_address(&self.from_address))
            .field("to_address", &utils::optional_address(&self.to_address))
            .field("contract_address", &utils::optional_address(&self.contract_address))
            .field("amount", &utils::bytes_to_u256(&self.amount))
            .field("receipt_status", &self.receipt_status)
            .finish()
    }
}
