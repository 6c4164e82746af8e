use serde::{Serialize, ser::SerializeStruct};
use store::{SyncedHeader, Transfer};

// Tuple wrapper for SyncedHeader
pub struct CursorResponse(pub SyncedHeader);

impl Serialize for CursorResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let h = &self.0;
        let mut state = serializer.serialize_struct("Cursor", 5)?;
        state.serialize_field("block_number", &h.header.number)?;
        state.serialize_field("block_hash", &h.header.hash.to_string())?;
        state.serialize_field("parent_hash", &h.header.parent_hash.to_string())?;
        state.serialize_field("timestamp", &h.header.timestamp)?;
        state.serialize_field("sync", &format!("{:?}", h.sync))?;
        state.end()
    }
}

// Tuple wrapper for Transfer
pub struct TransferResponse(pub Transfer);

impl Serialize for TransferResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let t = &self.0;
        let mut state = serializer.serialize_struct("Transfer", 12)?;
        state.serialize_field("type", t.transfer_type.as_str())?;
        state.serialize_field("id", &t.id.to_string())?;
        state.serialize_field("block_number", &t.block.number)?;
        state.serialize_field("block_hash", &t.block.hash.to_string())?;
        state.serialize_field("timestamp", &t.block.timestamp)?;
        state.serialize_field("transaction_hash", &t.transaction_hash.to_string())?;
        state.serialize_field("log_index", &t.log_index)?;
        state.serialize_field("from_address", &t.from.to_string())?;
        state.serialize_field("to_address", &t.to.map(|to| to.to_string()))?;
        state.serialize_field("contract_address", &t.contract.map(|c| c.to_string()))?;
        state.serialize_field("amount", &t.value.to_string())?;
        state.serialize_field("receipt_status", &t.receipt_status)?;
        state.end()
    }
}
