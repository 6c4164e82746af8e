use sqlx::FromRow;

/// A `transfers` row joined with the `parent_hash` of its owning block.
#[derive(Clone, FromRow, PartialEq)]
pub struct TransferRow {
    pub address: Vec<u8>,
    pub transfer_type: String,
    pub id: Vec<u8>,
    pub block_number: i64,
    pub block_hash: Vec<u8>,
    pub parent_hash: Vec<u8>,
    pub timestamp: i64,
    pub transaction_hash: Vec<u8>,
    pub log_index: Option<i64>,
    pub signer: Vec<u8>,
    pub from_address: Vec<u8>,
    pub to_address: Option<Vec<u8>>,
    pub contract_address: Option<Vec<u8>>,
    pub amount: Vec<u8>,
    pub receipt_status: bool,
}
