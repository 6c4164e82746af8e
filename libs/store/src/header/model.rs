use sqlx::FromRow;

#[derive(Clone, FromRow, PartialEq)]
pub struct HeaderRow {
    pub address: Vec<u8>,
    pub number: i64,
    pub hash: Vec<u8>,
    pub parent_hash: Vec<u8>,
    pub timestamp: i64,
    pub sync: i64,
}
