use alloy::{
    hex,
    primitives::{Address, U256},
};

pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn bytes_to_address(bytes: &[u8]) -> String {
    match Address::try_from(bytes) {
        Ok(addr) => format!("{addr:?}"),
        Err(_) => format!("<invalid address: {}>", bytes_to_hex(bytes)),
    }
}

pub fn optional_address(bytes: &Option<Vec<u8>>) -> String {
    bytes.as_deref().map(bytes_to_address).unwrap_or_else(|| "None".to_string())
}

pub fn bytes_to_u256(bytes: &[u8]) -> String {
    match U256::try_from_be_slice(bytes) {
        Some(amount) => format!("{amount}"),
        None => format!("<invalid u256: {}>", bytes_to_hex(bytes)),
    }
}

/// SQLite integers are signed; block numbers and timestamps fit comfortably.
pub fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
