use std::fmt::{Debug, Formatter, Result};

use crate::model::SyncOption;
use crate::{header::model::HeaderRow, utils};

impl Debug for HeaderRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let sync = SyncOption::from_bits(u8::try_from(self.sync).unwrap_or_default());
        f.debug_struct("Header")
            .field("address", &utils::bytes_to_address(&self.address))
            .field("number", &self.number)
            .field("hash", &utils::bytes_to_hex(&self.hash))
            .field("parent_hash", &utils::bytes_to_hex(&self.parent_hash))
            .field("timestamp", &self.timestamp)
            .field("sync", &sync)
            .finish()
    }
}
