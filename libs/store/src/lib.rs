pub mod client;
pub mod handle;
pub mod memory;
pub mod model;
pub mod sqlite;
pub mod utils;
pub mod header {
    pub mod adapter;
    pub mod model;
    pub mod pretty;
    pub mod store;
}
pub mod transfer {
    pub mod adapter;
    pub mod model;
    pub mod pretty;
    pub mod store;
}

pub use handle::Persistence;
pub use memory::MemoryStore;
pub use model::{SyncOption, SyncedHeader, Transfer, TransferType};
pub use sqlite::SqliteStore;
