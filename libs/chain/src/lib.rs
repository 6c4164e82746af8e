pub mod client;
pub mod metrics;
pub mod rpc;
pub mod types;

pub use client::{ChainClient, ChainError};
pub use types::Header;
