pub mod args;
pub mod context;
pub mod error;
pub mod event;
pub mod reactor;
pub mod balance {
    pub mod cache;
    pub mod token;
}
pub mod command {
    pub mod control;
    pub mod erc20_historical;
    pub mod eth_historical;
    pub mod guard;
    pub mod history;
    pub mod new_blocks;
    pub mod range;
}
pub mod downloader {
    pub mod bisect;
    pub mod erc20;
    pub mod eth;
    pub mod handle;
    pub mod iterative;
}

pub use args::{Args, EthBackfill};
pub use error::EngineError;
pub use event::{Event, EventFeed, EventType};
pub use reactor::{Reactor, ReactorState};
