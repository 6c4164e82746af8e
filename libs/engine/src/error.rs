use alloy::primitives::{Address, BlockHash};
use chain::ChainError;
use store::SyncOption;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("{option:?} history sync for {address} is already running")]
    AlreadyRunning { address: Address, option: SyncOption },
    #[error("reactor was already started")]
    AlreadyStarted,
    #[error("reactor is not running")]
    ReactorNotRunning,
    #[error("parent block {0} missing on the remote chain while resolving a reorg")]
    MissingParent(BlockHash),
    #[error(transparent)]
    Chain(#[from] ChainError),
}
