use eyre::Result;
use store::Transfer;
use store::model::Header;

/// Transfers touching the watched accounts in one block.
#[async_trait::async_trait]
pub trait TransferDownloader: Send + Sync {
    async fn get_transfers(&self, header: &Header) -> Result<Vec<Transfer>>;
}

/// Transfers touching the watched accounts in an inclusive block range.
#[async_trait::async_trait]
pub trait BatchDownloader: Send + Sync {
    async fn get_transfers_in_range(&self, from: u64, to: u64) -> Result<Vec<Transfer>>;
}
