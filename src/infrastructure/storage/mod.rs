//! Remote blob store adapters

mod retry;
mod walrus;

pub use retry::RetryingStore;
pub use walrus::WalrusStore;
