use async_trait::async_trait;

use crate::sync::models::SyncState;
use bronto_common::error::BrontoResult;

#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Load the last persisted state. A store with nothing saved yields an empty state.
    async fn load(&self) -> BrontoResult<SyncState>;

    /// Durably replace the stored state. Safe to call repeatedly with the same value.
    async fn persist(&self, state: &SyncState) -> BrontoResult<()>;
}

#[async_trait]
impl<T> StateRepository for std::sync::Arc<T>
where
    T: StateRepository + ?Sized,
{
    async fn load(&self) -> BrontoResult<SyncState> {
        (**self).load().await
    }

    async fn persist(&self, state: &SyncState) -> BrontoResult<()> {
        (**self).persist(state).await
    }
}
