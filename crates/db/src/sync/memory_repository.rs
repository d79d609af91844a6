use std::sync::Mutex;

use async_trait::async_trait;

use crate::sync::models::SyncState;
use crate::sync::repositories::StateRepository;
use bronto_common::error::{BrontoError, BrontoResult};

/// Keeps state for the lifetime of the process only.
#[derive(Debug, Default)]
pub struct MemoryStateRepository {
    state: Mutex<SyncState>,
}

impl MemoryStateRepository {
    pub fn snapshot(&self) -> BrontoResult<SyncState> {
        self.state
            .lock()
            .map(|s| s.clone())
            .map_err(|_| BrontoError::Internal("state lock poisoned".to_owned()))
    }
}

#[async_trait]
impl StateRepository for MemoryStateRepository {
    async fn load(&self) -> BrontoResult<SyncState> {
        self.snapshot()
    }

    async fn persist(&self, state: &SyncState) -> BrontoResult<()> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| BrontoError::Internal("state lock poisoned".to_owned()))?;
        *guard = state.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn persist_then_load() {
        let repo = MemoryStateRepository::default();
        assert_eq!(repo.load().await.unwrap(), SyncState::default());

        let state = SyncState::default().incorporate("inbound_activity", "createdDate", "x");
        repo.persist(&state).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), state);
    }
}
