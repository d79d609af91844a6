use async_trait::async_trait;
use bronto_common::error::BrontoError;

use crate::bronto::client::BrontoClientError;

#[derive(Debug)]
pub struct SyncResult {
    pub source: String,
    pub records: usize,
    pub windows: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Client(#[from] BrontoClientError),

    #[error(transparent)]
    State(#[from] BrontoError),

    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),

    #[error("invalid start date: {0:?}")]
    InvalidStartDate(String),
}

#[async_trait]
pub trait Connector: Send + Sync {
    fn source_name(&self) -> &str;
    async fn sync(&self) -> Result<SyncResult, SyncError>;
}
