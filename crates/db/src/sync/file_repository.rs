use std::path::PathBuf;

use async_trait::async_trait;

use crate::sync::models::SyncState;
use crate::sync::repositories::StateRepository;
use bronto_common::error::BrontoResult;

/// Stores state as a JSON document on local disk.
///
/// Writes go to a sibling temp file which is then renamed over the target, so a
/// crash mid-write leaves the previous bookmark intact.
#[derive(Debug, Clone)]
pub struct FileStateRepository {
    path: PathBuf,
}

impl FileStateRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl StateRepository for FileStateRepository {
    async fn load(&self) -> BrontoResult<SyncState> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(SyncState::default()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no state file, starting fresh");
                Ok(SyncState::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, state: &SyncState) -> BrontoResult<()> {
        let body = serde_json::to_vec_pretty(state)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileStateRepository::new(dir.path().join("state.json"));
        let state = repo.load().await.expect("load");
        assert_eq!(state, SyncState::default());
    }

    #[tokio::test]
    async fn persist_round_trips_bookmarks() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileStateRepository::new(dir.path().join("state.json"));

        let state = SyncState::default().incorporate(
            "inbound_activity",
            "createdDate",
            "2026-10-01T05:00:00+00:00",
        );
        repo.persist(&state).await.expect("persist");

        let loaded = repo.load().await.expect("load");
        assert_eq!(loaded, state);
        assert!(!repo.tmp_path().exists(), "temp file should be renamed away");
    }

    #[tokio::test]
    async fn persist_overwrites_previous_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileStateRepository::new(dir.path().join("state.json"));

        let first = SyncState::default().incorporate("inbound_activity", "createdDate", "a");
        let second = first.clone().incorporate("inbound_activity", "createdDate", "b");
        repo.persist(&first).await.expect("persist first");
        repo.persist(&second).await.expect("persist second");

        let loaded = repo.load().await.expect("load");
        assert_eq!(loaded.get_bookmark("inbound_activity", "createdDate"), Some("b"));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{\"bookmarks\": ").expect("write");

        let repo = FileStateRepository::new(path);
        assert!(repo.load().await.is_err());
    }

    #[tokio::test]
    async fn empty_file_loads_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "\n").expect("write");

        let repo = FileStateRepository::new(path);
        assert_eq!(repo.load().await.expect("load"), SyncState::default());
    }
}
