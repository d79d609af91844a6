use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bookmarks for every stream, keyed by stream name then bookmark key.
///
/// Serializes as `{"bookmarks": {"inbound_activity": {"createdDate": "..."}}}`.
/// A stored value must always be a safe point to resume from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    #[serde(default)]
    pub bookmarks: BTreeMap<String, BTreeMap<String, String>>,
}

impl SyncState {
    pub fn get_bookmark(&self, stream: &str, key: &str) -> Option<&str> {
        self.bookmarks
            .get(stream)
            .and_then(|b| b.get(key))
            .map(String::as_str)
    }

    /// Returns the state with `stream.key` set to `value`.
    pub fn incorporate(mut self, stream: &str, key: &str, value: impl Into<String>) -> Self {
        self.bookmarks
            .entry(stream.to_owned())
            .or_default()
            .insert(key.to_owned(), value.into());
        self
    }
}
