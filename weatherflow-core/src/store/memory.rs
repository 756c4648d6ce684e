use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::BTreeMap;

use super::{BlobStore, ObjectMeta};
use crate::error::StoreError;

#[derive(Debug, Clone)]
struct Entry {
    body: Vec<u8>,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-process store. Nothing survives the process; used as a test double.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an object with an explicit last-modified time.
    pub fn insert_at(
        &self,
        key: impl Into<String>,
        body: impl Into<Vec<u8>>,
        content_type: &str,
        last_modified: DateTime<Utc>,
    ) {
        self.objects.lock().insert(
            key.into(),
            Entry { body: body.into(), content_type: content_type.to_string(), last_modified },
        );
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects.lock().get(key).map(|e| e.content_type.clone())
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        Ok(self
            .objects
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| ObjectMeta { key: key.clone(), last_modified: entry.last_modified })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .lock()
            .get(key)
            .map(|e| e.body.clone())
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.insert_at(key, body, content_type, Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_and_list_by_prefix() {
        let store = MemoryStore::new();
        store.put("raw/a.json", b"[]".to_vec(), "application/json").await.unwrap();
        store.put("transformed/a.csv", b"city".to_vec(), "text/csv").await.unwrap();

        let raw = store.list("raw/").await.unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].key, "raw/a.json");

        assert_eq!(store.get("raw/a.json").await.unwrap(), b"[]");
        assert_eq!(store.content_type("transformed/a.csv").as_deref(), Some("text/csv"));
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let store = MemoryStore::new();
        let err = store.get("raw/nope.json").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(k) if k == "raw/nope.json"));
    }
}
