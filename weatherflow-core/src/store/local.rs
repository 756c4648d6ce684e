use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::{BlobStore, ObjectMeta};
use crate::error::StoreError;

/// Directory-backed store: `raw/x.json` lives at `<root>/raw/x.json`.
///
/// Last-modified is the file mtime. Content types are not persisted.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let rel = Path::new(key);
        let valid = !key.is_empty()
            && !key.ends_with('/')
            && rel.components().all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStore for LocalStore {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut objects = Vec::new();
        for entry in WalkDir::new(&self.root).min_depth(1) {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(rel) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let key = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            // In-flight writes from `put`.
            if key.ends_with(".part") || !key.starts_with(prefix) {
                continue;
            }

            let modified = entry.metadata().map_err(std::io::Error::from)?.modified()?;
            objects.push(ObjectMeta { key, last_modified: DateTime::<Utc>::from(modified) });
        }

        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, key: &str, body: Vec<u8>, _content_type: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".part");
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn roundtrip_through_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.put("raw/weather_data_1.json", b"[1]".to_vec(), "application/json").await.unwrap();
        store.put("transformed/t.csv", b"city\n".to_vec(), "text/csv").await.unwrap();

        assert!(dir.path().join("raw").join("weather_data_1.json").exists());
        assert_eq!(store.get("raw/weather_data_1.json").await.unwrap(), b"[1]");

        let listed = store.list("raw/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "raw/weather_data_1.json");
    }

    #[tokio::test]
    async fn missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("not-there"));
        assert!(store.list("raw/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store.get("raw/absent.json").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn escaping_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        for key in ["../outside.json", "/etc/passwd", "", "raw/"] {
            let err = store.put(key, Vec::new(), "text/plain").await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey(_)), "key {key:?} should be rejected");
        }
    }
}
