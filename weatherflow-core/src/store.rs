//! Blob store abstraction and its backends.
//!
//! The pipeline only needs three operations: list a prefix with last-modified
//! timestamps, read an object, and write an object.

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{convert::TryFrom, fmt::Debug, sync::Arc};

use crate::{config::StoreConfig, error::StoreError};

pub mod local;
pub mod memory;
pub mod s3;

pub use local::LocalStore;
pub use memory::MemoryStore;
pub use s3::{S3Credentials, S3Options, S3Store};

/// Listing entry for one stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub last_modified: DateTime<Utc>,
}

#[async_trait]
pub trait BlobStore: Send + Sync + Debug {
    /// All objects whose key starts with `prefix`, in no particular order.
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StoreError>;
}

/// Logical folders inside the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Raw,
    Transformed,
}

impl Namespace {
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Raw => "raw/",
            Namespace::Transformed => "transformed/",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Raw => "raw",
            Namespace::Transformed => "transformed",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Namespace {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim_end_matches('/').to_lowercase().as_str() {
            "raw" => Ok(Namespace::Raw),
            "transformed" => Ok(Namespace::Transformed),
            _ => Err(anyhow!(
                "Unknown namespace '{value}'. Supported namespaces: raw, transformed."
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    S3,
    Local,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBackend::S3 => "s3",
            StoreBackend::Local => "local",
        }
    }

    pub const fn all() -> &'static [StoreBackend] {
        &[StoreBackend::S3, StoreBackend::Local]
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for StoreBackend {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "s3" => Ok(StoreBackend::S3),
            "local" => Ok(StoreBackend::Local),
            _ => Err(anyhow!("Unknown store backend '{value}'. Supported backends: s3, local.")),
        }
    }
}

/// Construct the configured store backend.
///
/// The s3 backend takes static keys when both are configured and falls back
/// to the default AWS credential chain when neither is.
pub async fn store_from_config(config: &StoreConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    let store: Arc<dyn BlobStore> = match config.backend {
        StoreBackend::S3 => {
            let bucket = config.bucket.clone().ok_or_else(|| {
                anyhow!(
                    "No bucket configured for the s3 store.\n\
                     Hint: set STORE_BUCKET or run `weatherflow configure`."
                )
            })?;
            let credentials = match (&config.access_key, &config.secret_key) {
                (Some(access_key), Some(secret_key)) => Some(S3Credentials {
                    access_key: access_key.clone(),
                    secret_key: secret_key.clone(),
                    session_token: config.session_token.clone(),
                }),
                (None, None) => {
                    tracing::debug!("no static store keys, using the default credential chain");
                    None
                }
                _ => {
                    return Err(anyhow!(
                        "Incomplete credentials for the s3 store.\n\
                         Hint: set both STORE_ACCESS_KEY and STORE_SECRET_KEY, or neither."
                    ));
                }
            };
            let store = S3Store::connect(S3Options {
                bucket,
                region: config.region.clone(),
                endpoint: config.endpoint.clone(),
                credentials,
            })
            .await;
            Arc::new(store)
        }
        StoreBackend::Local => {
            let root = match (&config.root, &config.bucket) {
                (Some(root), _) => root.clone(),
                (None, Some(bucket)) => bucket.into(),
                (None, None) => {
                    return Err(anyhow!(
                        "No root directory configured for the local store.\n\
                         Hint: set STORE_ROOT (or STORE_BUCKET) to a directory."
                    ));
                }
            };
            Arc::new(LocalStore::new(root))
        }
    };

    tracing::debug!(backend = %config.backend, "blob store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_as_str_roundtrip() {
        for backend in StoreBackend::all() {
            let parsed =
                StoreBackend::try_from(backend.as_str()).expect("roundtrip should succeed");
            assert_eq!(*backend, parsed);
        }
    }

    #[test]
    fn unknown_backend_error() {
        let err = StoreBackend::try_from("ftp").unwrap_err();
        assert!(err.to_string().contains("Unknown store backend"));
    }

    #[test]
    fn namespace_accepts_trailing_slash() {
        assert_eq!(Namespace::try_from("raw/").unwrap(), Namespace::Raw);
        assert_eq!(Namespace::try_from("Transformed").unwrap(), Namespace::Transformed);
        assert!(Namespace::try_from("archive").is_err());
        assert_eq!(Namespace::Transformed.prefix(), "transformed/");
    }

    #[tokio::test]
    async fn s3_store_requires_bucket_and_complete_credentials() {
        let mut cfg = StoreConfig::default();
        let err = store_from_config(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("No bucket configured"));

        cfg.bucket = Some("weather".into());
        cfg.access_key = Some("AKIA".into());
        let err = store_from_config(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("Incomplete credentials"));

        cfg.secret_key = Some("secret".into());
        cfg.session_token = Some("token".into());
        assert!(store_from_config(&cfg).await.is_ok());
    }

    #[tokio::test]
    async fn s3_store_without_keys_uses_default_chain() {
        let cfg = StoreConfig { bucket: Some("weather".into()), ..StoreConfig::default() };
        assert!(store_from_config(&cfg).await.is_ok());
    }

    #[tokio::test]
    async fn local_store_falls_back_to_bucket_as_root() {
        let cfg = StoreConfig {
            backend: StoreBackend::Local,
            bucket: Some("/tmp/weather-bucket".into()),
            ..StoreConfig::default()
        };
        assert!(store_from_config(&cfg).await.is_ok());

        let cfg = StoreConfig { backend: StoreBackend::Local, ..StoreConfig::default() };
        let err = store_from_config(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("No root directory"));
    }
}
