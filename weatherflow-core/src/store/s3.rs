use async_trait::async_trait;
use aws_sdk_s3::{
    Client,
    config::{
        BehaviorVersion, Credentials, Region, RequestChecksumCalculation, http::HttpResponse,
    },
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
};
use chrono::{DateTime, Utc};

use super::{BlobStore, ObjectMeta};
use crate::error::StoreError;

#[derive(Clone)]
pub struct S3Credentials {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for S3Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Connection settings for [`S3Store::connect`].
#[derive(Debug, Clone)]
pub struct S3Options {
    pub bucket: String,
    pub region: String,
    /// S3-compatible endpoint; requests switch to path-style addressing.
    pub endpoint: Option<String>,
    /// `None` uses the default AWS credential chain.
    pub credentials: Option<S3Credentials>,
}

/// S3 (or S3-compatible) store backed by the AWS SDK client.
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl S3Store {
    pub async fn connect(options: S3Options) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(options.region));
        if let Some(creds) = options.credentials {
            loader = loader.credentials_provider(Credentials::new(
                creds.access_key,
                creds.secret_key,
                creds.session_token,
                None,
                "weatherflow",
            ));
        }
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint.trim_end_matches('/'));
        }
        let sdk_config = loader.load().await;

        let config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(options.endpoint.is_some())
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();

        Self::with_client(Client::from_conf(config), options.bucket)
    }

    pub fn with_client(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Map an SDK failure to a store error, keeping the HTTP status when the
/// service answered.
fn sdk_error<E>(op: &'static str, key: &str, err: SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let Some(status) = err.raw_response().map(|res| res.status().as_u16()) else {
        return StoreError::Sdk(DisplayErrorContext(&err).to_string());
    };
    if status == 404 && op == "get" {
        return StoreError::NotFound(key.to_string());
    }

    let body = match (err.code(), err.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(code), None) => code.to_string(),
        _ => DisplayErrorContext(&err).to_string(),
    };
    StoreError::Status { op, key: key.to_string(), status, body }
}

fn to_chrono(
    key: &str,
    ts: &aws_sdk_s3::primitives::DateTime,
) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(ts.secs(), ts.subsec_nanos())
        .ok_or_else(|| StoreError::Listing(format!("bad LastModified for '{key}'")))
}

#[async_trait]
impl BlobStore for S3Store {
    async fn list(&self, prefix: &str) -> Result<Vec<ObjectMeta>, StoreError> {
        let mut objects = Vec::new();
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| sdk_error("list", prefix, e))?;
            for obj in page.contents() {
                let (Some(key), Some(modified)) = (obj.key(), obj.last_modified()) else {
                    return Err(StoreError::Listing(format!(
                        "entry under '{prefix}' has no key or LastModified"
                    )));
                };
                objects.push(ObjectMeta {
                    key: key.to_string(),
                    last_modified: to_chrono(key, modified)?,
                });
            }
        }

        tracing::debug!(bucket = %self.bucket, %prefix, count = objects.len(), "s3 listing");
        Ok(objects)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("get", key, e))?;

        let body = output.body.collect().await.map_err(|e| StoreError::Sdk(e.to_string()))?;
        Ok(body.into_bytes().to_vec())
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| sdk_error("put", key, e))?;
        Ok(())
    }
}
