//! Thin client over an S3-compatible object store
//!
//! [`ObjectClient`] is the narrow set of object operations the
//! [`ObjectStorage`](crate::ObjectStorage) backend needs. Production uses
//! [`ObjectStoreClient`] over `object_store`'s AmazonS3; tests use the same
//! client over `InMemory`, optionally wrapped to inject failures.

use crate::traits::ByteReader;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::buffered::BufWriter;
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, ObjectMeta, ObjectStore, ObjectStoreExt,
    PutOptions, PutPayload, Result as ObjectResult,
};
use spurt_core::StorageError;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// One stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

impl From<ObjectMeta> for ObjectInfo {
    fn from(meta: ObjectMeta) -> Self {
        ObjectInfo {
            key: meta.location.to_string(),
            size: meta.size as u64,
            last_modified: meta.last_modified,
        }
    }
}

/// One level of a delimited listing
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    /// Child "folders", as keys without a trailing delimiter
    pub prefixes: Vec<String>,
    pub objects: Vec<ObjectInfo>,
}

#[async_trait]
pub trait ObjectClient: Send + Sync {
    fn bucket(&self) -> &str;

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> ObjectResult<()>;

    /// Stream `reader` into `key` as a multipart upload; returns bytes written.
    async fn put_stream(
        &self,
        key: &str,
        reader: ByteReader,
        content_type: Option<&str>,
    ) -> ObjectResult<u64>;

    async fn get(&self, key: &str) -> ObjectResult<Bytes>;

    async fn exists(&self, key: &str) -> ObjectResult<bool>;

    /// Content type recorded on `key`, if any.
    async fn content_type(&self, key: &str) -> ObjectResult<Option<String>>;

    /// Direct children of `prefix` using `/` as the delimiter.
    async fn list_delimited(&self, prefix: &str) -> ObjectResult<ObjectListing>;

    /// Every object below `prefix`, at any depth.
    async fn list_recursive(&self, prefix: &str) -> ObjectResult<Vec<ObjectInfo>>;

    async fn copy(&self, from: &str, to: &str) -> ObjectResult<()>;

    async fn delete(&self, key: &str) -> ObjectResult<()>;
}

/// [`ObjectClient`] backed by any `object_store` implementation
#[derive(Clone)]
pub struct ObjectStoreClient {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStoreClient {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        ObjectStoreClient {
            store,
            bucket: bucket.into(),
        }
    }

    /// Build an S3 client. Every request carries `x-amz-acl: public-read` so
    /// uploaded objects are publicly readable.
    #[cfg(feature = "storage-s3")]
    pub fn s3(
        credentials: &spurt_core::ObjectStoreCredentials,
    ) -> spurt_core::StorageResult<Self> {
        use http::header::{HeaderMap, HeaderValue};
        use object_store::aws::AmazonS3Builder;
        use object_store::ClientOptions;

        let mut headers = HeaderMap::new();
        headers.insert("x-amz-acl", HeaderValue::from_static("public-read"));

        let mut builder = AmazonS3Builder::new()
            .with_access_key_id(&credentials.access_key_id)
            .with_secret_access_key(&credentials.secret_access_key)
            .with_region(&credentials.region)
            .with_bucket_name(&credentials.bucket)
            .with_client_options(ClientOptions::new().with_default_headers(headers));

        if let Some(ref endpoint) = credentials.endpoint {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::Config(format!("Failed to build S3 client: {}", e)))?;

        Ok(ObjectStoreClient::new(
            Arc::new(store),
            credentials.bucket.clone(),
        ))
    }
}

fn attributes_for(content_type: Option<&str>) -> Attributes {
    let mut attributes = Attributes::new();
    if let Some(content_type) = content_type {
        attributes.insert(
            Attribute::ContentType,
            AttributeValue::from(content_type.to_string()),
        );
    }
    attributes
}

fn parse_key(key: &str) -> ObjectResult<Path> {
    Ok(Path::parse(key)?)
}

fn parse_prefix(prefix: &str) -> ObjectResult<Option<Path>> {
    if prefix.is_empty() {
        Ok(None)
    } else {
        parse_key(prefix).map(Some)
    }
}

fn stream_error(e: std::io::Error) -> ObjectStoreError {
    ObjectStoreError::Generic {
        store: "S3",
        source: Box::new(e),
    }
}

#[async_trait]
impl ObjectClient for ObjectStoreClient {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(&self, key: &str, data: Bytes, content_type: Option<&str>) -> ObjectResult<()> {
        let location = parse_key(key)?;
        let options = PutOptions {
            attributes: attributes_for(content_type),
            ..Default::default()
        };
        self.store
            .put_opts(&location, PutPayload::from(data), options)
            .await?;
        Ok(())
    }

    async fn put_stream(
        &self,
        key: &str,
        mut reader: ByteReader,
        content_type: Option<&str>,
    ) -> ObjectResult<u64> {
        let location = parse_key(key)?;
        let mut writer = BufWriter::new(Arc::clone(&self.store), location)
            .with_attributes(attributes_for(content_type));

        let written = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(abort_err) = writer.abort().await {
                    tracing::warn!(error = %abort_err, key = %key, "Failed to abort multipart upload");
                }
                return Err(stream_error(e));
            }
        };
        writer.shutdown().await.map_err(stream_error)?;
        Ok(written)
    }

    async fn get(&self, key: &str) -> ObjectResult<Bytes> {
        let location = parse_key(key)?;
        self.store.get(&location).await?.bytes().await
    }

    async fn exists(&self, key: &str) -> ObjectResult<bool> {
        let location = parse_key(key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn content_type(&self, key: &str) -> ObjectResult<Option<String>> {
        let location = parse_key(key)?;
        let result = self
            .store
            .get_opts(&location, GetOptions::new().with_head(true))
            .await?;
        Ok(result
            .attributes
            .get(&Attribute::ContentType)
            .map(|value| AsRef::<str>::as_ref(value).to_string()))
    }

    async fn list_delimited(&self, prefix: &str) -> ObjectResult<ObjectListing> {
        let prefix = parse_prefix(prefix)?;
        let result = self.store.list_with_delimiter(prefix.as_ref()).await?;
        Ok(ObjectListing {
            prefixes: result
                .common_prefixes
                .into_iter()
                .map(|p| p.to_string())
                .collect(),
            objects: result.objects.into_iter().map(ObjectInfo::from).collect(),
        })
    }

    async fn list_recursive(&self, prefix: &str) -> ObjectResult<Vec<ObjectInfo>> {
        let prefix = parse_prefix(prefix)?;
        self.store
            .list(prefix.as_ref())
            .map_ok(ObjectInfo::from)
            .try_collect()
            .await
    }

    async fn copy(&self, from: &str, to: &str) -> ObjectResult<()> {
        let from = parse_key(from)?;
        let to = parse_key(to)?;
        self.store.copy(&from, &to).await
    }

    async fn delete(&self, key: &str) -> ObjectResult<()> {
        let location = parse_key(key)?;
        self.store.delete(&location).await
    }
}

/// Normalize an object store failure into a [`StorageError`] carrying the
/// provider's error code.
pub fn classify(operation: &'static str, key: &str, err: ObjectStoreError) -> StorageError {
    let message = err.to_string();
    let code = match &err {
        ObjectStoreError::NotFound { .. } => "NoSuchKey",
        ObjectStoreError::PermissionDenied { .. } => "AccessDenied",
        ObjectStoreError::Unauthenticated { .. } => "Unauthenticated",
        ObjectStoreError::AlreadyExists { .. } => "AlreadyExists",
        ObjectStoreError::Precondition { .. } => "PreconditionFailed",
        ObjectStoreError::NotSupported { .. } | ObjectStoreError::NotImplemented { .. } => {
            "NotImplemented"
        }
        ObjectStoreError::InvalidPath { .. } => {
            return StorageError::validation(format!("invalid object key {}: {}", key, message))
        }
        _ => provider_code(&message).unwrap_or("ProviderError"),
    };

    StorageError::Backend {
        operation,
        key: key.to_string(),
        code: code.to_string(),
        message,
    }
}

const KNOWN_PROVIDER_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "NoSuchBucket",
    "NoSuchKey",
    "SlowDown",
    "RequestTimeout",
    "InternalError",
];

/// Pull an S3 error code out of a provider message, either from an XML
/// `<Code>` element or by name.
fn provider_code(message: &str) -> Option<&'static str> {
    if let Some(start) = message.find("<Code>") {
        let rest = &message[start + "<Code>".len()..];
        if let Some(end) = rest.find("</Code>") {
            let code = &rest[..end];
            if let Some(known) = KNOWN_PROVIDER_CODES.iter().find(|c| **c == code) {
                return Some(*known);
            }
        }
    }
    KNOWN_PROVIDER_CODES
        .iter()
        .find(|code| message.contains(*code))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn client() -> ObjectStoreClient {
        ObjectStoreClient::new(Arc::new(InMemory::new()), "test-bucket")
    }

    #[tokio::test]
    async fn test_put_get_exists_delete() {
        let client = client();
        client
            .put("media/a.png", Bytes::from_static(b"png"), Some("image/png"))
            .await
            .unwrap();

        assert!(client.exists("media/a.png").await.unwrap());
        assert_eq!(client.get("media/a.png").await.unwrap(), Bytes::from_static(b"png"));

        client.delete("media/a.png").await.unwrap();
        assert!(!client.exists("media/a.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_content_type_is_recorded() {
        let client = client();
        client
            .put("media/a.png", Bytes::from_static(b"png"), Some("image/png"))
            .await
            .unwrap();
        client
            .put("media/raw", Bytes::new(), None)
            .await
            .unwrap();

        assert_eq!(
            client.content_type("media/a.png").await.unwrap().as_deref(),
            Some("image/png")
        );
        assert_eq!(client.content_type("media/raw").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_stream_writes_all_bytes() {
        let client = client();
        let payload = vec![7u8; 64 * 1024];
        let reader: ByteReader = Box::pin(std::io::Cursor::new(payload.clone()));

        let written = client.put_stream("media/big.bin", reader, None).await.unwrap();
        assert_eq!(written, payload.len() as u64);
        assert_eq!(client.get("media/big.bin").await.unwrap().len(), payload.len());
    }

    #[tokio::test]
    async fn test_list_delimited_and_recursive() {
        let client = client();
        for key in ["media/a/x.png", "media/a/b/y.png", "media/z.png"] {
            client.put(key, Bytes::from_static(b"1"), None).await.unwrap();
        }

        let listing = client.list_delimited("media").await.unwrap();
        assert_eq!(listing.prefixes, vec!["media/a".to_string()]);
        assert_eq!(listing.objects.len(), 1);
        assert_eq!(listing.objects[0].key, "media/z.png");

        let mut all: Vec<_> = client
            .list_recursive("media/a")
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        all.sort();
        assert_eq!(all, vec!["media/a/b/y.png", "media/a/x.png"]);
    }

    #[tokio::test]
    async fn test_missing_object_classifies_as_no_such_key() {
        let err = client().get("media/missing.png").await.unwrap_err();
        let err = classify("read", "media/missing.png", err);
        assert_eq!(err.backend_code(), Some("NoSuchKey"));
    }

    #[test]
    fn test_provider_code_from_xml_body() {
        let message = "Error performing put: <Error><Code>AccessDenied</Code></Error>";
        assert_eq!(provider_code(message), Some("AccessDenied"));
        assert_eq!(
            provider_code("response: InvalidAccessKeyId for key"),
            Some("InvalidAccessKeyId")
        );
        assert_eq!(provider_code("connection reset"), None);
    }
}
