use crate::codec;
use crate::keys;
use crate::object_client::{classify, ObjectClient};
use crate::references::clear_references;
use crate::traits::{ByteReader, MediaStorage};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use spurt_core::constants::LIST_PAGE_SIZE;
use spurt_core::{
    DeleteOutcome, FolderListing, ImageReferenceStore, ListPage, MediaEntry, NoOpImageReferences,
    ObjectStoreCredentials, StorageError, StorageKind, StorageResult, UploadResult,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

/// S3-compatible object store backend
///
/// Folders are emulated: a folder is either a common key prefix or a
/// zero-length marker object at the folder's key, tagged with
/// [`keys::FOLDER_CONTENT_TYPE`]. Other zero-length objects are files.
#[derive(Clone)]
pub struct ObjectStorage {
    client: Arc<dyn ObjectClient>,
    references: Arc<dyn ImageReferenceStore>,
    tenant_id: Option<i64>,
}

enum Listed {
    Folder(Option<DateTime<Utc>>),
    File(DateTime<Utc>),
}

impl ObjectStorage {
    pub fn new(client: Arc<dyn ObjectClient>) -> Self {
        ObjectStorage {
            client,
            references: Arc::new(NoOpImageReferences),
            tenant_id: None,
        }
    }

    /// Build an S3 backend from credentials. All four credential fields must
    /// be set.
    #[cfg(feature = "storage-s3")]
    pub fn from_credentials(credentials: &ObjectStoreCredentials) -> StorageResult<Self> {
        Self::check_credentials(credentials)?;
        let client = crate::object_client::ObjectStoreClient::s3(credentials)?;
        Ok(ObjectStorage::new(Arc::new(client)))
    }

    #[cfg(not(feature = "storage-s3"))]
    pub fn from_credentials(credentials: &ObjectStoreCredentials) -> StorageResult<Self> {
        Self::check_credentials(credentials)?;
        Err(StorageError::Config(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        ))
    }

    fn check_credentials(credentials: &ObjectStoreCredentials) -> StorageResult<()> {
        let missing = credentials.missing_keys();
        if missing.is_empty() {
            return Ok(());
        }
        Err(StorageError::Config(format!(
            "AWS S3 configuration is incomplete. Please set the following environment variables: {}",
            missing.join(", ")
        )))
    }

    /// Attach the record store consulted before deletes.
    pub fn with_references(
        mut self,
        references: Arc<dyn ImageReferenceStore>,
        tenant_id: Option<i64>,
    ) -> Self {
        self.references = references;
        self.tenant_id = tenant_id;
        self
    }

    pub fn bucket(&self) -> &str {
        self.client.bucket()
    }

    /// One page (at most 50 entries) of the direct children of `prefix`.
    ///
    /// Entries are ordered by key. `token` is the `next_token` of the previous
    /// page; `None` starts from the beginning. Each page lists the whole level
    /// and skips to the token, so walking N entries costs N/50 full listings.
    pub async fn list_prefix(&self, prefix: &str, token: Option<&str>) -> StorageResult<ListPage> {
        let parent_path = keys::normalize(prefix)?;
        let folder_key = keys::media_key(&parent_path);
        let start = Instant::now();

        if let Some(token) = token {
            if !token.starts_with(&format!("{}/", folder_key)) {
                return Err(StorageError::validation(format!(
                    "continuation token does not belong to {}",
                    prefix
                )));
            }
        }

        let listing = self
            .client
            .list_delimited(&folder_key)
            .await
            .map_err(|e| classify("list_prefix", &folder_key, e))?;

        let mut items: BTreeMap<String, Listed> = BTreeMap::new();
        for prefix in listing.prefixes {
            items.insert(prefix, Listed::Folder(None));
        }
        for object in listing.objects {
            if object.key == folder_key {
                continue;
            }
            let is_marker = object.size == 0
                && (items.contains_key(&object.key) || self.is_folder_marker(&object.key).await?);
            if is_marker {
                items.insert(object.key, Listed::Folder(Some(object.last_modified)));
            } else {
                items
                    .entry(object.key)
                    .or_insert(Listed::File(object.last_modified));
            }
        }

        let mut remaining = items
            .into_iter()
            .filter(|(key, _)| token.map_or(true, |token| key.as_str() > token))
            .peekable();

        let mut page = ListPage::default();
        let mut last_key = None;
        while page.folders.len() + page.files.len() < LIST_PAGE_SIZE {
            let Some((key, item)) = remaining.next() else {
                break;
            };
            let name = keys::split(&key).1.to_string();
            match item {
                Listed::Folder(last_modified) => {
                    let child_count = self.count_children(&key).await;
                    page.folders.push(MediaEntry::folder(
                        name,
                        parent_path.clone(),
                        last_modified.unwrap_or_default(),
                        child_count,
                    ));
                }
                Listed::File(last_modified) => {
                    page.files
                        .push(MediaEntry::file(name, parent_path.clone(), last_modified));
                }
            }
            last_key = Some(key);
        }
        if remaining.peek().is_some() {
            page.next_token = last_key;
        }

        tracing::debug!(
            bucket = %self.bucket(),
            prefix = %folder_key,
            folders = page.folders.len(),
            files = page.files.len(),
            has_more = page.next_token.is_some(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 list successful"
        );
        Ok(page)
    }

    async fn is_folder_marker(&self, key: &str) -> StorageResult<bool> {
        let content_type = self
            .client
            .content_type(key)
            .await
            .map_err(|e| classify("list_prefix", key, e))?;
        Ok(content_type.as_deref() == Some(keys::FOLDER_CONTENT_TYPE))
    }

    async fn count_children(&self, folder_key: &str) -> usize {
        match self.client.list_delimited(folder_key).await {
            Ok(listing) => {
                listing.prefixes.len()
                    + listing
                        .objects
                        .iter()
                        .filter(|o| o.key != folder_key)
                        .count()
            }
            Err(e) => {
                tracing::warn!(error = %e, prefix = %folder_key, "Failed to count folder children");
                0
            }
        }
    }

    /// Create a folder by writing a zero-length marker object; returns the
    /// folder path with a trailing slash.
    pub async fn create_folder_marker(&self, prefix: &str, name: &str) -> StorageResult<String> {
        keys::validate_name(name, "folder")?;
        let folder = keys::join(&keys::normalize(prefix)?, name);
        let key = keys::media_key(&folder);

        self.client
            .put(&key, Bytes::new(), Some(keys::FOLDER_CONTENT_TYPE))
            .await
            .map_err(|e| classify("create_folder", &key, e))?;

        tracing::info!(bucket = %self.bucket(), key = %key, "S3 folder marker created");
        Ok(format!("{}/", folder))
    }

    /// Upload `data` to a media-relative path.
    pub async fn upload(
        &self,
        path: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        let relative = keys::normalize(path)?;
        let (_, name) = keys::split(&relative);
        keys::validate_name(name, "file")?;
        let canonical_name = name.to_string();

        let key = keys::media_key(&relative);
        let size = data.len();
        let start = Instant::now();

        self.client
            .put(&key, Bytes::from(data), content_type)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket(),
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                classify("upload", &key, e)
            })?;

        tracing::info!(
            bucket = %self.bucket(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(UploadResult {
            canonical_name,
            stored_path: key,
        })
    }

    /// Stream an uploaded file into `directory`, sanitizing its name.
    pub async fn upload_file_stream(
        &self,
        directory: &str,
        filename: &str,
        reader: ByteReader,
        content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        let sanitized = keys::sanitize_filename(filename)?;
        let key = keys::media_key(&keys::join(
            &keys::normalize(directory)?,
            &sanitized.file_name,
        ));
        let start = Instant::now();

        let size = self
            .client
            .put_stream(&key, reader, content_type)
            .await
            .map_err(|e| classify("upload", &key, e))?;

        tracing::info!(
            bucket = %self.bucket(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 stream upload successful"
        );

        Ok(UploadResult {
            canonical_name: sanitized.file_name,
            stored_path: key,
        })
    }

    /// Decode a data URI and upload it to `directory/name`.
    pub async fn store_base64(
        &self,
        data_uri: &str,
        directory: &str,
        name: &str,
    ) -> StorageResult<UploadResult> {
        let asset = codec::decode(data_uri, directory, name)?;
        let path = asset.target_path();
        self.upload(&path, asset.bytes, keys::content_type_for(name))
            .await
    }

    /// Fetch an object and return it as standard base64.
    pub async fn get_object_as_base64(&self, path: &str) -> StorageResult<String> {
        let bytes = self.read(path).await?;
        Ok(codec::encode(&bytes))
    }

    pub async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let key = keys::media_key(&keys::normalize(path)?);
        let bytes = self
            .client
            .get(&key)
            .await
            .map_err(|e| classify("read", &key, e))?;
        Ok(bytes.to_vec())
    }

    /// Move every object under `old` (and its marker) to `new`.
    ///
    /// All copies happen before any delete. When a copy fails the first error
    /// is returned, objects already copied stay at the destination and the
    /// source is left untouched.
    pub async fn rename(&self, old: &str, new: &str) -> StorageResult<()> {
        let old_rel = keys::normalize(old)?;
        let new_rel = keys::normalize(new)?;
        if old_rel.is_empty() || new_rel.is_empty() {
            return Err(StorageError::validation("cannot rename the media root"));
        }
        if old_rel == new_rel {
            return Ok(());
        }

        let old_key = keys::media_key(&old_rel);
        let new_key = keys::media_key(&new_rel);
        let start = Instant::now();

        let mut plan = Vec::new();
        if self
            .client
            .exists(&old_key)
            .await
            .map_err(|e| classify("rename", &old_key, e))?
        {
            plan.push((old_key.clone(), new_key.clone()));
        }
        let children = self
            .client
            .list_recursive(&old_key)
            .await
            .map_err(|e| classify("rename", &old_key, e))?;
        for child in children {
            if let Some(suffix) = child.key.strip_prefix(&old_key) {
                if suffix.starts_with('/') {
                    plan.push((child.key.clone(), format!("{}{}", new_key, suffix)));
                }
            }
        }

        if plan.is_empty() {
            return Err(StorageError::Backend {
                operation: "rename",
                key: old_key,
                code: "NoSuchKey".to_string(),
                message: "nothing to rename".to_string(),
            });
        }

        for (index, (from, to)) in plan.iter().enumerate() {
            self.client.copy(from, to).await.map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket(),
                    from_key = %from,
                    to_key = %to,
                    copied = index,
                    total = plan.len(),
                    "S3 rename copy failed, source left in place"
                );
                classify("rename", from, e)
            })?;
        }

        for (from, _) in &plan {
            self.client
                .delete(from)
                .await
                .map_err(|e| classify("rename", from, e))?;
        }

        tracing::info!(
            bucket = %self.bucket(),
            from_key = %old_key,
            to_key = %new_key,
            objects = plan.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 rename successful"
        );
        Ok(())
    }

    /// Delete every object under `path`, then the key at `path` itself. Stops
    /// at the first failed delete.
    pub async fn delete_recursive(&self, path: &str) -> StorageResult<()> {
        let relative = keys::normalize(path)?;
        if relative.is_empty() {
            return Err(StorageError::validation("refusing to delete the media root"));
        }
        let key = keys::media_key(&relative);
        let start = Instant::now();

        let children = self
            .client
            .list_recursive(&key)
            .await
            .map_err(|e| classify("delete", &key, e))?;
        let mut deleted = 0;
        for child in children.iter().filter(|c| c.key != key) {
            self.client
                .delete(&child.key)
                .await
                .map_err(|e| classify("delete", &child.key, e))?;
            deleted += 1;
        }
        self.client
            .delete(&key)
            .await
            .map_err(|e| classify("delete", &key, e))?;

        tracing::info!(
            bucket = %self.bucket(),
            key = %key,
            objects = deleted,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );
        Ok(())
    }

    pub async fn delete(&self, path: &str, name: &str) -> StorageResult<DeleteOutcome> {
        let target = keys::join(&keys::normalize(path)?, name);
        let relative = keys::normalize(&target)?;
        if relative.is_empty() {
            return Err(StorageError::validation("refusing to delete the media root"));
        }
        let stored_path = keys::media_key(&relative);
        let reference_cleanup =
            clear_references(self.references.as_ref(), &stored_path, self.tenant_id).await;

        self.delete_recursive(&relative).await?;
        Ok(DeleteOutcome {
            stored_path,
            reference_cleanup,
        })
    }

    /// Every direct child of `path`, following continuation tokens.
    pub async fn list_all(&self, path: &str, search: Option<&str>) -> StorageResult<FolderListing> {
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);
        let mut listing = FolderListing::default();
        let mut token: Option<String> = None;
        loop {
            let page = self.list_prefix(path, token.as_deref()).await?;
            token = page.next_token.clone();
            for entry in page.folders.into_iter().chain(page.files) {
                let keep = needle
                    .as_deref()
                    .map_or(true, |n| entry.name.to_lowercase().contains(n));
                if keep {
                    listing.push(entry);
                }
            }
            if token.is_none() {
                break;
            }
        }
        Ok(listing)
    }
}

#[async_trait]
impl MediaStorage for ObjectStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Aws
    }

    async fn upload_bytes(
        &self,
        directory: &str,
        name: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        let path = keys::join(&keys::normalize(directory)?, name);
        self.upload(&path, data, content_type).await
    }

    async fn upload_stream(
        &self,
        directory: &str,
        filename: &str,
        reader: ByteReader,
        content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        self.upload_file_stream(directory, filename, reader, content_type)
            .await
    }

    async fn list_folder(&self, path: &str, search: Option<&str>) -> StorageResult<FolderListing> {
        self.list_all(path, search).await
    }

    async fn create_folder(&self, path: &str, name: &str) -> StorageResult<String> {
        self.create_folder_marker(path, name).await
    }

    async fn delete(&self, path: &str, name: &str) -> StorageResult<DeleteOutcome> {
        ObjectStorage::delete(self, path, name).await
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        ObjectStorage::rename(self, from, to).await
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        ObjectStorage::read(self, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object_client::{ObjectInfo, ObjectListing, ObjectStoreClient};
    use object_store::memory::InMemory;
    use object_store::Result as ObjectResult;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Delegates to an in-memory store. `copy` and `delete` fail once their
    /// budget of successful calls is spent; delimited listings of
    /// `failing_list` always fail.
    struct FlakyClient {
        inner: ObjectStoreClient,
        copy_budget: usize,
        copies: AtomicUsize,
        delete_budget: usize,
        deletes: AtomicUsize,
        failing_list: Option<String>,
    }

    impl FlakyClient {
        fn new(inner: ObjectStoreClient) -> Self {
            FlakyClient {
                inner,
                copy_budget: usize::MAX,
                copies: AtomicUsize::new(0),
                delete_budget: usize::MAX,
                deletes: AtomicUsize::new(0),
                failing_list: None,
            }
        }
    }

    fn rejected(path: &str, what: &'static str) -> object_store::Error {
        object_store::Error::PermissionDenied {
            path: path.to_string(),
            source: what.into(),
        }
    }

    #[async_trait]
    impl ObjectClient for FlakyClient {
        fn bucket(&self) -> &str {
            self.inner.bucket()
        }

        async fn put(&self, key: &str, data: Bytes, ct: Option<&str>) -> ObjectResult<()> {
            self.inner.put(key, data, ct).await
        }

        async fn put_stream(
            &self,
            key: &str,
            reader: ByteReader,
            ct: Option<&str>,
        ) -> ObjectResult<u64> {
            self.inner.put_stream(key, reader, ct).await
        }

        async fn get(&self, key: &str) -> ObjectResult<Bytes> {
            self.inner.get(key).await
        }

        async fn exists(&self, key: &str) -> ObjectResult<bool> {
            self.inner.exists(key).await
        }

        async fn content_type(&self, key: &str) -> ObjectResult<Option<String>> {
            self.inner.content_type(key).await
        }

        async fn list_delimited(&self, prefix: &str) -> ObjectResult<ObjectListing> {
            if self.failing_list.as_deref() == Some(prefix) {
                return Err(rejected(prefix, "list rejected"));
            }
            self.inner.list_delimited(prefix).await
        }

        async fn list_recursive(&self, prefix: &str) -> ObjectResult<Vec<ObjectInfo>> {
            self.inner.list_recursive(prefix).await
        }

        async fn copy(&self, from: &str, to: &str) -> ObjectResult<()> {
            if self.copies.fetch_add(1, Ordering::SeqCst) >= self.copy_budget {
                return Err(rejected(from, "copy rejected"));
            }
            self.inner.copy(from, to).await
        }

        async fn delete(&self, key: &str) -> ObjectResult<()> {
            if self.deletes.fetch_add(1, Ordering::SeqCst) >= self.delete_budget {
                return Err(rejected(key, "delete rejected"));
            }
            self.inner.delete(key).await
        }
    }

    fn memory_client() -> ObjectStoreClient {
        ObjectStoreClient::new(Arc::new(InMemory::new()), "test-bucket")
    }

    fn storage() -> (ObjectStoreClient, ObjectStorage) {
        let client = memory_client();
        let storage = ObjectStorage::new(Arc::new(client.clone()));
        (client, storage)
    }

    async fn keys_under(client: &ObjectStoreClient, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = client
            .list_recursive(prefix)
            .await
            .unwrap()
            .into_iter()
            .map(|o| o.key)
            .collect();
        keys.sort();
        keys
    }

    #[test]
    fn test_incomplete_credentials_rejected() {
        let credentials = ObjectStoreCredentials {
            access_key_id: "AKIA".to_string(),
            ..Default::default()
        };
        let err = ObjectStorage::from_credentials(&credentials)
            .err()
            .expect("incomplete credentials must fail");
        let message = err.to_string();
        assert!(matches!(err, StorageError::Config(_)));
        assert!(message.contains("AWS_SECRET_ACCESS_KEY"));
        assert!(message.contains("AWS_BUCKET"));
        assert!(!message.contains("AWS_ACCESS_KEY_ID"));
    }

    #[tokio::test]
    async fn test_upload_and_read_back() {
        let (client, storage) = storage();
        let result = storage
            .upload("entries/a.png", b"png".to_vec(), Some("image/png"))
            .await
            .unwrap();
        assert_eq!(result.canonical_name, "a.png");
        assert_eq!(result.stored_path, "media/entries/a.png");
        assert!(client.exists("media/entries/a.png").await.unwrap());
        assert_eq!(
            storage.get_object_as_base64("entries/a.png").await.unwrap(),
            codec::encode(b"png")
        );
    }

    #[tokio::test]
    async fn test_store_base64_decodes_payload() {
        let (_client, storage) = storage();
        let result = storage
            .store_base64("data:text/plain;base64,aGVsbG8=", "notes", "hi.txt")
            .await
            .unwrap();
        assert_eq!(result.stored_path, "media/notes/hi.txt");
        assert_eq!(storage.read("notes/hi.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_create_folder_marker_lists_as_folder() {
        let (client, storage) = storage();
        let created = storage.create_folder_marker("albums", "2024").await.unwrap();
        assert_eq!(created, "albums/2024/");
        assert!(client.exists("media/albums/2024").await.unwrap());

        let page = storage.list_prefix("albums", None).await.unwrap();
        assert_eq!(page.folders.len(), 1);
        assert_eq!(page.folders[0].name, "2024");
        assert_eq!(page.folders[0].parent_path, "albums");
        assert!(page.files.is_empty());
    }

    #[tokio::test]
    async fn test_empty_object_lists_as_file() {
        let (_client, storage) = storage();
        storage.upload("docs/empty.txt", vec![], None).await.unwrap();
        storage.create_folder_marker("docs", "drafts").await.unwrap();

        let page = storage.list_prefix("docs", None).await.unwrap();
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.files[0].name, "empty.txt");
        assert_eq!(page.folders.len(), 1);
        assert_eq!(page.folders[0].name, "drafts");
        assert!(storage.read("docs/empty.txt").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_child_count_failure_is_non_fatal() {
        let inner = memory_client();
        let flaky = FlakyClient {
            failing_list: Some("media/albums".to_string()),
            ..FlakyClient::new(inner)
        };
        let storage = ObjectStorage::new(Arc::new(flaky));
        storage.create_folder_marker("", "albums").await.unwrap();
        storage
            .upload("albums/a.png", b"a".to_vec(), None)
            .await
            .unwrap();
        storage.upload("cover.png", b"c".to_vec(), None).await.unwrap();

        let page = storage.list_prefix("", None).await.unwrap();
        assert_eq!(page.folders.len(), 1);
        assert_eq!(page.folders[0].name, "albums");
        assert_eq!(page.folders[0].child_count, 0);
        assert_eq!(page.files.len(), 1);
    }

    #[tokio::test]
    async fn test_list_prefix_merges_markers_and_prefixes() {
        let (_client, storage) = storage();
        storage.create_folder_marker("", "albums").await.unwrap();
        storage
            .upload("albums/a.png", b"a".to_vec(), None)
            .await
            .unwrap();
        storage
            .upload("albums/b.png", b"b".to_vec(), None)
            .await
            .unwrap();
        storage.upload("cover.png", b"c".to_vec(), None).await.unwrap();

        let page = storage.list_prefix("", None).await.unwrap();
        assert_eq!(page.folders.len(), 1, "marker and prefix are one folder");
        assert_eq!(page.folders[0].name, "albums");
        assert_eq!(page.folders[0].child_count, 2);
        assert_eq!(page.files.len(), 1);
        assert_eq!(page.files[0].name, "cover.png");
        assert!(page.next_token.is_none());
    }

    #[tokio::test]
    async fn test_list_prefix_paginates_by_fifty() {
        let (_client, storage) = storage();
        for i in 0..120 {
            storage
                .upload(&format!("bulk/{:03}.png", i), vec![1], None)
                .await
                .unwrap();
        }

        let mut seen = Vec::new();
        let mut token: Option<String> = None;
        let mut pages = 0;
        loop {
            let page = storage.list_prefix("bulk", token.as_deref()).await.unwrap();
            assert!(page.files.len() <= LIST_PAGE_SIZE);
            seen.extend(page.files.into_iter().map(|f| f.name));
            pages += 1;
            token = page.next_token;
            if token.is_none() {
                break;
            }
        }

        assert_eq!(pages, 3);
        assert_eq!(seen.len(), 120);
        assert_eq!(seen.first().map(String::as_str), Some("000.png"));
        assert_eq!(seen.last().map(String::as_str), Some("119.png"));
    }

    #[tokio::test]
    async fn test_list_prefix_rejects_foreign_token() {
        let (_client, storage) = storage();
        let result = storage
            .list_prefix("albums", Some("media/other/x.png"))
            .await;
        assert!(matches!(result, Err(StorageError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rename_moves_all_objects_and_marker() {
        let (client, storage) = storage();
        storage.create_folder_marker("", "old").await.unwrap();
        storage.upload("old/a.png", b"a".to_vec(), None).await.unwrap();
        storage
            .upload("old/nested/b.png", b"b".to_vec(), None)
            .await
            .unwrap();
        storage.upload("older/keep.png", b"k".to_vec(), None).await.unwrap();

        storage.rename("old", "new").await.unwrap();

        assert!(keys_under(&client, "media/old").await.is_empty());
        assert!(!client.exists("media/old").await.unwrap());
        assert_eq!(
            keys_under(&client, "media/new").await,
            vec!["media/new/a.png", "media/new/nested/b.png"]
        );
        assert!(client.exists("media/new").await.unwrap());
        assert!(client.exists("media/older/keep.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_copy_failure_keeps_source() {
        let inner = memory_client();
        let flaky = FlakyClient {
            copy_budget: 1,
            ..FlakyClient::new(inner.clone())
        };
        let storage = ObjectStorage::new(Arc::new(flaky));
        for name in ["a.png", "b.png", "c.png"] {
            storage
                .upload(&format!("src/{}", name), b"x".to_vec(), None)
                .await
                .unwrap();
        }

        let err = storage.rename("src", "dst").await.unwrap_err();
        assert_eq!(err.backend_code(), Some("AccessDenied"));

        assert_eq!(keys_under(&inner, "media/src").await.len(), 3);
        assert_eq!(keys_under(&inner, "media/dst").await.len(), 1);
    }

    #[tokio::test]
    async fn test_rename_delete_failure_halts() {
        let inner = memory_client();
        let flaky = FlakyClient {
            delete_budget: 1,
            ..FlakyClient::new(inner.clone())
        };
        let storage = ObjectStorage::new(Arc::new(flaky));
        for name in ["a.png", "b.png", "c.png"] {
            storage
                .upload(&format!("src/{}", name), b"x".to_vec(), None)
                .await
                .unwrap();
        }

        let err = storage.rename("src", "dst").await.unwrap_err();
        assert!(matches!(
            &err,
            StorageError::Backend { key, .. } if key == "media/src/b.png"
        ));

        assert_eq!(keys_under(&inner, "media/dst").await.len(), 3);
        assert_eq!(
            keys_under(&inner, "media/src").await,
            vec!["media/src/b.png", "media/src/c.png"]
        );
    }

    #[tokio::test]
    async fn test_rename_missing_source_fails() {
        let (_client, storage) = storage();
        let err = storage.rename("ghost", "other").await.unwrap_err();
        assert_eq!(err.backend_code(), Some("NoSuchKey"));
    }

    #[tokio::test]
    async fn test_delete_recursive_removes_children_and_marker() {
        let (client, storage) = storage();
        storage.create_folder_marker("", "trash").await.unwrap();
        storage
            .upload("trash/a.png", b"a".to_vec(), None)
            .await
            .unwrap();
        storage
            .upload("trash/deep/b.png", b"b".to_vec(), None)
            .await
            .unwrap();

        let outcome = storage.delete("", "trash").await.unwrap();
        assert_eq!(outcome.stored_path, "media/trash");
        assert!(outcome.references_cleared());
        assert!(keys_under(&client, "media/trash").await.is_empty());
        assert!(!client.exists("media/trash").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_recursive_stops_at_first_failure() {
        let inner = memory_client();
        let flaky = FlakyClient {
            delete_budget: 1,
            ..FlakyClient::new(inner.clone())
        };
        let storage = ObjectStorage::new(Arc::new(flaky));
        for name in ["a.png", "b.png", "c.png"] {
            storage
                .upload(&format!("trash/{}", name), b"x".to_vec(), None)
                .await
                .unwrap();
        }

        let err = storage.delete_recursive("trash").await.unwrap_err();
        assert_eq!(err.backend_code(), Some("AccessDenied"));
        assert!(matches!(
            &err,
            StorageError::Backend { key, .. } if key == "media/trash/b.png"
        ));
        assert_eq!(
            keys_under(&inner, "media/trash").await,
            vec!["media/trash/b.png", "media/trash/c.png"]
        );
    }

    #[tokio::test]
    async fn test_stream_upload_sanitizes_name() {
        let (_client, storage) = storage();
        let reader: ByteReader = Box::pin(std::io::Cursor::new(b"data".to_vec()));
        let result = storage
            .upload_file_stream("entries", "my%file.png", reader, Some("image/png"))
            .await
            .unwrap();
        assert_eq!(result.canonical_name, "myfile.png");
        assert_eq!(result.stored_path, "media/entries/myfile.png");
    }

    #[tokio::test]
    async fn test_list_all_follows_tokens_and_filters() {
        let (_client, storage) = storage();
        for i in 0..60 {
            storage
                .upload(&format!("many/img-{:02}.png", i), vec![1], None)
                .await
                .unwrap();
        }
        storage
            .upload("many/Cover.png", vec![1], None)
            .await
            .unwrap();

        let listing = storage.list_all("many", None).await.unwrap();
        assert_eq!(listing.files.len(), 61);

        let listing = storage.list_all("many", Some("cover")).await.unwrap();
        assert_eq!(listing.files.len(), 1);
    }
}
