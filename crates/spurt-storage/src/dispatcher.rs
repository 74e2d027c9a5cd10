//! Storage facade
//!
//! [`StorageDispatcher`] is the single entry point callers use. It holds the
//! resolved configuration and the backend built from it, routes each operation
//! to that backend, and logs every outcome at the level its error metadata
//! asks for.

use crate::codec;
use crate::factory::{create_backend, Backend};
use crate::keys;
use crate::traits::ByteReader;
use spurt_core::{
    DeleteOutcome, ErrorMetadata, FolderListing, ImageReferenceStore, ListPage, LogLevel,
    SelectedType, StorageConfig, StorageError, StorageKind, StorageResult, UploadResult,
};
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct StorageDispatcher {
    config: Arc<StorageConfig>,
    backend: Backend,
}

impl StorageDispatcher {
    pub fn new(
        config: Arc<StorageConfig>,
        references: Arc<dyn ImageReferenceStore>,
    ) -> StorageResult<Self> {
        if let SelectedType::Unrecognized(raw) = config.selected() {
            tracing::warn!(
                storage_type = %raw,
                "Unknown storage type, defaulting to local storage"
            );
        }
        let backend = create_backend(&config, references)?;
        tracing::info!(
            storage_type = %config.selected(),
            backend = %backend.kind(),
            "Storage backend initialized"
        );
        Ok(StorageDispatcher { config, backend })
    }

    /// Resolve configuration from the environment and build the backend.
    pub fn from_env(references: Arc<dyn ImageReferenceStore>) -> StorageResult<Self> {
        let config = StorageConfig::resolve()?;
        Self::new(Arc::new(config), references)
    }

    /// Use an already-built backend.
    pub fn with_backend(config: Arc<StorageConfig>, backend: Backend) -> Self {
        StorageDispatcher { config, backend }
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Store `bytes` as an asset. When `path` is empty or ends with `/` the
    /// asset name is appended to it; otherwise `path` is the full target.
    pub async fn upload_asset(
        &self,
        name: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> StorageResult<UploadResult> {
        let start = Instant::now();
        let result = self.upload_asset_inner(name, path, bytes).await;
        self.log_outcome("upload_asset", path, start, &result);
        result
    }

    async fn upload_asset_inner(
        &self,
        name: &str,
        path: &str,
        bytes: Vec<u8>,
    ) -> StorageResult<UploadResult> {
        if let SelectedType::Unrecognized(raw) = self.config.selected() {
            tracing::warn!(
                storage_type = %raw,
                "Unknown storage type, defaulting to local storage"
            );
        }
        let target = keys::asset_path(name, path)?;
        let (directory, file_name) = keys::split(&target);
        let content_type = keys::content_type_for(file_name);

        match &self.backend {
            Backend::Local(local) => local.save_decoded_bytes(directory, file_name, &bytes).await,
            Backend::ObjectStore(object) => object.upload(&target, bytes, content_type).await,
            Backend::Azure(_) => Err(StorageError::NotImplemented(
                "azure storage does not support uploads yet".to_string(),
            )),
        }
    }

    /// Decode a data URI and store it as `directory/name`.
    pub async fn upload_base64(
        &self,
        data_uri: &str,
        directory: &str,
        name: &str,
    ) -> StorageResult<UploadResult> {
        if data_uri.trim().is_empty() {
            let result = Err(StorageError::validation("image data is empty"));
            self.log_outcome("upload_base64", directory, Instant::now(), &result);
            return result;
        }
        let asset = match codec::decode(data_uri, directory, name) {
            Ok(asset) => asset,
            Err(e) => {
                let result = Err(e);
                self.log_outcome("upload_base64", directory, Instant::now(), &result);
                return result;
            }
        };
        let path = asset.target_path();
        self.upload_asset(&asset.name, &path, asset.bytes).await
    }

    /// Stream an uploaded file into `directory`.
    pub async fn upload_stream(
        &self,
        directory: &str,
        filename: &str,
        reader: ByteReader,
    ) -> StorageResult<UploadResult> {
        let start = Instant::now();
        let content_type = keys::content_type_for(filename);
        let result = self
            .backend
            .storage()
            .upload_stream(directory, filename, reader, content_type)
            .await;
        self.log_outcome("upload_stream", directory, start, &result);
        result
    }

    pub async fn list_folder(
        &self,
        path: &str,
        search: Option<&str>,
    ) -> StorageResult<FolderListing> {
        let start = Instant::now();
        let result = self.backend.storage().list_folder(path, search).await;
        self.log_outcome("list_folder", path, start, &result);
        result
    }

    /// One page of a folder. Only the object store paginates; other backends
    /// return the whole folder in a single page.
    pub async fn list_page(&self, path: &str, token: Option<&str>) -> StorageResult<ListPage> {
        let start = Instant::now();
        let result = match &self.backend {
            Backend::ObjectStore(object) => object.list_prefix(path, token).await,
            backend => backend
                .storage()
                .list_folder(path, None)
                .await
                .map(|listing| ListPage {
                    folders: listing.folders,
                    files: listing.files,
                    next_token: None,
                }),
        };
        self.log_outcome("list_page", path, start, &result);
        result
    }

    pub async fn create_folder(&self, path: &str, name: &str) -> StorageResult<String> {
        let start = Instant::now();
        let result = self.backend.storage().create_folder(path, name).await;
        self.log_outcome("create_folder", path, start, &result);
        result
    }

    pub async fn delete(&self, path: &str, name: &str) -> StorageResult<DeleteOutcome> {
        let start = Instant::now();
        let result = self.backend.storage().delete(path, name).await;
        self.log_outcome("delete", path, start, &result);
        result
    }

    pub async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let start = Instant::now();
        let result = self.backend.storage().rename(from, to).await;
        self.log_outcome("rename", from, start, &result);
        result
    }

    pub async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        let start = Instant::now();
        let result = self.backend.storage().read(path).await;
        self.log_outcome("read", path, start, &result);
        result
    }

    /// Prepare the backend for use. Creates the local directory layout; a
    /// no-op for the object store.
    pub async fn ensure_layout(&self) -> StorageResult<()> {
        let start = Instant::now();
        let result = match &self.backend {
            Backend::Local(local) => local.ensure_layout().await,
            Backend::ObjectStore(_) => Ok(()),
            Backend::Azure(_) => Err(StorageError::NotImplemented(
                "azure storage has no layout to initialize".to_string(),
            )),
        };
        self.log_outcome("ensure_layout", "", start, &result);
        result
    }

    pub fn kind(&self) -> StorageKind {
        self.backend.kind()
    }

    fn log_outcome<T>(
        &self,
        operation: &'static str,
        path: &str,
        start: Instant,
        result: &StorageResult<T>,
    ) {
        let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
        let backend = self.backend.kind();
        let err = match result {
            Ok(_) => {
                tracing::debug!(
                    operation = operation,
                    path = %path,
                    backend = %backend,
                    duration_ms = duration_ms,
                    "Storage operation completed"
                );
                return;
            }
            Err(err) => err,
        };

        match err.log_level() {
            LogLevel::Debug => tracing::debug!(
                operation = operation,
                path = %path,
                backend = %backend,
                error = %err,
                error_code = err.error_code(),
                duration_ms = duration_ms,
                "Storage operation rejected"
            ),
            LogLevel::Warn => tracing::warn!(
                operation = operation,
                path = %path,
                backend = %backend,
                error = %err,
                error_code = err.error_code(),
                duration_ms = duration_ms,
                "Storage operation unsupported"
            ),
            LogLevel::Error => tracing::error!(
                operation = operation,
                path = %path,
                backend = %backend,
                error = %err,
                error_code = err.error_code(),
                recoverable = err.is_recoverable(),
                duration_ms = duration_ms,
                "Storage operation failed"
            ),
        }
    }
}
