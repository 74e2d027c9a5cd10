//! Storage abstraction trait
//!
//! This module defines the [`MediaStorage`] trait that every backend implements.
//! Paths are media-relative (see [`crate::keys`]); backends map them onto their
//! own layout.

use async_trait::async_trait;
use spurt_core::{DeleteOutcome, FolderListing, StorageKind, StorageResult, UploadResult};
use std::pin::Pin;
use tokio::io::AsyncRead;

/// Byte source for streamed uploads.
pub type ByteReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Capability set shared by all storage backends
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Backend kind, used for logging and diagnostics
    fn kind(&self) -> StorageKind;

    /// Write `data` to `directory/name`, creating intermediate folders.
    /// Existing content at the target is overwritten.
    async fn upload_bytes(
        &self,
        directory: &str,
        name: &str,
        data: Vec<u8>,
        content_type: Option<&str>,
    ) -> StorageResult<UploadResult>;

    /// Stream an uploaded file into `directory`. The file name is sanitized
    /// before use and the canonical name is returned.
    async fn upload_stream(
        &self,
        directory: &str,
        filename: &str,
        reader: ByteReader,
        content_type: Option<&str>,
    ) -> StorageResult<UploadResult>;

    /// List the direct children of a folder, optionally filtered by a
    /// case-insensitive substring of the entry name.
    async fn list_folder(&self, path: &str, search: Option<&str>) -> StorageResult<FolderListing>;

    /// Create a folder named `name` under `path`; returns its path with a
    /// trailing slash.
    async fn create_folder(&self, path: &str, name: &str) -> StorageResult<String>;

    /// Delete a file or folder (recursively). Image references are cleared
    /// first on a best-effort basis.
    async fn delete(&self, path: &str, name: &str) -> StorageResult<DeleteOutcome>;

    /// Move a file or folder to a new path.
    async fn rename(&self, from: &str, to: &str) -> StorageResult<()>;

    /// Read a stored file.
    async fn read(&self, path: &str) -> StorageResult<Vec<u8>>;
}
