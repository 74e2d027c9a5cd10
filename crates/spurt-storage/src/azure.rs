use crate::keys;
use crate::traits::{ByteReader, MediaStorage};
use async_trait::async_trait;
use spurt_core::{
    AzureCredentials, DeleteOutcome, FolderListing, StorageError, StorageKind, StorageResult,
    UploadResult,
};

/// Azure Blob Storage placeholder
///
/// Credentials are resolved so diagnostics can report them, but every
/// operation fails with [`StorageError::NotImplemented`].
#[derive(Debug, Clone)]
pub struct AzureStorage {
    credentials: AzureCredentials,
}

impl AzureStorage {
    pub fn new(credentials: AzureCredentials) -> Self {
        AzureStorage { credentials }
    }

    pub fn credentials(&self) -> &AzureCredentials {
        &self.credentials
    }

    fn unsupported<T>(operation: &str) -> StorageResult<T> {
        Err(StorageError::NotImplemented(format!(
            "azure storage does not support {} yet",
            operation
        )))
    }
}

#[async_trait]
impl MediaStorage for AzureStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Azure
    }

    async fn upload_bytes(
        &self,
        _directory: &str,
        _name: &str,
        _data: Vec<u8>,
        _content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        Self::unsupported("upload")
    }

    async fn upload_stream(
        &self,
        _directory: &str,
        _filename: &str,
        _reader: ByteReader,
        _content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        Self::unsupported("upload")
    }

    async fn list_folder(
        &self,
        _path: &str,
        _search: Option<&str>,
    ) -> StorageResult<FolderListing> {
        Self::unsupported("list")
    }

    async fn create_folder(&self, _path: &str, name: &str) -> StorageResult<String> {
        keys::validate_name(name, "folder")?;
        Self::unsupported("create_folder")
    }

    async fn delete(&self, _path: &str, _name: &str) -> StorageResult<DeleteOutcome> {
        Self::unsupported("delete")
    }

    async fn rename(&self, _from: &str, _to: &str) -> StorageResult<()> {
        Self::unsupported("rename")
    }

    async fn read(&self, _path: &str) -> StorageResult<Vec<u8>> {
        Self::unsupported("read")
    }
}
