use crate::keys;
use crate::references::clear_references;
use crate::traits::{ByteReader, MediaStorage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use spurt_core::constants::{LOCAL_LAYOUT, MEDIA_ROOT};
use spurt_core::{
    DeleteOutcome, FolderListing, ImageReferenceStore, MediaEntry, NoOpImageReferences,
    StorageError, StorageKind, StorageResult, UploadResult,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
///
/// Assets live under `{root}/media/`. Construction touches nothing on disk;
/// call [`LocalStorage::ensure_layout`] to create the expected directories.
#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    references: Arc<dyn ImageReferenceStore>,
    tenant_id: Option<i64>,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalStorage {
            root: root.into(),
            references: Arc::new(NoOpImageReferences),
            tenant_id: None,
        }
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

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a media-relative path onto the filesystem, rejecting traversal.
    fn resolve(&self, relative: &str) -> StorageResult<(String, PathBuf)> {
        let normalized = keys::normalize(relative)?;
        let mut path = self.root.join(MEDIA_ROOT);
        if !normalized.is_empty() {
            path.push(&normalized);
        }
        Ok((normalized, path))
    }

    /// Create the root and its fixed subdirectories. Safe to call repeatedly.
    pub async fn ensure_layout(&self) -> StorageResult<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::io("ensure_layout", self.root.display(), e))?;

        for dir in LOCAL_LAYOUT {
            let path = self.root.join(dir);
            match fs::create_dir(&path).await {
                Ok(()) => tracing::info!(directory = %path.display(), "Created storage directory"),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let metadata = fs::metadata(&path)
                        .await
                        .map_err(|e| StorageError::io("ensure_layout", path.display(), e))?;
                    if !metadata.is_dir() {
                        return Err(StorageError::io(
                            "ensure_layout",
                            path.display(),
                            io::Error::new(
                                io::ErrorKind::AlreadyExists,
                                "path exists and is not a directory",
                            ),
                        ));
                    }
                }
                Err(e) => return Err(StorageError::io("ensure_layout", path.display(), e)),
            }
        }
        Ok(())
    }

    /// List the direct children of a folder, folders and files each sorted by
    /// name. A folder whose children cannot be counted reports zero.
    pub async fn list_folder(
        &self,
        relative_path: &str,
        search: Option<&str>,
    ) -> StorageResult<FolderListing> {
        let (parent_path, dir) = self.resolve(relative_path)?;
        let needle = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StorageError::io("list_folder", dir.display(), e))?;

        let mut listing = FolderListing::default();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io("list_folder", dir.display(), e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(needle) = &needle {
                if !name.to_lowercase().contains(needle.as_str()) {
                    continue;
                }
            }

            let metadata = match entry.metadata().await {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::warn!(error = %e, entry = %name, "Skipping unreadable entry");
                    continue;
                }
            };
            let last_modified = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_default();

            if metadata.is_dir() {
                let child_count = count_children(&entry.path()).await;
                listing.push(MediaEntry::folder(
                    name,
                    parent_path.clone(),
                    last_modified,
                    child_count,
                ));
            } else {
                listing.push(MediaEntry::file(name, parent_path.clone(), last_modified));
            }
        }

        listing.folders.sort_by(|a, b| a.name.cmp(&b.name));
        listing.files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    /// Folder and file counts for a folder, alongside its listing.
    pub async fn folder_details(
        &self,
        relative_path: &str,
    ) -> StorageResult<(usize, usize, FolderListing)> {
        let listing = self.list_folder(relative_path, None).await?;
        Ok((listing.folders.len(), listing.files.len(), listing))
    }

    pub async fn create_folder(&self, relative_path: &str, name: &str) -> StorageResult<String> {
        keys::validate_name(name, "folder")?;
        let (parent_path, parent) = self.resolve(relative_path)?;
        let path = parent.join(name);

        fs::create_dir(&path)
            .await
            .map_err(|e| StorageError::io("create_folder", path.display(), e))?;

        tracing::info!(folder = %path.display(), "Folder created");
        Ok(format!("{}/", keys::join(&parent_path, name)))
    }

    /// Stream an uploaded file into `relative_path`. `%` is stripped from the
    /// file name; the sanitized name is returned.
    pub async fn save_uploaded_stream(
        &self,
        relative_path: &str,
        filename: &str,
        mut reader: ByteReader,
    ) -> StorageResult<UploadResult> {
        let sanitized = keys::sanitize_filename(filename)?;
        let (_, dir) = self.resolve(relative_path)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io("upload", dir.display(), e))?;

        let path = dir.join(&sanitized.file_name);
        let start = Instant::now();

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| StorageError::io("upload", path.display(), e))?;
        let size = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| StorageError::io("upload", path.display(), e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::io("upload", path.display(), e))?;

        tracing::info!(
            path = %path.display(),
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local stream upload successful"
        );

        Ok(UploadResult {
            canonical_name: sanitized.file_name,
            stored_path: path.display().to_string(),
        })
    }

    /// Write decoded bytes to `relative_path/filename`, creating directories
    /// and overwriting any existing file.
    pub async fn save_decoded_bytes(
        &self,
        relative_path: &str,
        filename: &str,
        data: &[u8],
    ) -> StorageResult<UploadResult> {
        keys::validate_name(filename, "file")?;
        let (_, dir) = self.resolve(relative_path)?;
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io("upload", dir.display(), e))?;

        let path = dir.join(filename);
        let start = Instant::now();

        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| StorageError::io("upload", path.display(), e))?;
        file.write_all(data)
            .await
            .map_err(|e| StorageError::io("upload", path.display(), e))?;
        file.sync_all()
            .await
            .map_err(|e| StorageError::io("upload", path.display(), e))?;

        tracing::info!(
            path = %path.display(),
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local upload successful"
        );

        Ok(UploadResult {
            canonical_name: filename.to_string(),
            stored_path: path.display().to_string(),
        })
    }

    /// Delete a file or folder. Image references are cleared first; a missing
    /// target is not an error.
    pub async fn delete(&self, relative_path: &str, name: &str) -> StorageResult<DeleteOutcome> {
        let target = keys::join(&keys::normalize(relative_path)?, name);
        let (normalized, path) = self.resolve(&target)?;
        if normalized.is_empty() {
            return Err(StorageError::validation("refusing to delete the media root"));
        }

        let stored_path = path.display().to_string();
        let reference_cleanup =
            clear_references(self.references.as_ref(), &stored_path, self.tenant_id).await;

        match fs::symlink_metadata(&path).await {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %stored_path, "Delete target already absent");
            }
            Err(e) => return Err(StorageError::io("delete", &stored_path, e)),
            Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&path)
                .await
                .map_err(|e| StorageError::io("delete", &stored_path, e))?,
            Ok(_) => fs::remove_file(&path)
                .await
                .map_err(|e| StorageError::io("delete", &stored_path, e))?,
        }

        tracing::info!(path = %stored_path, "Local delete successful");
        Ok(DeleteOutcome {
            stored_path,
            reference_cleanup,
        })
    }

    pub async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        let (from_rel, from_path) = self.resolve(from)?;
        let (to_rel, to_path) = self.resolve(to)?;
        if from_rel.is_empty() || to_rel.is_empty() {
            return Err(StorageError::validation("cannot rename the media root"));
        }
        if from_rel == to_rel {
            return Ok(());
        }

        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io("rename", parent.display(), e))?;
        }
        fs::rename(&from_path, &to_path)
            .await
            .map_err(|e| StorageError::io("rename", from_path.display(), e))?;

        tracing::info!(from = %from_rel, to = %to_rel, "Local rename successful");
        Ok(())
    }

    pub async fn read(&self, relative_path: &str) -> StorageResult<Vec<u8>> {
        let (_, path) = self.resolve(relative_path)?;
        fs::read(&path)
            .await
            .map_err(|e| StorageError::io("read", path.display(), e))
    }
}

/// Entries directly inside `dir`; zero when the folder cannot be read.
async fn count_children(dir: &Path) -> usize {
    async fn read_count(dir: &Path) -> io::Result<usize> {
        let mut entries = fs::read_dir(dir).await?;
        let mut count = 0;
        while entries.next_entry().await?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    match read_count(dir).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(
                error = %e,
                folder = %dir.display(),
                "Failed to count folder children"
            );
            0
        }
    }
}

#[async_trait]
impl MediaStorage for LocalStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }

    async fn upload_bytes(
        &self,
        directory: &str,
        name: &str,
        data: Vec<u8>,
        _content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        self.save_decoded_bytes(directory, name, &data).await
    }

    async fn upload_stream(
        &self,
        directory: &str,
        filename: &str,
        reader: ByteReader,
        _content_type: Option<&str>,
    ) -> StorageResult<UploadResult> {
        self.save_uploaded_stream(directory, filename, reader).await
    }

    async fn list_folder(&self, path: &str, search: Option<&str>) -> StorageResult<FolderListing> {
        LocalStorage::list_folder(self, path, search).await
    }

    async fn create_folder(&self, path: &str, name: &str) -> StorageResult<String> {
        LocalStorage::create_folder(self, path, name).await
    }

    async fn delete(&self, path: &str, name: &str) -> StorageResult<DeleteOutcome> {
        LocalStorage::delete(self, path, name).await
    }

    async fn rename(&self, from: &str, to: &str) -> StorageResult<()> {
        LocalStorage::rename(self, from, to).await
    }

    async fn read(&self, path: &str) -> StorageResult<Vec<u8>> {
        LocalStorage::read(self, path).await
    }
}
