//! Shared path and key conventions for storage backends.
//!
//! Callers address assets with media-relative paths (`albums/2024/cover.png`).
//! Locally these live under `{root}/media/...`, in the object store under the
//! `media/...` key prefix. Paths must not contain `..` segments or start with `/`.

use spurt_core::constants::MEDIA_ROOT;
use spurt_core::{StorageError, StorageResult};

/// Content type of the zero-length objects that mark object-store folders.
pub const FOLDER_CONTENT_TYPE: &str = "application/x-directory";

/// Validate and normalize a media-relative path: no leading or trailing slash,
/// no empty, `.` or `..` segments.
pub fn normalize(path: &str) -> StorageResult<String> {
    let trimmed = path.trim();
    if trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(StorageError::validation(format!(
            "path must be relative to the media root: {}",
            path
        )));
    }
    if trimmed.contains('\\') {
        return Err(StorageError::validation(format!(
            "path contains invalid characters: {}",
            path
        )));
    }

    let mut segments = Vec::new();
    for segment in trimmed.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(StorageError::validation(format!(
                    "path contains invalid characters: {}",
                    path
                )))
            }
            other => segments.push(other),
        }
    }
    Ok(segments.join("/"))
}

/// Validate a single entry name (folder or file).
pub fn validate_name(name: &str, what: &str) -> StorageResult<()> {
    if name.trim().is_empty() {
        return Err(StorageError::validation(format!(
            "{} name is empty, can't create",
            what
        )));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(StorageError::validation(format!(
            "{} name contains invalid characters: {}",
            what, name
        )));
    }
    Ok(())
}

/// Join a normalized directory and a name.
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Split a normalized path into (directory, file name).
pub fn split(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

/// Object key for a normalized media-relative path.
pub fn media_key(relative: &str) -> String {
    join(MEDIA_ROOT, relative)
}

/// Target path of an uploaded asset. When `path` is empty or names a folder
/// (trailing slash) the asset name is appended.
pub fn asset_path(name: &str, path: &str) -> StorageResult<String> {
    let trimmed = path.trim();
    let target = if trimmed.is_empty() || trimmed.ends_with('/') {
        format!("{}{}", trimmed, name)
    } else {
        trimmed.to_string()
    };
    let normalized = normalize(&target)?;
    if normalized.is_empty() {
        return Err(StorageError::validation("asset path is empty"));
    }
    Ok(normalized)
}

/// An uploaded file name after sanitizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedName {
    pub file_name: String,
    pub extension: String,
}

/// Strip `%` from an uploaded file name and check it still has a base name.
pub fn sanitize_filename(filename: &str) -> StorageResult<SanitizedName> {
    let file_name = filename.replace('%', "");
    validate_name(&file_name, "file")?;

    let (base, extension) = match file_name.rsplit_once('.') {
        Some((base, ext)) => (base, ext),
        None => (file_name.as_str(), ""),
    };

    if base.is_empty() {
        return Err(StorageError::validation(format!(
            "invalid filename: {}",
            filename
        )));
    }

    Ok(SanitizedName {
        extension: extension.to_string(),
        file_name,
    })
}

/// Content type for common media extensions.
pub fn content_type_for(name: &str) -> Option<&'static str> {
    let (_, extension) = name.rsplit_once('.')?;
    match extension.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        "ico" => Some("image/x-icon"),
        "pdf" => Some("application/pdf"),
        "mp4" => Some("video/mp4"),
        _ => None,
    }
}
