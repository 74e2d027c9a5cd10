use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One filesystem entry or object-store key inside a listed folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub is_file: bool,
    pub name: String,
    pub alias_name: String,
    /// Media-relative folder containing the entry ("" for the media root)
    pub parent_path: String,
    pub last_modified: DateTime<Utc>,
    /// Immediate children; only populated for folders
    pub child_count: usize,
}

impl MediaEntry {
    pub fn file(
        name: impl Into<String>,
        parent_path: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        MediaEntry {
            is_file: true,
            alias_name: name.clone(),
            name,
            parent_path: parent_path.into(),
            last_modified,
            child_count: 0,
        }
    }

    pub fn folder(
        name: impl Into<String>,
        parent_path: impl Into<String>,
        last_modified: DateTime<Utc>,
        child_count: usize,
    ) -> Self {
        let name = name.into();
        MediaEntry {
            is_file: false,
            alias_name: name.clone(),
            name,
            parent_path: parent_path.into(),
            last_modified,
            child_count,
        }
    }
}

/// One level of a folder, split into sub-folders and files
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderListing {
    pub folders: Vec<MediaEntry>,
    pub files: Vec<MediaEntry>,
}

impl FolderListing {
    pub fn is_empty(&self) -> bool {
        self.folders.is_empty() && self.files.is_empty()
    }

    pub fn push(&mut self, entry: MediaEntry) {
        if entry.is_file {
            self.files.push(entry);
        } else {
            self.folders.push(entry);
        }
    }
}

/// A page of an object-store listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPage {
    pub folders: Vec<MediaEntry>,
    pub files: Vec<MediaEntry>,
    /// Opaque cursor for the next page; `None` when the listing is complete
    pub next_token: Option<String>,
}

impl From<ListPage> for FolderListing {
    fn from(page: ListPage) -> Self {
        FolderListing {
            folders: page.folders,
            files: page.files,
        }
    }
}
