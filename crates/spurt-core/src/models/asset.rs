use serde::{Deserialize, Serialize};

/// Returned by every upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub canonical_name: String,
    /// Local filesystem path or object key; what downstream records persist
    pub stored_path: String,
}

/// Payload decoded from an inline base64 data URI
///
/// Owned by the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAsset {
    pub name: String,
    pub target_directory: String,
    pub bytes: Vec<u8>,
}

impl DecodedAsset {
    /// Media-relative path the asset should be written to.
    pub fn target_path(&self) -> String {
        let dir = self.target_directory.trim_end_matches('/');
        if dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", dir, self.name)
        }
    }
}

/// Result of a delete, including the best-effort reference cleanup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteOutcome {
    pub stored_path: String,
    /// `Err` carries the record-store failure; the delete went ahead regardless
    pub reference_cleanup: Result<(), String>,
}

impl DeleteOutcome {
    pub fn references_cleared(&self) -> bool {
        self.reference_cleanup.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_path_joins_directory_and_name() {
        let asset = DecodedAsset {
            name: "cover.png".to_string(),
            target_directory: "entries/".to_string(),
            bytes: vec![],
        };
        assert_eq!(asset.target_path(), "entries/cover.png");

        let root = DecodedAsset {
            target_directory: String::new(),
            ..asset
        };
        assert_eq!(root.target_path(), "cover.png");
    }
}
