//! Base64 codec for inline assets
//!
//! Clients send images as data URIs (`data:image/png;base64,...`) or as bare
//! base64 text. Everything up to and including the first comma is treated as
//! the header and discarded.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use spurt_core::{DecodedAsset, StorageError, StorageResult};

/// Decode a data URI into an asset ready for upload.
pub fn decode(data_uri: &str, target_directory: &str, name: &str) -> StorageResult<DecodedAsset> {
    if name.trim().is_empty() {
        return Err(StorageError::validation("image name is empty"));
    }

    let payload = match data_uri.find(',') {
        Some(index) => &data_uri[index + 1..],
        None => data_uri,
    };
    // Some clients wrap long payloads.
    let payload: String = payload.chars().filter(|c| !c.is_whitespace()).collect();

    let bytes = STANDARD
        .decode(payload.as_bytes())
        .map_err(|e| StorageError::validation(format!("malformed base64 payload: {}", e)))?;

    Ok(DecodedAsset {
        name: name.to_string(),
        target_directory: target_directory.to_string(),
        bytes,
    })
}

/// Encode bytes as standard padded base64.
pub fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encode bytes as a data URI with the given MIME type.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_uri_header() {
        let asset = decode("data:image/png;base64,aGVsbG8=", "entries", "a.png").unwrap();
        assert_eq!(asset.bytes, b"hello");
        assert_eq!(asset.name, "a.png");
        assert_eq!(asset.target_directory, "entries");
    }

    #[test]
    fn accepts_bare_payload() {
        let asset = decode("aGVsbG8=", "", "a.txt").unwrap();
        assert_eq!(asset.bytes, b"hello");
    }

    #[test]
    fn empty_payload_decodes_to_empty_bytes() {
        let asset = decode("data:image/png;base64,", "", "a.png").unwrap();
        assert!(asset.bytes.is_empty());
        let asset = decode("", "", "a.png").unwrap();
        assert!(asset.bytes.is_empty());
    }

    #[test]
    fn rejects_malformed_payload() {
        let err = decode("data:image/png;base64,@@not base64@@", "", "a.png").unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn rejects_empty_name() {
        let err = decode("aGVsbG8=", "", "  ").unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn tolerates_wrapped_lines() {
        let asset = decode("data:text/plain;base64,aGVs\nbG8=", "", "a.txt").unwrap();
        assert_eq!(asset.bytes, b"hello");
    }

    #[test]
    fn decode_inverts_encode() {
        let all_bytes: Vec<u8> = (0..=255).collect();
        for sample in [Vec::new(), vec![0u8], b"spurt".to_vec(), all_bytes] {
            let uri = to_data_uri("application/octet-stream", &sample);
            assert_eq!(decode(&uri, "", "blob").unwrap().bytes, sample);
        }
    }
}
