//! Data models for the storage layer
//!
//! Listing entries, upload results and the transient decoded payloads passed
//! between the codec and the backends.

mod asset;
mod media;

// Re-export all models for convenient imports
pub use asset::{DecodedAsset, DeleteOutcome, UploadResult};
pub use media::{FolderListing, ListPage, MediaEntry};
