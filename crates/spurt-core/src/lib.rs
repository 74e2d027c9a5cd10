//! Spurt Core Library
//!
//! This crate provides the configuration resolver, error taxonomy, domain models
//! and collaborator hooks shared by the Spurt storage layer and its tooling.

pub mod config;
pub mod constants;
pub mod error;
pub mod hooks;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    mask_secret, AzureCredentials, BackendSettings, ObjectStoreCredentials, SelectedType,
    StorageConfig,
};
pub use error::{ErrorMetadata, LogLevel, StorageError, StorageResult};
pub use hooks::{ImageReferenceStore, NoOpImageReferences};
pub use models::{DecodedAsset, DeleteOutcome, FolderListing, ListPage, MediaEntry, UploadResult};
pub use storage_types::StorageKind;
