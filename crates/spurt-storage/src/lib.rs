//! Spurt Storage Library
//!
//! This crate provides the storage backends for Spurt media assets and the
//! dispatcher that routes calls to the configured one: a local filesystem
//! backend, an S3-compatible object store backend and an Azure placeholder.
//!
//! # Path format
//!
//! Callers address assets with media-relative paths. All backends use the same
//! layout for consistency:
//!
//! - **Local**: `{STORAGE_LOCAL_PATH}/media/{path}`
//! - **Object store**: key `media/{path}`
//!
//! Paths must not contain `..` or a leading `/`. Path handling is centralized in
//! the `keys` module so all backends stay consistent.

pub mod azure;
pub mod codec;
pub mod diagnostics;
pub mod dispatcher;
pub mod factory;
pub mod keys;
pub mod local;
pub mod object_client;
pub(crate) mod references;
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use azure::AzureStorage;
pub use diagnostics::{run_diagnostics, DiagnosticsReport, UploadStage};
pub use dispatcher::StorageDispatcher;
pub use factory::{create_backend, Backend};
pub use local::LocalStorage;
pub use object_client::{ObjectClient, ObjectStoreClient};
pub use s3::ObjectStorage;
pub use spurt_core::{StorageError, StorageResult};
pub use traits::{ByteReader, MediaStorage};
