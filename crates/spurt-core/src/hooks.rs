//! Hooks for collaborators outside the storage layer
//!
//! The storage layer does not own the relational records that point at stored
//! assets. Before an asset is deleted it asks the record store, through
//! [`ImageReferenceStore`], to forget any references to the asset's path.

use async_trait::async_trait;

/// Trait for clearing stored references to an asset path
///
/// Called best-effort before deletion: a failure is logged and reported to the
/// caller but never blocks the delete itself.
#[async_trait]
pub trait ImageReferenceStore: Send + Sync {
    /// Remove every reference to `path`, scoped to `tenant_id` when given
    async fn remove_image_reference(
        &self,
        path: &str,
        tenant_id: Option<i64>,
    ) -> Result<(), anyhow::Error>;
}

/// No-op implementation for deployments without a record store
pub struct NoOpImageReferences;

#[async_trait]
impl ImageReferenceStore for NoOpImageReferences {
    async fn remove_image_reference(
        &self,
        _path: &str,
        _tenant_id: Option<i64>,
    ) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
