use spurt_core::ImageReferenceStore;

/// Ask the record store to drop references to `path`. Failures are logged and
/// returned as text; the caller proceeds with the deletion either way.
pub(crate) async fn clear_references(
    references: &dyn ImageReferenceStore,
    path: &str,
    tenant_id: Option<i64>,
) -> Result<(), String> {
    match references.remove_image_reference(path, tenant_id).await {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(
                error = %e,
                path = %path,
                tenant_id = ?tenant_id,
                "Failed to clear image references, continuing with delete"
            );
            Err(e.to_string())
        }
    }
}
