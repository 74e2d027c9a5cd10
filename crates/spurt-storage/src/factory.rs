use crate::traits::MediaStorage;
use crate::{AzureStorage, LocalStorage, ObjectStorage};
use spurt_core::{BackendSettings, ImageReferenceStore, StorageConfig, StorageKind, StorageResult};
use std::sync::Arc;

/// The concrete backend selected by configuration
#[derive(Clone)]
pub enum Backend {
    Local(LocalStorage),
    ObjectStore(ObjectStorage),
    Azure(AzureStorage),
}

impl Backend {
    pub fn storage(&self) -> &dyn MediaStorage {
        match self {
            Backend::Local(storage) => storage,
            Backend::ObjectStore(storage) => storage,
            Backend::Azure(storage) => storage,
        }
    }

    pub fn kind(&self) -> StorageKind {
        self.storage().kind()
    }
}

/// Create a storage backend based on configuration
///
/// Local and Azure construction never fail. The object store backend requires
/// complete credentials.
pub fn create_backend(
    config: &StorageConfig,
    references: Arc<dyn ImageReferenceStore>,
) -> StorageResult<Backend> {
    let tenant_id = config.tenant_id();
    match config.settings() {
        BackendSettings::Local { root } => Ok(Backend::Local(
            LocalStorage::new(root.clone()).with_references(references, tenant_id),
        )),
        BackendSettings::ObjectStore(credentials) => {
            let storage = ObjectStorage::from_credentials(credentials)?;
            Ok(Backend::ObjectStore(
                storage.with_references(references, tenant_id),
            ))
        }
        BackendSettings::Azure(credentials) => {
            Ok(Backend::Azure(AzureStorage::new(credentials.clone())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spurt_core::{NoOpImageReferences, ObjectStoreCredentials, StorageError};

    #[test]
    fn local_config_builds_local_backend() {
        let backend = create_backend(
            &StorageConfig::local("/tmp/spurt"),
            Arc::new(NoOpImageReferences),
        )
        .unwrap();
        assert_eq!(backend.kind(), StorageKind::Local);
    }

    #[test]
    fn incomplete_object_store_credentials_fail() {
        let config = StorageConfig::object_store(ObjectStoreCredentials::default());
        let result = create_backend(&config, Arc::new(NoOpImageReferences));
        assert!(matches!(result, Err(StorageError::Config(_))));
    }
}
