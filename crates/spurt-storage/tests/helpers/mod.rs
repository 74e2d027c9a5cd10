//! Test helpers: build dispatchers over temporary directories and in-memory
//! object stores.

use async_trait::async_trait;
use object_store::memory::InMemory;
use spurt_core::{ImageReferenceStore, NoOpImageReferences, ObjectStoreCredentials, StorageConfig};
use spurt_storage::{Backend, ObjectStorage, ObjectStoreClient, StorageDispatcher};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Minimal base64 PNG (1x1 pixel).
pub const PNG_DATA_URI: &str = spurt_storage::diagnostics::TEST_IMAGE_DATA_URI;

/// Records every reference removal.
#[derive(Default)]
pub struct RecordingReferences {
    pub calls: Mutex<Vec<(String, Option<i64>)>>,
}

#[async_trait]
impl ImageReferenceStore for RecordingReferences {
    async fn remove_image_reference(
        &self,
        path: &str,
        tenant_id: Option<i64>,
    ) -> Result<(), anyhow::Error> {
        self.calls
            .lock()
            .unwrap()
            .push((path.to_string(), tenant_id));
        Ok(())
    }
}

pub struct LocalHarness {
    pub dir: TempDir,
    pub references: Arc<RecordingReferences>,
    pub dispatcher: StorageDispatcher,
}

pub async fn local_harness(tenant_id: Option<i64>) -> LocalHarness {
    let dir = tempfile::tempdir().unwrap();
    let references = Arc::new(RecordingReferences::default());
    let config = StorageConfig::local(dir.path()).with_tenant_id(tenant_id);
    let dispatcher = StorageDispatcher::new(Arc::new(config), references.clone()).unwrap();
    dispatcher.ensure_layout().await.unwrap();
    LocalHarness {
        dir,
        references,
        dispatcher,
    }
}

pub struct ObjectHarness {
    pub client: ObjectStoreClient,
    pub references: Arc<RecordingReferences>,
    pub dispatcher: StorageDispatcher,
}

pub fn object_harness(tenant_id: Option<i64>) -> ObjectHarness {
    let client = ObjectStoreClient::new(Arc::new(InMemory::new()), "test-bucket");
    let references = Arc::new(RecordingReferences::default());
    let credentials = ObjectStoreCredentials {
        access_key_id: "AKIAEXAMPLE".to_string(),
        secret_access_key: "secret".to_string(),
        region: "us-east-1".to_string(),
        bucket: "test-bucket".to_string(),
        endpoint: None,
    };
    let config = StorageConfig::object_store(credentials).with_tenant_id(tenant_id);
    let storage = ObjectStorage::new(Arc::new(client.clone()))
        .with_references(references.clone(), tenant_id);
    let dispatcher =
        StorageDispatcher::with_backend(Arc::new(config), Backend::ObjectStore(storage));
    ObjectHarness {
        client,
        references,
        dispatcher,
    }
}

/// Dispatcher over the Azure placeholder, selected through the resolver.
pub fn azure_dispatcher() -> StorageDispatcher {
    let config = StorageConfig::from_lookup(|key| match key {
        "STORAGE_TYPE" => Some("azure".to_string()),
        _ => None,
    });
    StorageDispatcher::new(Arc::new(config), Arc::new(NoOpImageReferences))
        .expect("azure backend builds without credentials")
}
