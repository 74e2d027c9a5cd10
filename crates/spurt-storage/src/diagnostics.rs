//! Storage diagnostics
//!
//! Produces a structured report on the resolved configuration: which backend is
//! selected, whether the local directories exist and are writable, which AWS
//! keys are present, and what an operator should fix. Optionally uploads a
//! small embedded PNG through the dispatcher to exercise the whole write path.

use crate::codec;
use crate::dispatcher::StorageDispatcher;
use serde::Serialize;
use spurt_core::{
    NoOpImageReferences, SelectedType, StorageConfig, StorageKind, StorageResult,
};
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

/// 1x1 PNG used by the test upload.
pub const TEST_IMAGE_DATA_URI: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

/// Folder the test upload is written to.
pub const DIAGNOSTICS_FOLDER: &str = "diagnostics";

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub storage_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_storage: Option<LocalStorageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_s3: Option<ObjectStoreReport>,
    pub environment: EnvironmentReport,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_upload: Option<TestUploadReport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LocalStorageReport {
    pub path: String,
    pub directory_exists: bool,
    pub media_directory_exists: bool,
    pub entries_directory_exists: bool,
    pub write_permission: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
}

/// Presence of object store settings. Secrets are reported as set or unset only.
#[derive(Debug, Clone, Serialize)]
pub struct ObjectStoreReport {
    pub aws_access_key_id_set: bool,
    pub aws_secret_access_key_set: bool,
    pub aws_default_region: String,
    pub aws_bucket: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnvironmentReport {
    pub tenant_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    ConvertBase64,
    UploadImage,
}

#[derive(Debug, Clone, Serialize)]
pub struct TestUploadReport {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<UploadStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub image_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl TestUploadReport {
    fn failed(image_name: String, stage: UploadStage, error: impl ToString) -> Self {
        TestUploadReport {
            success: false,
            stage: Some(stage),
            error: Some(error.to_string()),
            image_name,
            image_path: None,
        }
    }
}

/// Resolve configuration from the environment and diagnose it.
pub async fn run_diagnostics(test_upload: bool) -> DiagnosticsReport {
    diagnose(StorageConfig::resolve().map(Arc::new), test_upload).await
}

/// Diagnose a configuration. The report is produced even when the
/// configuration could not be resolved or the backend could not be built.
pub async fn diagnose(
    config: StorageResult<Arc<StorageConfig>>,
    test_upload: bool,
) -> DiagnosticsReport {
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            return DiagnosticsReport {
                storage_type: "unknown".to_string(),
                error: Some(e.to_string()),
                local_storage: None,
                aws_s3: None,
                environment: EnvironmentReport { tenant_id: None },
                recommendations: vec![
                    "Fix the storage environment variables and run diagnostics again".to_string(),
                ],
                test_upload: None,
            }
        }
    };

    match StorageDispatcher::new(Arc::clone(&config), Arc::new(NoOpImageReferences)) {
        Ok(dispatcher) => diagnose_dispatcher(&dispatcher, test_upload).await,
        Err(e) => {
            let mut report = inspect(&config).await;
            if test_upload {
                report.test_upload = Some(TestUploadReport::failed(
                    test_image_name(),
                    UploadStage::UploadImage,
                    &e,
                ));
            }
            report.error = Some(e.to_string());
            report
        }
    }
}

/// Diagnose the configuration behind an existing dispatcher, uploading the
/// test image through it when asked.
pub async fn diagnose_dispatcher(
    dispatcher: &StorageDispatcher,
    test_upload: bool,
) -> DiagnosticsReport {
    let mut report = inspect(dispatcher.config()).await;
    if test_upload {
        report.test_upload = Some(upload_test_image(dispatcher).await);
    }
    report
}

async fn inspect(config: &StorageConfig) -> DiagnosticsReport {
    let mut recommendations = Vec::new();

    match config.selected() {
        SelectedType::Unrecognized(raw) => recommendations.push(format!(
            "STORAGE_TYPE '{}' is not recognized; set it to local, aws or azure (local storage is used meanwhile)",
            raw
        )),
        SelectedType::Known(StorageKind::Azure) => recommendations.push(
            "Azure storage is not implemented yet; set STORAGE_TYPE to local or aws".to_string(),
        ),
        SelectedType::Known(_) => {}
    }

    let local_storage = match config.local_root() {
        Some(root) => {
            let report = probe_local(root).await;
            if !report.directory_exists {
                recommendations.push(format!(
                    "Create the storage directory {} (or run `spurt-storage init`)",
                    report.path
                ));
            } else if !report.write_permission {
                recommendations.push(format!(
                    "Grant the service write permission on {}",
                    report.path
                ));
            }
            Some(report)
        }
        None => None,
    };

    let aws_s3 = config.object_store_credentials().map(|credentials| {
        let missing = credentials.missing_keys();
        if !missing.is_empty() {
            recommendations.push(format!(
                "Set the missing AWS environment variables: {}",
                missing.join(", ")
            ));
        }
        ObjectStoreReport {
            aws_access_key_id_set: !credentials.access_key_id.is_empty(),
            aws_secret_access_key_set: !credentials.secret_access_key.is_empty(),
            aws_default_region: credentials.region.clone(),
            aws_bucket: credentials.bucket.clone(),
        }
    });

    DiagnosticsReport {
        storage_type: config.selected().to_string(),
        error: None,
        local_storage,
        aws_s3,
        environment: EnvironmentReport {
            tenant_id: config.tenant_id(),
        },
        recommendations,
        test_upload: None,
    }
}

async fn probe_local(root: &Path) -> LocalStorageReport {
    let is_dir = |path: std::path::PathBuf| async move {
        fs::metadata(&path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    };

    let directory_exists = is_dir(root.to_path_buf()).await;
    let media_directory_exists = is_dir(root.join("media")).await;
    let entries_directory_exists = is_dir(root.join("media").join("entries")).await;

    let (write_permission, write_error) = if directory_exists {
        let scratch = root.join(format!(".write-test-{}", Uuid::new_v4().simple()));
        match fs::write(&scratch, b"ok").await {
            Ok(()) => {
                if let Err(e) = fs::remove_file(&scratch).await {
                    tracing::warn!(error = %e, path = %scratch.display(), "Failed to remove write test file");
                }
                (true, None)
            }
            Err(e) => (false, Some(e.to_string())),
        }
    } else {
        (false, Some("directory does not exist".to_string()))
    };

    LocalStorageReport {
        path: root.display().to_string(),
        directory_exists,
        media_directory_exists,
        entries_directory_exists,
        write_permission,
        write_error,
    }
}

fn test_image_name() -> String {
    format!("test-{}.png", Uuid::new_v4().simple())
}

async fn upload_test_image(dispatcher: &StorageDispatcher) -> TestUploadReport {
    let image_name = test_image_name();
    let asset = match codec::decode(TEST_IMAGE_DATA_URI, DIAGNOSTICS_FOLDER, &image_name) {
        Ok(asset) => asset,
        Err(e) => return TestUploadReport::failed(image_name, UploadStage::ConvertBase64, e),
    };

    let path = asset.target_path();
    match dispatcher.upload_asset(&asset.name, &path, asset.bytes).await {
        Ok(result) => {
            tracing::info!(path = %result.stored_path, "Diagnostics test upload succeeded");
            TestUploadReport {
                success: true,
                stage: None,
                error: None,
                image_name,
                image_path: Some(result.stored_path),
            }
        }
        Err(e) => TestUploadReport::failed(image_name, UploadStage::UploadImage, e),
    }
}
