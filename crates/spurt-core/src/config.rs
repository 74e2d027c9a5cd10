//! Configuration module
//!
//! Resolves which storage backend is active and the connection parameters it
//! needs. Values come from the process environment (optionally seeded from a
//! `.env` file); the resolved [`StorageConfig`] is immutable and meant to be
//! built once and shared behind an `Arc`.

use std::collections::HashMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::constants::*;
use crate::error::{StorageError, StorageResult};
use crate::storage_types::StorageKind;

/// Mask a secret for display, keeping only the first four characters.
pub fn mask_secret(value: &str) -> String {
    if value.chars().count() <= 4 {
        return "****".to_string();
    }
    let prefix: String = value.chars().take(4).collect();
    format!("{}****", prefix)
}

/// Strip incidental quoting (and whitespace) that often survives in env files.
fn clean(value: &str) -> String {
    value
        .trim()
        .trim_matches(|c: char| c == '\'' || c == '"')
        .trim()
        .to_string()
}

/// The backend requested through `STORAGE_TYPE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectedType {
    Known(StorageKind),
    /// A value the resolver does not recognize. Resolves to local settings.
    Unrecognized(String),
}

impl SelectedType {
    pub fn kind(&self) -> Option<StorageKind> {
        match self {
            SelectedType::Known(kind) => Some(*kind),
            SelectedType::Unrecognized(_) => None,
        }
    }
}

impl fmt::Display for SelectedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectedType::Known(kind) => write!(f, "{}", kind),
            SelectedType::Unrecognized(raw) => write!(f, "{}", raw),
        }
    }
}

/// Credentials and bucket for an S3-compatible object store
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ObjectStoreCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, etc.)
    pub endpoint: Option<String>,
}

impl ObjectStoreCredentials {
    /// Environment keys whose values resolved empty.
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            (ENV_AWS_ACCESS_KEY_ID, &self.access_key_id),
            (ENV_AWS_SECRET_ACCESS_KEY, &self.secret_access_key),
            (ENV_AWS_DEFAULT_REGION, &self.region),
            (ENV_AWS_BUCKET, &self.bucket),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(key, _)| key)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_keys().is_empty()
    }
}

impl fmt::Debug for ObjectStoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectStoreCredentials")
            .field("access_key_id", &mask_secret(&self.access_key_id))
            .field("secret_access_key", &mask_secret(&self.secret_access_key))
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Azure blob settings. Reserved; the backend is not implemented.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AzureCredentials {
    pub account: String,
    pub account_key: String,
    pub container: String,
}

impl fmt::Debug for AzureCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureCredentials")
            .field("account", &self.account)
            .field("account_key", &mask_secret(&self.account_key))
            .field("container", &self.container)
            .finish()
    }
}

/// Backend-specific settings. Exactly one set exists per configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSettings {
    Local { root: PathBuf },
    ObjectStore(ObjectStoreCredentials),
    Azure(AzureCredentials),
}

/// Resolved storage configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    selected: SelectedType,
    settings: BackendSettings,
    tenant_id: Option<i64>,
}

impl StorageConfig {
    /// Resolve the configuration from the process environment.
    ///
    /// A `.env` file in the working directory is loaded first when present.
    /// Missing keys fall back to defaults; only a value that cannot be read
    /// (not valid unicode) is an error.
    pub fn resolve() -> StorageResult<Self> {
        dotenvy::dotenv().ok();

        let mut vars = HashMap::new();
        for key in STORAGE_ENV_KEYS {
            match env::var(key) {
                Ok(value) => {
                    vars.insert(*key, value);
                }
                Err(env::VarError::NotPresent) => {}
                Err(env::VarError::NotUnicode(_)) => {
                    return Err(StorageError::Config(format!(
                        "{} is set but is not valid unicode",
                        key
                    )));
                }
            }
        }

        Ok(Self::from_lookup(|key| vars.get(key).cloned()))
    }

    /// Resolve the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|v| clean(&v)).unwrap_or_default();

        let raw_type = read(ENV_STORAGE_TYPE);
        let selected = if raw_type.is_empty() {
            SelectedType::Known(StorageKind::Local)
        } else {
            match raw_type.parse::<StorageKind>() {
                Ok(kind) => SelectedType::Known(kind),
                Err(_) => SelectedType::Unrecognized(raw_type),
            }
        };

        let local_root = || {
            let path = read(ENV_STORAGE_LOCAL_PATH);
            if path.is_empty() {
                PathBuf::from(DEFAULT_LOCAL_PATH)
            } else {
                PathBuf::from(path)
            }
        };

        let settings = match &selected {
            SelectedType::Known(StorageKind::Aws) => {
                let endpoint = read(ENV_S3_ENDPOINT);
                BackendSettings::ObjectStore(ObjectStoreCredentials {
                    access_key_id: read(ENV_AWS_ACCESS_KEY_ID),
                    secret_access_key: read(ENV_AWS_SECRET_ACCESS_KEY),
                    region: read(ENV_AWS_DEFAULT_REGION),
                    bucket: read(ENV_AWS_BUCKET),
                    endpoint: (!endpoint.is_empty()).then_some(endpoint),
                })
            }
            SelectedType::Known(StorageKind::Azure) => BackendSettings::Azure(AzureCredentials {
                account: read(ENV_AZURE_STORAGE_ACCOUNT),
                account_key: read(ENV_AZURE_ACCOUNT_KEY),
                container: read(ENV_AZURE_CONTAINER_NAME),
            }),
            SelectedType::Known(StorageKind::Local) | SelectedType::Unrecognized(_) => {
                BackendSettings::Local { root: local_root() }
            }
        };

        let raw_tenant = read(ENV_TENANT_ID);
        let tenant_id = if raw_tenant.is_empty() {
            None
        } else {
            match raw_tenant.parse::<i64>() {
                Ok(id) => Some(id),
                Err(_) => {
                    tracing::warn!(value = %raw_tenant, "TENANT_ID is not a number, ignoring");
                    None
                }
            }
        };

        StorageConfig {
            selected,
            settings,
            tenant_id,
        }
    }

    /// Local storage rooted at `root`.
    pub fn local(root: impl Into<PathBuf>) -> Self {
        StorageConfig {
            selected: SelectedType::Known(StorageKind::Local),
            settings: BackendSettings::Local { root: root.into() },
            tenant_id: None,
        }
    }

    /// Object storage with the given credentials.
    pub fn object_store(credentials: ObjectStoreCredentials) -> Self {
        StorageConfig {
            selected: SelectedType::Known(StorageKind::Aws),
            settings: BackendSettings::ObjectStore(credentials),
            tenant_id: None,
        }
    }

    pub fn with_tenant_id(mut self, tenant_id: Option<i64>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn selected(&self) -> &SelectedType {
        &self.selected
    }

    pub fn settings(&self) -> &BackendSettings {
        &self.settings
    }

    pub fn tenant_id(&self) -> Option<i64> {
        self.tenant_id
    }

    pub fn local_root(&self) -> Option<&Path> {
        match &self.settings {
            BackendSettings::Local { root } => Some(root.as_path()),
            _ => None,
        }
    }

    pub fn object_store_credentials(&self) -> Option<&ObjectStoreCredentials> {
        match &self.settings {
            BackendSettings::ObjectStore(credentials) => Some(credentials),
            _ => None,
        }
    }

    pub fn azure_credentials(&self) -> Option<&AzureCredentials> {
        match &self.settings {
            BackendSettings::Azure(credentials) => Some(credentials),
            _ => None,
        }
    }
}
