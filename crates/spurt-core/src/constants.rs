//! Environment keys and layout conventions shared across crates.

pub const ENV_STORAGE_TYPE: &str = "STORAGE_TYPE";
pub const ENV_STORAGE_LOCAL_PATH: &str = "STORAGE_LOCAL_PATH";
pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_DEFAULT_REGION: &str = "AWS_DEFAULT_REGION";
pub const ENV_AWS_BUCKET: &str = "AWS_BUCKET";
pub const ENV_S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const ENV_AZURE_STORAGE_ACCOUNT: &str = "AZURE_STORAGE_ACCOUNT";
pub const ENV_AZURE_ACCOUNT_KEY: &str = "AZURE_ACCOUNT_KEY";
pub const ENV_AZURE_CONTAINER_NAME: &str = "AZURE_CONTAINER_NAME";
pub const ENV_TENANT_ID: &str = "TENANT_ID";

/// Every key the resolver reads.
pub const STORAGE_ENV_KEYS: &[&str] = &[
    ENV_STORAGE_TYPE,
    ENV_STORAGE_LOCAL_PATH,
    ENV_AWS_ACCESS_KEY_ID,
    ENV_AWS_SECRET_ACCESS_KEY,
    ENV_AWS_DEFAULT_REGION,
    ENV_AWS_BUCKET,
    ENV_S3_ENDPOINT,
    ENV_AZURE_STORAGE_ACCOUNT,
    ENV_AZURE_ACCOUNT_KEY,
    ENV_AZURE_CONTAINER_NAME,
    ENV_TENANT_ID,
];

pub const DEFAULT_LOCAL_PATH: &str = "./storage";

/// Root under which every media asset lives, on every backend.
pub const MEDIA_ROOT: &str = "media";

/// Directories created under the local storage root.
pub const LOCAL_LAYOUT: &[&str] = &["media", "entry", "member", "pages", "user"];

/// Page size used for object-store listings.
pub const LIST_PAGE_SIZE: usize = 50;
