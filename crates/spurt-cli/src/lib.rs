use anyhow::Context;
use serde::Serialize;
use spurt_core::{ImageReferenceStore, NoOpImageReferences};
use spurt_db::PgImageReferences;
use sqlx::postgres::PgPoolOptions;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Reference store for deletes: Postgres when a database URL is configured,
/// otherwise a no-op.
pub fn image_references(database_url: Option<&str>) -> anyhow::Result<Arc<dyn ImageReferenceStore>> {
    match database_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(Duration::from_secs(5))
                .connect_lazy(url)
                .context("Invalid DATABASE_URL")?;
            Ok(Arc::new(PgImageReferences::new(pool)))
        }
        None => {
            tracing::debug!("DATABASE_URL not set, image references will not be cleared");
            Ok(Arc::new(NoOpImageReferences))
        }
    }
}

/// File name component of a local path, as sent with an upload.
pub fn upload_file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))
}
