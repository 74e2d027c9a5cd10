//! spurt-storage: operator CLI for the Spurt storage layer.
//!
//! Reads STORAGE_* / AWS_* / TENANT_ID from the environment (or `.env`).
//! Set DATABASE_URL to clear image references in Postgres on delete.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use spurt_cli::{image_references, init_tracing, print_json, upload_file_name};
use spurt_storage::{diagnostics, ByteReader, StorageDispatcher};

#[derive(Parser)]
#[command(name = "spurt-storage", about = "Spurt media storage CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report on the storage configuration
    Doctor {
        /// Also upload a 1x1 test image through the configured backend
        #[arg(long)]
        test_upload: bool,
    },
    /// Create the local storage directory layout
    Init,
    /// List a folder
    Ls {
        /// Media-relative folder path ("" for the root)
        #[arg(default_value = "")]
        path: String,
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,
        /// Continuation token from a previous page (object store only)
        #[arg(long)]
        token: Option<String>,
    },
    /// Create a folder
    Mkdir {
        /// Parent folder path
        path: String,
        /// New folder name
        name: String,
    },
    /// Upload a local file
    Upload {
        /// Path to the file to upload
        file: std::path::PathBuf,
        /// Destination folder
        #[arg(long, default_value = "")]
        path: String,
    },
    /// Delete a file or folder
    Rm {
        /// Parent folder path
        path: String,
        /// Entry name
        name: String,
    },
    /// Move a file or folder
    Mv {
        /// Current path
        old: String,
        /// New path
        new: String,
    },
}

#[derive(Serialize)]
struct CreatedFolder {
    path: String,
}

#[derive(Serialize)]
struct Moved<'a> {
    from: &'a str,
    to: &'a str,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Doctor { test_upload } = cli.command {
        let report = diagnostics::run_diagnostics(test_upload).await;
        return print_json(&report);
    }

    let database_url = std::env::var("DATABASE_URL").ok();
    let references = image_references(database_url.as_deref())?;
    let dispatcher = StorageDispatcher::from_env(references)
        .context("Failed to initialize storage. Run `spurt-storage doctor` for details")?;

    match cli.command {
        Commands::Doctor { .. } => {}
        Commands::Init => {
            dispatcher.ensure_layout().await?;
            println!("Storage layout ready ({})", dispatcher.kind());
        }
        Commands::Ls {
            path,
            search,
            token,
        } => {
            if search.is_some() {
                let listing = dispatcher.list_folder(&path, search.as_deref()).await?;
                print_json(&listing)?;
            } else {
                let page = dispatcher.list_page(&path, token.as_deref()).await?;
                print_json(&page)?;
            }
        }
        Commands::Mkdir { path, name } => {
            let created = dispatcher.create_folder(&path, &name).await?;
            print_json(&CreatedFolder { path: created })?;
        }
        Commands::Upload { file, path } => {
            let filename = upload_file_name(&file)?;
            let handle = tokio::fs::File::open(&file)
                .await
                .with_context(|| format!("Failed to open {}", file.display()))?;
            let reader: ByteReader = Box::pin(handle);
            let result = dispatcher.upload_stream(&path, &filename, reader).await?;
            print_json(&result)?;
        }
        Commands::Rm { path, name } => {
            let outcome = dispatcher.delete(&path, &name).await?;
            if let Err(e) = &outcome.reference_cleanup {
                eprintln!("warning: image references were not cleared: {}", e);
            }
            println!("Deleted {}", outcome.stored_path);
        }
        Commands::Mv { old, new } => {
            dispatcher.rename(&old, &new).await?;
            print_json(&Moved {
                from: &old,
                to: &new,
            })?;
        }
    }

    Ok(())
}
