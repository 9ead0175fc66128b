//! Stowage CLI: command-line client for the auditable storage layer.
//!
//! Configuration comes from `STOWAGE_*` variables (a `.env` file is loaded
//! first). Results are printed as JSON on stdout; logs and audit events go to
//! stderr.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use stowage_cli::{init_tracing, print_json, run_then_close, upload_request_from_file};
use stowage_core::StorageConfig;
use stowage_storage::{create_client, AuditableStorage, AuditedStorage, ClientKind, Storage};
use tokio_util::sync::CancellationToken;

const SERVICE_NAME: &str = "stowage-cli";

#[derive(Parser)]
#[command(name = "stowage", about = "Auditable object storage CLI")]
struct Cli {
    /// Backend selection: production (S3), development or test (in-memory).
    /// Defaults to the configured environment.
    #[arg(long, global = true)]
    kind: Option<ClientKind>,

    /// Actor recorded in audit events
    #[arg(long, global = true, default_value = "system")]
    actor: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a local file
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Destination key (default: uploads/YYYY/MM/DD/<name>_<unix><ext>)
        #[arg(long)]
        path: Option<String>,
        /// Content type (default: guessed from the extension)
        #[arg(long)]
        content_type: Option<String>,
    },
    /// Delete an object
    Delete {
        /// Object key
        path: String,
        /// Retry failed attempts using the configured retry policy
        #[arg(long)]
        retry: bool,
    },
    /// Show object metadata
    Info {
        /// Object key
        path: String,
    },
    /// Print the public URL of an object
    Url {
        /// Object key
        path: String,
    },
    /// Check backend health
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = StorageConfig::from_env()
        .context("Failed to load storage configuration from STOWAGE_* variables")?;
    let kind = cli
        .kind
        .unwrap_or_else(|| ClientKind::from_environment(&config.environment));
    let client = create_client(kind, Arc::new(config), SERVICE_NAME, None, None)
        .context("Failed to create storage client")?;

    run_then_close(&client, run(&client, cli.command, &cli.actor)).await
}

async fn run(client: &AuditedStorage, command: Commands, actor: &str) -> anyhow::Result<()> {
    match command {
        Commands::Upload {
            file,
            path,
            content_type,
        } => {
            let request =
                upload_request_from_file(&file, path.as_deref(), content_type.as_deref()).await?;
            let response = client.upload_with_audit(request, actor).await?;
            print_json(&response)
        }
        Commands::Delete { path, retry } => {
            if retry {
                let token = CancellationToken::new();
                let ctrl_c = token.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        ctrl_c.cancel();
                    }
                });
                client.delete_with_retry(&path, actor, &token).await?;
            } else {
                client.delete_with_audit(&path, actor).await?;
            }
            print_json(&serde_json::json!({ "success": true, "deleted": path }))
        }
        Commands::Info { path } => {
            let info = client.get_info_with_audit(&path, actor).await?;
            print_json(&info)
        }
        Commands::Url { path } => {
            print_json(&serde_json::json!({ "path": path, "url": client.get_url(&path) }))
        }
        Commands::Health => {
            client.health_check().await?;
            print_json(&serde_json::json!({
                "healthy": true,
                "backend": client.backend_type().to_string(),
            }))
        }
    }
}
