use std::future::Future;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use stowage_core::UploadRequest;
use stowage_storage::keys::generate_file_path;
use stowage_storage::AuditedStorage;

/// Key prefix for CLI uploads without an explicit `--path`.
pub const DEFAULT_UPLOAD_PREFIX: &str = "uploads";

/// Initialize tracing for the CLI. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    // A subscriber may already be installed when embedded; keep it.
    let _ = stowage_infra::init_telemetry("stowage-cli", Some("warn"), false);
}

/// Content type from the file extension, `application/octet-stream` when
/// unknown.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "json" => "application/json",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        _ => "application/octet-stream",
    }
}

/// Build an upload request streaming from a local file.
///
/// Without `key` the object lands under
/// `uploads/YYYY/MM/DD/<name>_<unix><ext>`.
pub async fn upload_request_from_file(
    path: &Path,
    key: Option<&str>,
    content_type: Option<&str>,
) -> anyhow::Result<UploadRequest> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Invalid file name: {}", path.display()))?
        .to_string();

    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let size = file
        .metadata()
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();

    let key = match key {
        Some(key) => key.to_string(),
        None => generate_file_path(&filename, DEFAULT_UPLOAD_PREFIX),
    };
    let content_type = content_type.unwrap_or_else(|| guess_content_type(path));

    Ok(UploadRequest::new(
        Box::pin(file),
        filename,
        content_type,
        size,
        key,
    ))
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Await `command`, then close `client` whatever the outcome. A command error
/// is reported ahead of a close error.
pub async fn run_then_close<T>(
    client: &AuditedStorage,
    command: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    let result = command.await;
    let closed = client.close().await;
    let value = result?;
    closed.context("Failed to close storage client")?;
    Ok(value)
}
