//! Input resolution: turn a user-supplied path or URL into an in-memory
//! [`InputFile`] with a declared MIME type.
//!
//! Nothing here decides whether a file is *supported*. A `.txt` resolves
//! fine and is only rejected when the controller reaches it, so the files
//! before it in the batch are still processed.

use crate::error::StatementError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// MIME type used when neither the extension nor the content identifies the file.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

/// One user-supplied document, read fully into memory.
///
/// Cloning is cheap: the bytes are shared.
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Display name (file name or last URL segment).
    pub name: String,
    /// Declared media kind, e.g. `application/pdf` or `image/png`.
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl InputFile {
    /// Build an input with an explicit MIME type.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Build an input, deriving the MIME type from the name, then the content.
    pub fn detect(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = detect_mime(&name, &bytes);
        Self::from_bytes(name, mime_type, bytes)
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory file.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<InputFile, StatementError> {
    if input.trim().is_empty() {
        return Err(StatementError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input).await
    }
}

/// Resolve every input in order, failing on the first that cannot be read.
pub async fn resolve_inputs<S: AsRef<str>>(
    inputs: &[S],
    timeout_secs: u64,
) -> Result<Vec<InputFile>, StatementError> {
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        files.push(resolve_input(input.as_ref(), timeout_secs).await?);
    }
    Ok(files)
}

async fn resolve_local(path_str: &str) -> Result<InputFile, StatementError> {
    let path = PathBuf::from(path_str);

    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => StatementError::PermissionDenied { path: path.clone() },
        _ => StatementError::FileNotFound { path: path.clone() },
    })?;

    let name = file_name(&path);
    let file = InputFile::detect(name, bytes);
    debug!(
        "Resolved local file: {} ({}, {} bytes)",
        path.display(),
        file.mime_type,
        file.bytes.len()
    );
    Ok(file)
}

async fn download_url(url: &str, timeout_secs: u64) -> Result<InputFile, StatementError> {
    info!("Downloading statement from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| StatementError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            StatementError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            StatementError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(StatementError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let header_mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase());

    let name = url_file_name(url);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| StatementError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    // The server's declared type wins over guessing, unless it is generic.
    let file = match header_mime {
        Some(mime) if mime != UNKNOWN_MIME && !mime.is_empty() => {
            InputFile::from_bytes(name, mime, bytes)
        }
        _ => InputFile::detect(name, bytes),
    };

    info!("Downloaded {} ({}, {} bytes)", file.name, file.mime_type, file.bytes.len());
    Ok(file)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn url_file_name(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "downloaded".to_string()
}

/// Derive a MIME type from the file extension, falling back to magic bytes.
pub fn detect_mime(name: &str, bytes: &[u8]) -> String {
    if let Some(mime) = mime_from_extension(name) {
        return mime.to_string();
    }
    if bytes.starts_with(b"%PDF") {
        return "application/pdf".to_string();
    }
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => UNKNOWN_MIME.to_string(),
    }
}

fn mime_from_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => return None,
    };
    Some(mime)
}
