//! Reference resolution: turn an opaque reference into a named, typed blob.

use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use smartshare_core::constants::{OCTET_STREAM, UNNAMED_FILE};
use smartshare_core::{InputItem, MediaBlob, MediaReference, PublishError};
use std::path::{Path, PathBuf};

/// Resolves references picked by the user into display name, MIME type and bytes.
#[async_trait]
pub trait ReferenceResolver: Send + Sync {
    async fn resolve(
        &self,
        reference: &MediaReference,
    ) -> Result<(InputItem, MediaBlob), PublishError>;
}

/// Resolver for local files given as plain paths or `file://` URIs.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

impl FileResolver {
    pub fn new() -> Self {
        Self
    }

    /// Filesystem path behind a reference.
    pub fn path_for(reference: &MediaReference) -> Result<PathBuf, PublishError> {
        let raw = reference.as_str().trim();
        if raw.is_empty() {
            return Err(PublishError::resolution(raw, "Empty reference"));
        }

        if let Some(rest) = raw.strip_prefix("file://") {
            let path = rest.strip_prefix("localhost").unwrap_or(rest);
            if !path.starts_with('/') {
                return Err(PublishError::resolution(raw, "file URI must be absolute"));
            }
            return Ok(decoded_path(path));
        }

        if let Some((scheme, _)) = raw.split_once("://") {
            return Err(PublishError::resolution(
                raw,
                format!("Unsupported reference scheme: {}", scheme),
            ));
        }

        Ok(PathBuf::from(raw))
    }
}

#[async_trait]
impl ReferenceResolver for FileResolver {
    async fn resolve(
        &self,
        reference: &MediaReference,
    ) -> Result<(InputItem, MediaBlob), PublishError> {
        let path = Self::path_for(reference)?;

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PublishError::resolution(reference.as_str(), e))?;

        let display_name = display_name_for(&path);
        let mime_type = mime_type_for(&path, &bytes);

        tracing::debug!(
            reference = %reference,
            display_name = %display_name,
            mime = %mime_type,
            size_bytes = bytes.len(),
            "Reference resolved"
        );

        let item = InputItem {
            reference: reference.clone(),
            display_name,
            mime_type: mime_type.clone(),
        };
        Ok((item, MediaBlob::new(bytes, mime_type)))
    }
}

fn display_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| UNNAMED_FILE.to_string())
}

/// MIME type from the extension, then from the content, then `application/octet-stream`.
pub fn mime_type_for(path: &Path, bytes: &[u8]) -> String {
    path.extension()
        .and_then(|ext| mime_from_extension(&ext.to_string_lossy()))
        .or_else(|| sniff_mime(bytes))
        .unwrap_or(OCTET_STREAM)
        .to_string()
}

/// Map a file extension to its MIME type.
pub fn mime_from_extension(extension: &str) -> Option<&'static str> {
    let mime = match extension.to_lowercase().as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        // Videos
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "m4v" => "video/x-m4v",
        "3gp" => "video/3gpp",
        // Audio
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "flac" => "audio/flac",
        "aac" => "audio/aac",
        // Documents
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

#[cfg(feature = "image")]
fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

#[cfg(not(feature = "image"))]
fn sniff_mime(_bytes: &[u8]) -> Option<&'static str> {
    None
}

/// Percent-decoded URI path. Decoded bytes are kept as-is where the OS allows it.
fn decoded_path(encoded: &str) -> PathBuf {
    let decoded = percent_decode_str(encoded);

    #[cfg(unix)]
    {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;
        PathBuf::from(OsString::from_vec(decoded.collect()))
    }

    #[cfg(not(unix))]
    {
        PathBuf::from(decoded.decode_utf8_lossy().into_owned())
    }
}
