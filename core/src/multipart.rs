//! `multipart/form-data` encoding for file uploads.
//!
//! The service expects exactly one part named `sfile`. The boundary is
//! derived from the current time in microseconds.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use mime::Mime;

use crate::error::ApiError;

/// Form field name the service reads the uploaded file from.
pub const FILE_FIELD: &str = "sfile";

/// A file ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: Mime,
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Read `path` and detect its content type.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ApiError::Io(format!("{} has no file name", path.display())))?;
        let content_type = detect_content_type(path, &bytes);
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }
}

/// Fresh boundary marker based on the wall clock.
pub fn boundary() -> String {
    let micros = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    format!("------------------------{micros}")
}

/// `Content-Type` header value for a body framed with `boundary`.
pub fn content_type_header(boundary: &str) -> String {
    format!("multipart/form-data; boundary={boundary}")
}

/// Frame `upload` as the single `sfile` part of a multipart body.
pub fn encode(boundary: &str, upload: &Upload) -> Vec<u8> {
    let file_name = upload.file_name.replace('"', "%22");
    let mut body = Vec::with_capacity(upload.bytes.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", upload.content_type).as_bytes());
    body.extend_from_slice(&upload.bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

/// Extension lookup first, then a look at the leading bytes.
pub fn detect_content_type(path: &Path, bytes: &[u8]) -> Mime {
    let by_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| mime_for_extension(&ext.to_ascii_lowercase()));
    by_extension
        .or_else(|| sniff(bytes))
        .and_then(|essence| essence.parse().ok())
        .unwrap_or(mime::APPLICATION_OCTET_STREAM)
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    let essence = match ext {
        "txt" | "log" | "md" => "text/plain",
        "htm" | "html" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "xml" => "text/xml",
        "js" => "application/javascript",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" | "tgz" => "application/gzip",
        "tar" => "application/x-tar",
        "7z" => "application/x-7z-compressed",
        "rar" => "application/vnd.rar",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(essence)
}

fn sniff(bytes: &[u8]) -> Option<&'static str> {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
    ];
    if let Some((_, essence)) = SIGNATURES.iter().find(|(magic, _)| bytes.starts_with(magic)) {
        return Some(*essence);
    }
    // Unrecognized but valid UTF-8 counts as text.
    if std::str::from_utf8(bytes).is_ok() {
        return Some("text/plain");
    }
    None
}
