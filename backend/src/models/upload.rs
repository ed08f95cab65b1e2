//! Transient upload types that only live for the duration of one request.

use bytes::Bytes;
use serde::Serialize;
use utoipa::ToSchema;

/// File formats accepted for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Pdf,
    Png,
    Jpeg,
    Csv,
    Docx,
}

impl SourceFormat {
    /// Map a lowercased extension to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "csv" => Some(Self::Csv),
            "docx" => Some(Self::Docx),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Png | Self::Jpeg)
    }
}

/// Lowercased suffix after the last `.`, if the name has one.
pub fn extension_of(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Raw bytes of one uploaded file plus the name the client declared.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn extension(&self) -> Option<String> {
        extension_of(&self.filename)
    }

    /// Accepted format, or `None` for missing or unlisted extensions.
    pub fn format(&self) -> Option<SourceFormat> {
        self.extension()
            .as_deref()
            .and_then(SourceFormat::from_extension)
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// PDF-equivalent buffer produced from one upload.
///
/// csv and docx sources produce plain text here, not PDF (see
/// `conversion_service`), so `bytes` is only *expected* to parse as PDF.
#[derive(Debug, Clone)]
pub struct NormalizedDocument {
    pub source_filename: String,
    pub format: SourceFormat,
    pub bytes: Vec<u8>,
}

impl AsRef<[u8]> for NormalizedDocument {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
