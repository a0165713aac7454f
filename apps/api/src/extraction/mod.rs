//! Extractor — converts an uploaded document of a known kind into plain text.
//!
//! Dispatch is a closed match over `DocumentKind`: adding a kind means adding
//! one variant and one handler module.

pub mod docx;
pub mod ocr;
pub mod pdf;
pub mod txt;

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::extraction::ocr::OcrEngine;
use crate::progress::StageReporter;

pub const PDF_MEDIA_TYPE: &str = "application/pdf";
pub const DOCX_MEDIA_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TXT_MEDIA_TYPE: &str = "text/plain";

const IMAGE_MEDIA_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/bmp",
    "image/tiff",
    "image/webp",
];

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no extraction rule for media type '{0}'")]
    UnsupportedFormat(String),

    #[error("not a valid {kind} document: {reason}")]
    CorruptDocument { kind: DocumentKind, reason: String },

    #[error("text is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("OCR engine failed: {0}")]
    OcrUnavailable(String),
}

/// The kinds of document the Extractor knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Docx,
    Txt,
    Image,
}

impl DocumentKind {
    /// Maps a declared media type to a kind. Parameters such as `; charset=utf-8`
    /// and letter case are ignored.
    pub fn from_media_type(media_type: &str) -> Result<Self, ExtractError> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            PDF_MEDIA_TYPE => Ok(DocumentKind::Pdf),
            DOCX_MEDIA_TYPE => Ok(DocumentKind::Docx),
            TXT_MEDIA_TYPE => Ok(DocumentKind::Txt),
            other if IMAGE_MEDIA_TYPES.contains(&other) => Ok(DocumentKind::Image),
            _ => Err(ExtractError::UnsupportedFormat(media_type.to_string())),
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentKind::Pdf => "PDF",
            DocumentKind::Docx => "DOCX",
            DocumentKind::Txt => "TXT",
            DocumentKind::Image => "image",
        };
        f.write_str(name)
    }
}

/// A file as submitted by the user. Never persisted.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub filename: String,
    pub media_type: String,
    bytes: Bytes,
}

impl UploadedDocument {
    pub fn new(filename: impl Into<String>, media_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// A fresh handle on the original bytes. Reading it never disturbs other readers.
    pub fn bytes(&self) -> Bytes {
        self.bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Plain text derived from exactly one `UploadedDocument`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

#[derive(Debug, Clone)]
pub struct Extractor {
    ocr: OcrEngine,
}

impl Extractor {
    pub fn new(ocr: OcrEngine) -> Self {
        Self { ocr }
    }

    /// Extracts the text of `document`, read as `kind`.
    ///
    /// Works on an independent view of the bytes, so the document stays re-readable.
    /// An empty payload yields empty text for every kind.
    pub async fn extract(
        &self,
        document: &UploadedDocument,
        kind: DocumentKind,
        progress: &StageReporter,
    ) -> Result<ExtractedText, ExtractError> {
        if document.is_empty() {
            return Ok(ExtractedText::default());
        }
        let bytes = document.bytes();

        let text = match kind {
            DocumentKind::Pdf => pdf::extract(bytes, progress.clone()).await?,
            DocumentKind::Docx => docx::extract(&bytes)?,
            DocumentKind::Txt => txt::extract(&bytes)?,
            DocumentKind::Image => self.ocr.recognize(&bytes).await?,
        };

        debug!(
            "Extracted {} chars from '{}' ({kind})",
            text.len(),
            document.filename
        );
        Ok(ExtractedText::new(text))
    }
}
