//! Image OCR through the Tesseract CLI.
//!
//! The bitmap is decoded with `image`, flattened to 8-bit RGB and handed to
//! `tesseract <file> stdout` as a PNG. Recognition quality is best effort.

use std::io::{Cursor, Write};
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::extraction::{DocumentKind, ExtractError};

#[derive(Debug, Clone)]
pub struct OcrEngine {
    binary: String,
    timeout: Duration,
}

impl OcrEngine {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub async fn recognize(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let owned = bytes.to_vec();
        let png = tokio::task::spawn_blocking(move || normalize_to_png(&owned))
            .await
            .map_err(|e| ExtractError::OcrUnavailable(format!("image decoding aborted: {e}")))??;

        let mut file = tempfile::Builder::new()
            .prefix("aquraid-ocr-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| ExtractError::OcrUnavailable(format!("cannot stage image: {e}")))?;
        file.write_all(&png)
            .and_then(|_| file.flush())
            .map_err(|e| ExtractError::OcrUnavailable(format!("cannot stage image: {e}")))?;

        debug!("Running {} on {} byte bitmap", self.binary, png.len());

        let run = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| {
                ExtractError::OcrUnavailable(format!(
                    "{} timed out after {}s",
                    self.binary,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| ExtractError::OcrUnavailable(format!("cannot run {}: {e}", self.binary)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("{} exited with {}: {}", self.binary, output.status, stderr.trim());
            return Err(ExtractError::OcrUnavailable(format!(
                "{} exited with {}",
                self.binary, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Decodes any raster format `image` understands and re-encodes it as 8-bit RGB PNG.
pub fn normalize_to_png(bytes: &[u8]) -> Result<Vec<u8>, ExtractError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| ExtractError::CorruptDocument {
        kind: DocumentKind::Image,
        reason: e.to_string(),
    })?;

    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ExtractError::OcrUnavailable(format!("cannot re-encode bitmap: {e}")))?;
    Ok(out.into_inner())
}
