//! PDF text extraction.
//!
//! Pages are extracted in page order and concatenated. Extraction is
//! CPU-bound and runs on the blocking pool; a panic inside the parser is
//! reported as [`DocumentReadError::Malformed`] rather than taking the
//! server down.

use std::path::Path;

use async_trait::async_trait;
use docchat_core::error::DocumentReadError;
use docchat_core::extractor::ContextExtractor;
use tracing::{debug, warn};

/// Every PDF starts with this header.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Default upload limit (20 MiB).
pub const DEFAULT_MAX_BYTES: usize = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PdfExtractor {
    max_bytes: usize,
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BYTES)
    }
}

impl PdfExtractor {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Cheap checks that do not need the parser.
    fn precheck(&self, bytes: &[u8]) -> Result<(), DocumentReadError> {
        if bytes.len() > self.max_bytes {
            return Err(DocumentReadError::TooLarge {
                size: bytes.len(),
                limit: self.max_bytes,
            });
        }
        if !looks_like_pdf(bytes) {
            return Err(DocumentReadError::NotPdf);
        }
        Ok(())
    }
}

/// The header may be preceded by a little junk; readers accept it within
/// the first kilobyte.
fn looks_like_pdf(bytes: &[u8]) -> bool {
    let head = &bytes[..bytes.len().min(1024)];
    head.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}

/// Extracted text with nothing but whitespace counts as no text.
fn require_text(text: String) -> Result<String, DocumentReadError> {
    if text.trim().is_empty() {
        Err(DocumentReadError::NoText)
    } else {
        Ok(text)
    }
}

#[async_trait]
impl ContextExtractor for PdfExtractor {
    fn name(&self) -> &str {
        "pdf"
    }

    async fn extract(&self, bytes: &[u8]) -> Result<String, DocumentReadError> {
        self.precheck(bytes)?;

        let owned = bytes.to_vec();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&owned))
            .await
            .map_err(|e| {
                warn!(error = %e, "PDF extraction task panicked");
                DocumentReadError::Malformed("parser failed on this document".into())
            })?
            .map_err(|e| DocumentReadError::Malformed(e.to_string()))?;

        debug!(bytes = bytes.len(), chars = text.len(), "Extracted PDF text");
        require_text(text)
    }
}

/// Read a document from disk, returning its file name and bytes.
pub async fn read_document(path: &Path) -> Result<(String, Vec<u8>), DocumentReadError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| DocumentReadError::Unreadable(format!("{}: {e}", path.display())))?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok((file_name, bytes))
}
