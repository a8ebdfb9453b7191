//! Context extractor trait — turns uploaded document bytes into plain text.
//!
//! The extractor is opaque to the rest of the system. On success it yields the
//! concatenation of every page's text in page order; on failure it yields a
//! [`DocumentReadError`], which callers report as a warning.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DocumentReadError;

#[async_trait]
pub trait ContextExtractor: Send + Sync {
    /// A human-readable name for this extractor (e.g., "pdf").
    fn name(&self) -> &str;

    /// Extract text from raw document bytes.
    async fn extract(&self, bytes: &[u8]) -> Result<String, DocumentReadError>;
}

/// A successfully extracted document attached to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentContext {
    /// Original file name as uploaded
    pub file_name: String,

    /// Size of the uploaded file in bytes
    pub bytes: usize,

    /// The full extracted text, embedded verbatim into prompts
    pub text: String,
}

impl DocumentContext {
    pub fn new(file_name: impl Into<String>, bytes: usize, text: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            text: text.into(),
        }
    }

    /// Number of characters of extracted text.
    pub fn chars(&self) -> usize {
        self.text.chars().count()
    }
}
