//! Document context extraction for DocChat.
//!
//! [`PdfExtractor`] implements `docchat_core::ContextExtractor` for PDF
//! uploads. Parsing itself is delegated to `pdf-extract`.

pub mod pdf;

pub use pdf::{PdfExtractor, read_document};
