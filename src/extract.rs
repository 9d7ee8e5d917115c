#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::panic::{self, AssertUnwindSafe};

/// Failure to turn a document into text.
#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    /// The PDF could not be parsed.
    #[error("Could not extract text from PDF: {0}")]
    Pdf(String),
}

/// Converts raw document bytes into plain text.
pub trait TextExtractor {
    /// Returns the text of the whole document, pages concatenated in order.
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

/// Extractor backed by `pdf-extract`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        // pdf-extract panics on some malformed inputs.
        match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(err)) => Err(ExtractError::Pdf(err.to_string())),
            Err(_) => Err(ExtractError::Pdf("parser panicked".to_string())),
        }
    }
}
