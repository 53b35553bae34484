//! Extraction capability
//!
//! The [`Extractor`] trait is the boundary between the request pipeline and
//! whatever turns PDF bytes into text, images and metadata. The production
//! implementation is [`MupdfExtractor`].

mod layout;
mod mupdf_extractor;
mod render;

use async_trait::async_trait;
use thiserror::Error;

use crate::convert::{ConversionOptions, ConversionResult};
use crate::ocr::OcrError;

pub use mupdf_extractor::MupdfExtractor;
pub use layout::{DocumentInfo, DocumentLayout, LayoutBlock, PageLayout};
pub use render::render;

/// Turns PDF bytes into a [`ConversionResult`]
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Whether dropping an in-flight `convert` future actually stops the work
    fn cancellable(&self) -> bool {
        false
    }

    /// Convert one document. May be slow and CPU heavy.
    async fn convert(
        &self,
        pdf: Vec<u8>,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, ExtractionError>;
}

/// Extraction errors
///
/// The `Display` output may contain library detail and is only logged;
/// clients see [`ExtractionError::public_message`].
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Failed to load PDF: {0}")]
    InvalidDocument(String),

    #[error("MuPDF error: {0}")]
    MuPdf(String),

    #[error("Image extraction failed: {0}")]
    ImageExtraction(String),

    #[error("OCR failed: {0}")]
    Ocr(#[from] OcrError),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Task join error: {0}")]
    Task(String),
}

impl ExtractionError {
    /// Sanitized, category-level message safe to return to clients
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidDocument(_) => "failed to parse PDF document",
            Self::MuPdf(_) => "PDF processing failed",
            Self::ImageExtraction(_) => "image extraction failed",
            Self::Ocr(OcrError::ProviderNotAvailable(_)) => "OCR requested but no OCR provider is available",
            Self::Ocr(_) => "OCR failed",
            Self::Render(_) => "failed to render output",
            Self::Task(_) => "conversion failed",
        }
    }
}

impl From<mupdf::Error> for ExtractionError {
    fn from(err: mupdf::Error) -> Self {
        ExtractionError::MuPdf(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_message_hides_detail() {
        let err = ExtractionError::MuPdf("fz_open_document: /var/tmp/x.pdf: syntax error at 0x1f".into());
        assert!(err.to_string().contains("/var/tmp/x.pdf"));
        assert!(!err.public_message().contains("/var/tmp"));

        let err = ExtractionError::Ocr(OcrError::ProviderNotAvailable("none".into()));
        assert_eq!(err.public_message(), "OCR requested but no OCR provider is available");
    }
}
