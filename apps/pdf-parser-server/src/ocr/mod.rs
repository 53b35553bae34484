//! OCR Module
//!
//! Recognizes text on rasterized PDF pages that have no usable text layer,
//! or on every page when a request forces OCR.
//!
//! Supports multiple backends:
//! - Tesseract (local CLI, `ocr-tesseract` feature)
//! - Ollama vision models (local LLM)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pdf_parser_server::ocr::OcrService;
//!
//! let service = OcrService::new(&config.ocr);
//! let languages = vec!["en".to_string()];
//! let result = service.recognize(&png_bytes, &languages).await?;
//! ```

mod provider;
mod service;
mod types;

pub use provider::{OcrProviderTrait, OllamaProvider};
pub use service::{OcrService, OcrSession};
pub use types::{OcrError, OcrProvider, OcrResult};

#[cfg(feature = "ocr-tesseract")]
pub use provider::TesseractProvider;
