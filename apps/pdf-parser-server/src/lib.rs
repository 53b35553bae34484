//! PDF Parser Server
//!
//! HTTP service converting base64-encoded PDFs to markdown, JSON or HTML.
//!
//! # Modules
//!
//! - `convert`: request decoding, option validation, bounded execution, response envelope
//! - `extractor`: the [`extractor::Extractor`] seam and its MuPDF implementation
//! - `ocr`: OCR providers used for pages without a text layer
//! - `routes`: axum handlers for `/v1/convert` and `/v1/health`

pub mod config;
pub mod convert;
pub mod error;
pub mod extractor;
pub mod ocr;
pub mod routes;
pub mod state;
