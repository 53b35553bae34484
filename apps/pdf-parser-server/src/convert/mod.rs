//! Conversion pipeline
//!
//! Request flow:
//!
//! ```text
//! ConvertRequest ─► decode ─► ConversionOptions::build ─► ConversionExecutor ─► normalize
//!                   (bytes)   (validated options)          (Extractor, bounded)   (envelope)
//! ```

mod decode;
mod executor;
mod normalize;
mod options;
mod types;

pub use decode::decode_pdf_base64;
pub use executor::{ConversionExecutor, ExecutorStats};
pub use normalize::normalize;
pub use options::{ConversionOptions, ConvertRequest, Languages, OutputFormat};
pub use types::{ConversionResult, ConvertResponse, Metadata};
