//! Maps an extraction result into the wire response

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::types::{ConversionResult, ConvertResponse};

/// Consume a successful result and build the response envelope.
///
/// Text and metadata are copied verbatim; image bytes are base64-encoded
/// under their original identifiers.
pub fn normalize(result: ConversionResult) -> ConvertResponse {
    let images = result
        .images
        .into_iter()
        .map(|(id, bytes)| (id, BASE64.encode(bytes)))
        .collect();

    ConvertResponse::success(result.text, images, result.metadata)
}
