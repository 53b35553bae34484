//! Base64 input decoding

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::error::ServiceError;

/// Decode the `pdf_base64` request field into raw PDF bytes.
///
/// ASCII whitespace (line-wrapped encoders) and a leading data URI prefix
/// are tolerated. PDF structure is not inspected here.
pub fn decode_pdf_base64(raw: &str) -> Result<Vec<u8>, ServiceError> {
    let payload = strip_data_uri(raw.trim());
    if payload.is_empty() {
        return Err(ServiceError::InvalidInput(
            "pdf_base64 must not be empty".to_string(),
        ));
    }

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|_| ServiceError::InvalidInput("invalid base64 input".to_string()))?;

    if bytes.is_empty() {
        return Err(ServiceError::InvalidInput(
            "pdf_base64 decodes to an empty document".to_string(),
        ));
    }

    Ok(bytes)
}

/// `data:application/pdf;base64,JVBERi0...` -> `JVBERi0...`
fn strip_data_uri(raw: &str) -> &str {
    if raw.starts_with("data:") {
        if let Some(idx) = raw.find(";base64,") {
            return &raw[idx + ";base64,".len()..];
        }
    }
    raw
}
