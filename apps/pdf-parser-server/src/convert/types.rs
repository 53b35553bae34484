//! Conversion result and wire response types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Document metadata: string keys to arbitrary JSON values
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Output of one extraction run
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    /// Text rendered in the requested output format
    pub text: String,
    /// Image identifier -> encoded image bytes
    pub images: BTreeMap<String, Vec<u8>>,
    pub metadata: Metadata,
}

/// Response envelope for `/v1/convert`
///
/// Success bodies carry `output`, `images` and `metadata`; failure bodies
/// carry only `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConvertResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Image identifier -> base64-encoded bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConvertResponse {
    pub fn success(output: String, images: BTreeMap<String, String>, metadata: Metadata) -> Self {
        Self {
            success: true,
            output: Some(output),
            images: Some(images),
            metadata: Some(metadata),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            images: None,
            metadata: None,
            error: Some(error.into()),
        }
    }
}
