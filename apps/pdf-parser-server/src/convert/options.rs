//! Conversion request and validated options

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Longest accepted language code ("zh-Hans", "chi_sim", ...)
const MAX_LANGUAGE_CODE_LEN: usize = 32;

/// Request body for `POST /v1/convert`
#[derive(Debug, Clone, Deserialize)]
pub struct ConvertRequest {
    /// Base64 encoded PDF file content
    pub pdf_base64: String,
    /// Force OCR on all pages, even those with a text layer
    #[serde(default)]
    pub force_ocr: bool,
    /// Separate pages in the output
    #[serde(default)]
    pub paginate_output: bool,
    /// OCR languages, as a list or a comma-separated string
    #[serde(default)]
    pub languages: Option<Languages>,
    /// "markdown", "json" or "html"; validated by [`ConversionOptions::build`]
    #[serde(default)]
    pub output_format: Option<String>,
}

/// Language codes as sent by clients
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Languages {
    List(Vec<String>),
    Csv(String),
}

impl Languages {
    fn codes(&self) -> Vec<&str> {
        match self {
            Languages::List(list) => list.iter().map(|s| s.trim()).collect(),
            Languages::Csv(csv) => csv.split(',').map(str::trim).collect(),
        }
    }
}

/// Output text format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
    Html,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 3] = [OutputFormat::Markdown, OutputFormat::Json, OutputFormat::Html];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::Html => "html",
        }
    }

    /// Exact match against the recognized names
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|format| format.as_str() == value)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated, defaulted options for a single conversion
///
/// Not `Clone`: each request moves its options into the executor.
#[derive(Debug, PartialEq, Eq)]
pub struct ConversionOptions {
    pub force_ocr: bool,
    pub paginate_output: bool,
    /// Never empty
    pub languages: Vec<String>,
    pub output_format: OutputFormat,
}

impl ConversionOptions {
    /// Build options from a request, applying defaults.
    ///
    /// An empty or missing language list falls back to `default_languages`.
    pub fn build(
        request: &ConvertRequest,
        default_languages: &[String],
    ) -> Result<Self, ServiceError> {
        let output_format = match request.output_format.as_deref() {
            None => OutputFormat::default(),
            Some(value) => OutputFormat::parse(value).ok_or_else(|| {
                ServiceError::InvalidInput(format!(
                    "invalid output_format {:?}: must be one of markdown, json, html",
                    value
                ))
            })?,
        };

        let mut languages: Vec<String> = Vec::new();
        if let Some(requested) = &request.languages {
            for code in requested.codes() {
                if code.is_empty() {
                    continue;
                }
                validate_language(code)?;
                if !languages.iter().any(|existing| existing == code) {
                    languages.push(code.to_string());
                }
            }
        }

        if languages.is_empty() {
            languages = default_languages.to_vec();
        }

        Ok(Self {
            force_ocr: request.force_ocr,
            paginate_output: request.paginate_output,
            languages,
            output_format,
        })
    }
}

fn validate_language(code: &str) -> Result<(), ServiceError> {
    let valid = code.len() <= MAX_LANGUAGE_CODE_LEN
        && code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!(
            "invalid languages entry {:?}",
            code
        )))
    }
}
