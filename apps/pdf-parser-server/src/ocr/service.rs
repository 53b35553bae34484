//! OCR Service
//!
//! Orchestrates OCR providers in preference order.

use std::sync::Arc;

use super::{
    provider::{OcrProviderTrait, OllamaProvider},
    types::{OcrError, OcrProvider, OcrResult},
};
use crate::config::OcrConfig;

/// OCR service for rasterized PDF pages
pub struct OcrService {
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrService {
    /// Create a new OCR service from configuration
    pub fn new(config: &OcrConfig) -> Self {
        let mut providers: Vec<Arc<dyn OcrProviderTrait>> = Vec::new();

        for provider in &config.providers {
            match provider {
                #[cfg(feature = "ocr-tesseract")]
                OcrProvider::Tesseract => {
                    providers.push(Arc::new(super::provider::TesseractProvider::new()));
                }
                #[cfg(not(feature = "ocr-tesseract"))]
                OcrProvider::Tesseract => {
                    tracing::debug!("Tesseract requested but ocr-tesseract feature is disabled");
                }
                OcrProvider::Ollama => {
                    providers.push(Arc::new(OllamaProvider::new(
                        &config.ollama_url,
                        &config.ollama_model,
                    )));
                }
            }
        }

        Self { providers }
    }

    /// Create a service from explicit providers
    pub fn with_providers(providers: Vec<Arc<dyn OcrProviderTrait>>) -> Self {
        Self { providers }
    }

    /// Whether any provider is configured at all (no availability check)
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Get available providers
    pub async fn available_providers(&self) -> Vec<OcrProvider> {
        let mut available = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                available.push(provider.provider_type());
            }
        }
        available
    }

    /// Probe every provider once and keep the reachable ones for a batch of pages
    pub async fn session(&self) -> OcrSession {
        let mut providers = Vec::new();
        for provider in &self.providers {
            if provider.is_available().await {
                providers.push(provider.clone());
            }
        }
        OcrSession { providers }
    }

    /// Perform OCR on a single page image, trying providers in order
    pub async fn recognize(
        &self,
        image_data: &[u8],
        languages: &[String],
    ) -> Result<OcrResult, OcrError> {
        self.session().await.recognize(image_data, languages).await
    }
}

/// Providers found reachable at the start of a conversion
pub struct OcrSession {
    providers: Vec<Arc<dyn OcrProviderTrait>>,
}

impl OcrSession {
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Recognize with the first provider that succeeds; no availability probes
    pub async fn recognize(
        &self,
        image_data: &[u8],
        languages: &[String],
    ) -> Result<OcrResult, OcrError> {
        let mut last_error = None;

        for provider in &self.providers {
            match provider.recognize(image_data, languages).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(
                        "OCR provider {} failed: {}, trying next",
                        provider.provider_type(),
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            OcrError::ProviderNotAvailable("No OCR providers available".to_string())
        }))
    }
}
