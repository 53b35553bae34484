//! OCR Providers
//!
//! Defines the provider trait and implementations for different OCR backends.

use async_trait::async_trait;

use super::types::{OcrError, OcrProvider, OcrResult};

/// OCR provider trait
#[async_trait]
pub trait OcrProviderTrait: Send + Sync {
    /// Get the provider type
    fn provider_type(&self) -> OcrProvider;

    /// Check if the provider is available
    async fn is_available(&self) -> bool;

    /// Perform OCR on an encoded page image
    async fn recognize(&self, image_data: &[u8], languages: &[String]) -> Result<OcrResult, OcrError>;
}

/// Tesseract OCR provider
#[cfg(feature = "ocr-tesseract")]
pub struct TesseractProvider;

#[cfg(feature = "ocr-tesseract")]
impl TesseractProvider {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "ocr-tesseract")]
impl Default for TesseractProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "ocr-tesseract")]
#[async_trait]
impl OcrProviderTrait for TesseractProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Tesseract
    }

    async fn is_available(&self) -> bool {
        tokio::process::Command::new("tesseract")
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn recognize(&self, image_data: &[u8], languages: &[String]) -> Result<OcrResult, OcrError> {
        // Tesseract combines languages with '+', e.g. "eng+fra"
        let lang = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages
                .iter()
                .map(|code| tesseract_language(code))
                .collect::<Vec<_>>()
                .join("+")
        };

        let temp_dir = std::env::temp_dir();
        let input_path = temp_dir.join(format!("ocr_input_{}.png", uuid::Uuid::new_v4()));
        let output_path = temp_dir.join(format!("ocr_output_{}", uuid::Uuid::new_v4()));

        tokio::fs::write(&input_path, image_data)
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to write temp file: {}", e)))?;

        let output = tokio::process::Command::new("tesseract")
            .arg(&input_path)
            .arg(&output_path)
            .arg("-l")
            .arg(&lang)
            .arg("--oem")
            .arg("3")
            .arg("--psm")
            .arg("3")
            .kill_on_drop(true)
            .output()
            .await;

        let _ = tokio::fs::remove_file(&input_path).await;

        let output =
            output.map_err(|e| OcrError::ProcessingError(format!("Failed to run tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::ProcessingError(format!(
                "Tesseract failed: {}",
                stderr
            )));
        }

        let output_file = format!("{}.txt", output_path.display());
        let text = tokio::fs::read_to_string(&output_file)
            .await
            .map_err(|e| OcrError::ProcessingError(format!("Failed to read output: {}", e)))?;

        let _ = tokio::fs::remove_file(&output_file).await;

        Ok(OcrResult {
            text: text.trim().to_string(),
            confidence: 80.0, // Tesseract CLI plain-text mode reports no confidence
            provider: OcrProvider::Tesseract,
        })
    }
}

/// Map two-letter ISO 639-1 codes to Tesseract traineddata names; other codes pass through
#[cfg(feature = "ocr-tesseract")]
fn tesseract_language(code: &str) -> &str {
    match code {
        "en" => "eng",
        "de" => "deu",
        "fr" => "fra",
        "es" => "spa",
        "it" => "ita",
        "pt" => "por",
        "nl" => "nld",
        "ru" => "rus",
        "zh" => "chi_sim",
        "ja" => "jpn",
        "ko" => "kor",
        "ar" => "ara",
        other => other,
    }
}

/// Ollama vision model provider
pub struct OllamaProvider {
    client: reqwest::Client,
    /// Ollama API URL
    base_url: String,
    /// Model name (e.g., "llava", "bakllava")
    model: String,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    fn prompt(languages: &[String]) -> String {
        let lang_hint = if languages.is_empty() {
            String::new()
        } else {
            format!(" The text is in {}.", languages.join(", "))
        };

        format!(
            "Extract all text from this image exactly as written.{} Return only the extracted text, nothing else.",
            lang_hint
        )
    }
}

#[async_trait]
impl OcrProviderTrait for OllamaProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);

        let probe = self
            .client
            .get(&url)
            .timeout(std::time::Duration::from_secs(2))
            .send()
            .await;

        match probe {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn recognize(&self, image_data: &[u8], languages: &[String]) -> Result<OcrResult, OcrError> {
        use base64::Engine;

        let url = format!("{}/api/generate", self.base_url);
        let image_base64 = base64::engine::general_purpose::STANDARD.encode(image_data);

        let request = serde_json::json!({
            "model": self.model,
            "prompt": Self::prompt(languages),
            "images": [image_base64],
            "stream": false
        });

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to call Ollama: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::ApiError(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| OcrError::ApiError(format!("Failed to parse response: {}", e)))?;

        let text = result["response"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(OcrResult {
            text,
            confidence: 75.0, // LLMs don't provide confidence scores
            provider: OcrProvider::Ollama,
        })
    }
}

/// Mock provider for testing
#[cfg(test)]
pub struct MockProvider {
    pub response: Result<OcrResult, String>,
    pub available: bool,
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for MockProvider {
    fn provider_type(&self) -> OcrProvider {
        match &self.response {
            Ok(result) => result.provider,
            Err(_) => OcrProvider::Ollama,
        }
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn recognize(&self, _image_data: &[u8], _languages: &[String]) -> Result<OcrResult, OcrError> {
        self.response.clone().map_err(OcrError::ProcessingError)
    }
}

/// Always-available provider that counts probes and calls
#[cfg(test)]
#[derive(Default)]
pub struct CountingProvider {
    pub probes: std::sync::atomic::AtomicUsize,
    pub calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
#[async_trait]
impl OcrProviderTrait for CountingProvider {
    fn provider_type(&self) -> OcrProvider {
        OcrProvider::Ollama
    }

    async fn is_available(&self) -> bool {
        self.probes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        true
    }

    async fn recognize(&self, _image_data: &[u8], _languages: &[String]) -> Result<OcrResult, OcrError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(OcrResult {
            text: "counted".to_string(),
            confidence: 75.0,
            provider: OcrProvider::Ollama,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_prompt_language_hint() {
        let prompt = OllamaProvider::prompt(&["en".to_string(), "de".to_string()]);
        assert!(prompt.contains("The text is in en, de."));

        let prompt = OllamaProvider::prompt(&[]);
        assert!(!prompt.contains("The text is in"));
    }

    #[test]
    fn test_ollama_trims_base_url() {
        let provider = OllamaProvider::new("http://ocr:11434/", "llava");
        assert_eq!(provider.base_url, "http://ocr:11434");
    }

    #[cfg(feature = "ocr-tesseract")]
    #[test]
    fn test_tesseract_language_names() {
        assert_eq!(tesseract_language("en"), "eng");
        assert_eq!(tesseract_language("chi_tra"), "chi_tra");
    }

    #[tokio::test]
    async fn test_ollama_unreachable_is_unavailable() {
        // Port 9 (discard) is closed on test machines
        let provider = OllamaProvider::new("http://127.0.0.1:9", "llava");
        assert!(!provider.is_available().await);
    }
}
