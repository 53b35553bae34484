//! Configuration management for PDF Parser Server

use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::ocr::OcrProvider;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub conversion: ConversionConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Tokio worker threads; `None` keeps the runtime default
    pub worker_threads: Option<usize>,
    /// Upper bound on the JSON request body (base64 inflates PDFs by ~4/3)
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct ConversionConfig {
    /// Conversions allowed to run at the same time
    pub max_concurrent: usize,
    /// Requests allowed to wait for a slot before new ones are rejected
    pub queue_depth: usize,
    /// Per-request deadline, kept below the 600s outer limit of the deployment
    pub timeout_secs: u64,
    pub default_languages: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Provider preference order
    pub providers: Vec<OcrProvider>,
    pub ollama_url: String,
    pub ollama_model: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                worker_threads: None,
                max_body_bytes: 100 * 1024 * 1024,
            },
            conversion: ConversionConfig {
                max_concurrent: 2,
                queue_depth: 16,
                timeout_secs: 550,
                default_languages: vec!["en".to_string()],
            },
            ocr: OcrConfig {
                providers: vec![OcrProvider::Tesseract, OcrProvider::Ollama],
                ollama_url: "http://localhost:11434".to_string(),
                ollama_model: "llava".to_string(),
            },
        }
    }
}

impl Config {
    /// Load from the process environment
    ///
    /// Each variable is parsed on its own: a malformed value is logged and
    /// replaced by its default without affecting the other settings.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let var = |key: &'static str| lookup(key).map(|raw| (key, raw));

        let worker_threads = var("WORKER_THREADS").and_then(|(key, raw)| {
            or_default(
                parse_value::<usize>(key, &raw).and_then(|n| positive(key, n)).map(Some),
                None,
            )
        });

        Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: setting(var("SERVER_PORT"), defaults.server.port, parse_value),
                worker_threads,
                max_body_bytes: setting(
                    var("MAX_REQUEST_BYTES"),
                    defaults.server.max_body_bytes,
                    |key, raw| parse_value::<usize>(key, raw).and_then(|n| positive(key, n)),
                ),
            },
            conversion: ConversionConfig {
                max_concurrent: setting(
                    var("MAX_CONCURRENT_CONVERSIONS"),
                    defaults.conversion.max_concurrent,
                    |key, raw| parse_value::<usize>(key, raw).and_then(|n| positive(key, n)),
                ),
                queue_depth: setting(
                    var("CONVERSION_QUEUE_DEPTH"),
                    defaults.conversion.queue_depth,
                    parse_value,
                ),
                timeout_secs: setting(
                    var("CONVERSION_TIMEOUT_SECS"),
                    defaults.conversion.timeout_secs,
                    |key, raw| parse_value::<u64>(key, raw).and_then(|n| positive(key, n)),
                ),
                default_languages: setting(
                    var("DEFAULT_LANGUAGES"),
                    defaults.conversion.default_languages,
                    parse_list,
                ),
            },
            ocr: OcrConfig {
                providers: setting(var("OCR_PROVIDERS"), defaults.ocr.providers, |key, raw| {
                    parse_list(key, raw)?
                        .iter()
                        .map(|name| parse_value(key, name))
                        .collect()
                }),
                ollama_url: lookup("OLLAMA_URL").unwrap_or(defaults.ocr.ollama_url),
                ollama_model: lookup("OLLAMA_MODEL").unwrap_or(defaults.ocr.ollama_model),
            },
        }
    }
}

/// Parse a present variable, falling back to `default` when it is absent or invalid
fn setting<T>(
    var: Option<(&'static str, String)>,
    default: T,
    parse: impl FnOnce(&'static str, &str) -> Result<T, ConfigError>,
) -> T {
    match var {
        Some((key, raw)) => or_default(parse(key, &raw), default),
        None => default,
    }
}

fn or_default<T>(parsed: Result<T, ConfigError>, default: T) -> T {
    parsed.unwrap_or_else(|e| {
        tracing::warn!("{}, using default", e);
        default
    })
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: raw.to_string(),
    })
}

fn positive<T: PartialOrd + Default + ToString>(key: &'static str, value: T) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        })
    }
}

/// Split a comma-separated variable, rejecting an empty list
fn parse_list(key: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let items: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
        });
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.conversion.timeout_secs, 550);
        assert!(config.conversion.timeout_secs < 600);
        assert_eq!(config.conversion.default_languages, vec!["en"]);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_bad_variable_keeps_other_settings() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "9000"),
            ("OCR_PROVIDERS", "tesseract,olama"),
            ("MAX_CONCURRENT_CONVERSIONS", "0"),
            ("CONVERSION_QUEUE_DEPTH", "4"),
            ("DEFAULT_LANGUAGES", "de, fr"),
        ]));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.ocr.providers, Config::default().ocr.providers);
        assert_eq!(config.conversion.max_concurrent, 2);
        assert_eq!(config.conversion.queue_depth, 4);
        assert_eq!(config.conversion.default_languages, vec!["de", "fr"]);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_HOST", "127.0.0.1"),
            ("WORKER_THREADS", "4"),
            ("CONVERSION_TIMEOUT_SECS", "120"),
            ("OCR_PROVIDERS", "ollama"),
            ("OLLAMA_MODEL", "llama3.2-vision"),
        ]));

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.worker_threads, Some(4));
        assert_eq!(config.conversion.timeout_secs, 120);
        assert_eq!(config.ocr.providers, vec![OcrProvider::Ollama]);
        assert_eq!(config.ocr.ollama_model, "llama3.2-vision");

        let config = Config::from_lookup(lookup(&[("WORKER_THREADS", "zero")]));
        assert_eq!(config.server.worker_threads, None);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("K", "en, fr ,,de").unwrap(), vec!["en", "fr", "de"]);
        assert!(parse_list("K", " , ").is_err());
    }

    #[test]
    fn test_positive() {
        assert_eq!(positive("K", 3usize).unwrap(), 3);
        assert!(matches!(
            positive("MAX_CONCURRENT_CONVERSIONS", 0usize),
            Err(ConfigError::Invalid { key: "MAX_CONCURRENT_CONVERSIONS", .. })
        ));
    }

    #[test]
    fn test_parse_value_rejects_garbage() {
        assert!(parse_value::<u16>("SERVER_PORT", "eighty").is_err());
        assert_eq!(parse_value::<u16>("SERVER_PORT", " 8080 ").unwrap(), 8080);
        assert_eq!(
            parse_value::<OcrProvider>("OCR_PROVIDERS", "Ollama").unwrap(),
            OcrProvider::Ollama
        );
    }
}
