//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::convert::ConversionExecutor;
use crate::extractor::Extractor;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    executor: ConversionExecutor,
}

impl AppState {
    /// Create state around an extractor, sized by `config.conversion`
    pub fn new(config: Config, extractor: Arc<dyn Extractor>) -> Self {
        let executor = ConversionExecutor::new(extractor, &config.conversion);
        Self::with_executor(config, executor)
    }

    /// Create state with a preconfigured executor
    pub fn with_executor(config: Config, executor: ConversionExecutor) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, executor }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the conversion executor
    pub fn executor(&self) -> &ConversionExecutor {
        &self.inner.executor
    }

    /// Stop accepting conversions
    pub fn shutdown(&self) {
        self.inner.executor.shutdown();
        tracing::info!(stats = ?self.inner.executor.stats(), "Conversion executor closed");
    }
}
