//! Application state for the RAG server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::RagChain;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// RAG chain, absent when initialization failed
    chain: Option<Arc<RagChain>>,
    /// Why the chain could not be built
    init_error: Option<String>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Build the chain from configuration
    ///
    /// Never fails: a chain that cannot be built leaves the service running
    /// but not ready, and chat requests are refused with 503.
    pub async fn new(config: RagConfig) -> Self {
        tracing::info!(
            "Initializing RAG application state (backend: {:?})...",
            config.backend
        );

        match RagChain::from_config(&config).await {
            Ok(chain) => {
                tracing::info!("Service ready");
                Self::with_chain(config, chain)
            }
            Err(e) => {
                tracing::error!("Failed to initialize RAG chain: {}", e);
                Self::unavailable(config, e.to_string())
            }
        }
    }

    /// State around an already built chain
    pub fn with_chain(config: RagConfig, chain: RagChain) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                chain: Some(Arc::new(chain)),
                init_error: None,
                ready: RwLock::new(true),
            }),
        }
    }

    /// State without a chain
    pub fn unavailable(config: RagConfig, reason: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                chain: None,
                init_error: Some(reason.into()),
                ready: RwLock::new(false),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// The chain, or a 503-mapped error when it is not available
    pub fn chain(&self) -> Result<Arc<RagChain>> {
        match (&self.inner.chain, self.is_ready()) {
            (Some(chain), true) => Ok(Arc::clone(chain)),
            _ => Err(Error::config(format!(
                "RAG chain not initialized: {}",
                self.inner
                    .init_error
                    .as_deref()
                    .unwrap_or("service is not ready")
            ))),
        }
    }

    /// Initialization failure, if any
    pub fn init_error(&self) -> Option<&str> {
        self.inner.init_error.as_deref()
    }

    /// Check if ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready && self.inner.chain.is_some();
    }
}
