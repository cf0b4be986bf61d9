//! Client factory for per-call client construction
//!
//! Command actions build a fresh client bound to the resolved host for every
//! invocation. The factory is injected so tests can substitute mock clients.

use crate::client::{LiquidCheckClient, LiquidCheckHttpClient, DEFAULT_TIMEOUT};
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;

/// Creates clients bound to a single device host
pub trait ClientFactory: Send + Sync {
    /// Create a client for `host`
    fn create_client(&self, host: &str) -> Result<Arc<dyn LiquidCheckClient>>;
}

/// Factory producing [`LiquidCheckHttpClient`]s
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    timeout: Duration,
}

impl Default for HttpClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientFactory {
    /// Factory using the default 10 second timeout
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Factory using a custom per-request timeout
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl ClientFactory for HttpClientFactory {
    fn create_client(&self, host: &str) -> Result<Arc<dyn LiquidCheckClient>> {
        let client: Arc<dyn LiquidCheckClient> =
            Arc::new(LiquidCheckHttpClient::with_timeout(host, self.timeout)?);
        Ok(client)
    }
}
