use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::RouterError;
use crate::models::token::Token;

use super::{ProviderConfig, TokenValidationResult, TokenValidationResults, TokenValidator};

/// In-memory cache of token classifications. Misses are resolved through the wrapped
/// validator under a single refresh lock with a bounded wait.
pub struct CachingTokenValidator {
    results: RwLock<HashMap<Address, TokenValidationResult>>,
    refresh_lock: Mutex<()>,
    inner: Arc<dyn TokenValidator>,
    refresh_timeout: Duration,
}

impl CachingTokenValidator {
    pub fn new(inner: Arc<dyn TokenValidator>, refresh_timeout: Duration) -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
            inner,
            refresh_timeout,
        }
    }

    pub async fn cached(&self, address: &Address) -> Option<TokenValidationResult> {
        self.results.read().await.get(address).copied()
    }

    async fn missing(&self, tokens: &[Token]) -> Vec<Token> {
        let guard = self.results.read().await;
        tokens
            .iter()
            .filter(|token| !guard.contains_key(&token.address))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TokenValidator for CachingTokenValidator {
    async fn validate_tokens(
        &self,
        tokens: &[Token],
        config: &ProviderConfig,
    ) -> Result<TokenValidationResults, RouterError> {
        if !self.missing(tokens).await.is_empty() {
            let guard = self.refresh_lock.lock().await;
            // Another caller may have filled the gap while we waited.
            let missing = self.missing(tokens).await;
            if !missing.is_empty() {
                let start = Instant::now();
                match timeout(
                    self.refresh_timeout,
                    self.inner.validate_tokens(&missing, config),
                )
                .await
                {
                    Ok(Ok(fetched)) => {
                        let mut results = self.results.write().await;
                        for token in &missing {
                            let result = fetched
                                .get(&token.address)
                                .unwrap_or(TokenValidationResult::Unknown);
                            results.insert(token.address, result);
                        }
                        info!(
                            duration_ms = start.elapsed().as_millis() as u64,
                            validated = missing.len(),
                            "Token validation cache refreshed"
                        );
                    }
                    Ok(Err(err)) => {
                        warn!(error = %err, tokens = missing.len(), "Token validation failed; treating tokens as unknown");
                    }
                    Err(_) => {
                        warn!(
                            scope = "token_validation_timeout",
                            timeout_ms = self.refresh_timeout.as_millis() as u64,
                            "Token validation timed out; treating tokens as unknown"
                        );
                    }
                }
            }
            drop(guard);
        }

        let guard = self.results.read().await;
        let mut results = TokenValidationResults::default();
        for token in tokens {
            let result = guard
                .get(&token.address)
                .copied()
                .unwrap_or(TokenValidationResult::Unknown);
            results.insert(token.address, result);
        }
        Ok(results)
    }
}
