use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::error::RouterError;

use super::{GasPrice, GasPriceProvider};

/// Reuses the inner provider's answer until `ttl` elapses.
pub struct CachingGasPriceProvider {
    inner: Arc<dyn GasPriceProvider>,
    ttl: Duration,
    cached: Mutex<Option<(GasPrice, Instant)>>,
}

impl CachingGasPriceProvider {
    pub fn new(inner: Arc<dyn GasPriceProvider>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl GasPriceProvider for CachingGasPriceProvider {
    async fn get_gas_price(&self) -> Result<GasPrice, RouterError> {
        // Held across the fetch so concurrent misses share one upstream call.
        let mut guard = self.cached.lock().await;
        if let Some((price, fetched_at)) = guard.as_ref() {
            if fetched_at.elapsed() < self.ttl {
                return Ok(price.clone());
            }
        }
        let price = self.inner.get_gas_price().await?;
        debug!(gas_price_wei = %price.gas_price_wei, "Gas price refreshed");
        *guard = Some((price.clone(), Instant::now()));
        Ok(price)
    }
}
