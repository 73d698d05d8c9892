pub mod chains;
mod logging;
pub mod routing;

use std::env;
use std::time::Duration;

pub use chains::{ChainTable, ChainTuning, GasHeuristics, L1FeeKind, QuoteRetryOptions};
pub use logging::{init_logging, init_logging_with, LogFormat};
pub use routing::{PoolSelection, RoutingConfig, RoutingConfigOverrides};

use crate::models::cache::CacheMode;

/// Block-number fetch retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRetryConfig {
    pub retries: usize,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for BlockRetryConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            min_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(1000),
        }
    }
}

/// Process-level settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterSettings {
    pub cache_mode: CacheMode,
    /// Blocks a stored bundle stays replayable. Zero allows reuse only within the same block.
    pub cache_blocks_to_live: u64,
    pub gas_price_cache_ttl: Duration,
    pub token_validation_timeout: Duration,
    pub block_retry: BlockRetryConfig,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            cache_mode: CacheMode::Darkmode,
            cache_blocks_to_live: 0,
            gas_price_cache_ttl: Duration::from_secs(15),
            token_validation_timeout: Duration::from_millis(2000),
            block_retry: BlockRetryConfig::default(),
        }
    }
}

impl RouterSettings {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let cache_mode = match env::var("ROUTE_CACHE_MODE") {
            Ok(value) => value
                .parse::<CacheMode>()
                .unwrap_or_else(|err| panic!("Invalid ROUTE_CACHE_MODE: {err}")),
            Err(env::VarError::NotPresent) => CacheMode::Darkmode,
            Err(err) => panic!("Failed reading ROUTE_CACHE_MODE: {err}"),
        };

        let gas_price_cache_ttl_secs = parse_env_u64("GAS_PRICE_CACHE_TTL_SECS", 15);
        let token_validation_timeout_ms = parse_env_u64("TOKEN_VALIDATION_TIMEOUT_MS", 2000);
        let min_backoff_ms = parse_env_u64("BLOCK_NUMBER_MIN_BACKOFF_MS", 100);
        let max_backoff_ms = parse_env_u64("BLOCK_NUMBER_MAX_BACKOFF_MS", 1000);

        assert!(
            token_validation_timeout_ms > 0,
            "TOKEN_VALIDATION_TIMEOUT_MS must be > 0"
        );
        assert!(
            max_backoff_ms >= min_backoff_ms,
            "BLOCK_NUMBER_MAX_BACKOFF_MS must be >= BLOCK_NUMBER_MIN_BACKOFF_MS"
        );

        Self {
            cache_mode,
            cache_blocks_to_live: parse_env_u64("ROUTE_CACHE_BLOCKS_TO_LIVE", 0),
            gas_price_cache_ttl: Duration::from_secs(gas_price_cache_ttl_secs),
            token_validation_timeout: Duration::from_millis(token_validation_timeout_ms),
            block_retry: BlockRetryConfig {
                retries: parse_env_usize("BLOCK_NUMBER_RETRIES", 2),
                min_backoff: Duration::from_millis(min_backoff_ms),
                max_backoff: Duration::from_millis(max_backoff_ms),
            },
        }
    }
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| panic!("Invalid {key}")),
        Err(env::VarError::NotPresent) => default,
        Err(err) => panic!("Failed reading {key}: {err}"),
    }
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    match env::var(key) {
        Ok(value) => value.parse().unwrap_or_else(|_| panic!("Invalid {key}")),
        Err(env::VarError::NotPresent) => default,
        Err(err) => panic!("Failed reading {key}: {err}"),
    }
}
