use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RouterError;
use crate::models::cache::{CacheMode, CachedRoutes};
use crate::models::protocol::Protocol;
use crate::models::token::{Token, TokenAmount, TradeType};

use super::RouteCachingProvider;

/// Process-local route cache. Bundles are bucketed by the order of magnitude of the
/// requested amount so a route found for a small trade is not replayed for a huge one.
pub struct InMemoryRouteCache {
    mode: CacheMode,
    blocks_to_live: u64,
    entries: RwLock<HashMap<String, CachedRoutes>>,
}

impl InMemoryRouteCache {
    pub fn new(mode: CacheMode, blocks_to_live: u64) -> Self {
        Self {
            mode,
            blocks_to_live,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn amount_bucket(amount: &TokenAmount) -> usize {
    amount.raw.to_str_radix(10).len()
}

/// Keys are fully lowercased at construction.
pub fn cache_key(
    chain_id: u64,
    token_in: &Token,
    token_out: &Token,
    trade_type: TradeType,
    protocols: &[Protocol],
    bucket: usize,
) -> String {
    let protocols = Protocol::canonical_set(protocols)
        .iter()
        .map(|protocol| protocol.as_str().to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{}:{}:{}:{}:[{}]:{}",
        chain_id,
        token_in.key(),
        token_out.key(),
        trade_type.as_str().to_ascii_lowercase(),
        protocols,
        bucket
    )
}

fn pair_for(amount: &TokenAmount, quote_token: &Token, trade_type: TradeType) -> (Token, Token) {
    match trade_type {
        TradeType::ExactInput => (amount.token.clone(), quote_token.clone()),
        TradeType::ExactOutput => (quote_token.clone(), amount.token.clone()),
    }
}

#[async_trait]
impl RouteCachingProvider for InMemoryRouteCache {
    async fn get_cache_mode(
        &self,
        _chain_id: u64,
        _amount: &TokenAmount,
        _quote_token: &Token,
        _trade_type: TradeType,
        _protocols: &[Protocol],
    ) -> CacheMode {
        self.mode
    }

    async fn fetch_cached_route(
        &self,
        chain_id: u64,
        amount: &TokenAmount,
        quote_token: &Token,
        trade_type: TradeType,
        protocols: &[Protocol],
    ) -> Result<Option<CachedRoutes>, RouterError> {
        let (token_in, token_out) = pair_for(amount, quote_token, trade_type);
        let key = cache_key(
            chain_id,
            &token_in,
            &token_out,
            trade_type,
            protocols,
            amount_bucket(amount),
        );
        let found = self.entries.read().await.get(&key).cloned();
        debug!(key = %key, hit = found.is_some(), "Route cache lookup");
        Ok(found)
    }

    async fn store_cached_route(
        &self,
        cached_routes: CachedRoutes,
        amount: &TokenAmount,
    ) -> Result<bool, RouterError> {
        let key = cache_key(
            cached_routes.chain_id,
            &cached_routes.token_in,
            &cached_routes.token_out,
            cached_routes.trade_type,
            &cached_routes.protocols_covered,
            amount_bucket(amount),
        );
        self.entries.write().await.insert(key, cached_routes);
        Ok(true)
    }

    async fn blocks_to_live(&self, _cached_routes: &CachedRoutes, _amount: &TokenAmount) -> u64 {
        self.blocks_to_live
    }
}
