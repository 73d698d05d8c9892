//! Collaborator interfaces consumed by the router, plus in-process implementations.
//!
//! Everything that talks to the network (pool indexes, quoter contracts, gas oracles,
//! simulation backends, remote caches) sits behind one of these traits so the routing core
//! stays a pure function of what they return.

pub mod gas_price;
pub mod pool_store;
pub mod route_cache;
pub mod simulation;
pub mod token_validator;
pub mod v2_quote;

use std::collections::HashMap;

use alloy_primitives::Address;
use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::debug;

use crate::config::QuoteRetryOptions;
use crate::error::RouterError;
use crate::models::cache::{CacheMode, CachedRoutes};
use crate::models::pool::{Pool, V2Pair, V3Pool};
use crate::models::protocol::Protocol;
use crate::models::route::Route;
use crate::models::swap::{SwapOptions, SwapRoute};
use crate::models::token::{Token, TokenAmount, TradeType};

/// Per-call options shared by every collaborator within one `route()` invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub block_number: Option<u64>,
    pub retry: Option<QuoteRetryOptions>,
}

#[async_trait]
pub trait BlockNumberProvider: Send + Sync {
    async fn get_block_number(&self) -> Result<u64, RouterError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPrice {
    pub gas_price_wei: BigUint,
}

#[async_trait]
pub trait GasPriceProvider: Send + Sync {
    async fn get_gas_price(&self) -> Result<GasPrice, RouterError>;
}

/// Index entry for a pool, ranked by TVL during candidate selection.
#[derive(Debug, Clone, PartialEq)]
pub struct SubgraphPool {
    /// Lowercase hex pool address.
    pub id: String,
    pub protocol: Protocol,
    pub token0: Address,
    pub token1: Address,
    pub fee_tier: Option<u32>,
    pub tvl_usd: f64,
}

impl SubgraphPool {
    pub fn involves(&self, token: &Address) -> bool {
        self.token0 == *token || self.token1 == *token
    }

    pub fn other(&self, token: &Address) -> Option<Address> {
        if self.token0 == *token {
            Some(self.token1)
        } else if self.token1 == *token {
            Some(self.token0)
        } else {
            None
        }
    }
}

#[async_trait]
pub trait CandidatePoolSource: Send + Sync {
    async fn get_candidate_pools(
        &self,
        protocol: Protocol,
        token_in: &Token,
        token_out: &Token,
        config: &ProviderConfig,
    ) -> Result<Vec<SubgraphPool>, RouterError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PoolKey {
    V2 { token_a: Token, token_b: Token },
    V3 { token_a: Token, token_b: Token, fee: u32 },
}

/// Resolved pool set returned by a pool provider.
#[derive(Debug, Clone, Default)]
pub struct PoolAccessor {
    pools: HashMap<Address, Pool>,
}

impl PoolAccessor {
    pub fn new(pools: impl IntoIterator<Item = Pool>) -> Self {
        Self {
            pools: pools.into_iter().map(|pool| (pool.address(), pool)).collect(),
        }
    }

    /// Pools ordered by address so enumeration is deterministic.
    pub fn get_all_pools(&self) -> Vec<Pool> {
        let mut pools = self.pools.values().cloned().collect::<Vec<_>>();
        pools.sort_by_key(Pool::address);
        pools
    }

    pub fn get_pool_by_address(&self, address: &Address) -> Option<&Pool> {
        self.pools.get(address)
    }

    pub fn get_v3_pool(&self, token_a: &Token, token_b: &Token, fee: u32) -> Option<&V3Pool> {
        self.pools.values().filter_map(Pool::as_v3).find(|pool| {
            pool.fee == fee
                && ((pool.token0 == *token_a && pool.token1 == *token_b)
                    || (pool.token0 == *token_b && pool.token1 == *token_a))
        })
    }

    pub fn get_v2_pair(&self, token_a: &Token, token_b: &Token) -> Option<&V2Pair> {
        self.pools.values().filter_map(Pool::as_v2).find(|pair| {
            (pair.token0 == *token_a && pair.token1 == *token_b)
                || (pair.token0 == *token_b && pair.token1 == *token_a)
        })
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

#[async_trait]
pub trait PoolProvider: Send + Sync {
    async fn get_pools(
        &self,
        keys: &[PoolKey],
        config: &ProviderConfig,
    ) -> Result<PoolAccessor, RouterError>;
}

/// Result of quoting one amount along one route. `None` fields mean the quoter failed for
/// this pair; the record is dropped rather than failing the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountQuote {
    pub amount: BigUint,
    pub quote: Option<BigUint>,
    pub sqrt_price_x96_after_list: Option<Vec<BigUint>>,
    pub initialized_ticks_crossed_list: Option<Vec<u32>>,
    pub gas_estimate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuotes {
    pub route: Route,
    pub quotes: Vec<AmountQuote>,
}

/// Batched quoter-contract calls; one call covers every route and amount.
#[async_trait]
pub trait OnChainQuoteProvider: Send + Sync {
    async fn get_quotes_many_exact_in(
        &self,
        amounts: &[BigUint],
        routes: &[Route],
        config: &ProviderConfig,
    ) -> Result<Vec<RouteQuotes>, RouterError>;

    async fn get_quotes_many_exact_out(
        &self,
        amounts: &[BigUint],
        routes: &[Route],
        config: &ProviderConfig,
    ) -> Result<Vec<RouteQuotes>, RouterError>;

    async fn get_quotes_many(
        &self,
        trade_type: TradeType,
        amounts: &[BigUint],
        routes: &[Route],
        config: &ProviderConfig,
    ) -> Result<Vec<RouteQuotes>, RouterError> {
        match trade_type {
            TradeType::ExactInput => self.get_quotes_many_exact_in(amounts, routes, config).await,
            TradeType::ExactOutput => self.get_quotes_many_exact_out(amounts, routes, config).await,
        }
    }
}

/// V2 quotes computed from pool reserves without a network round trip.
pub trait V2QuoteProvider: Send + Sync {
    fn get_quotes_many(
        &self,
        trade_type: TradeType,
        amounts: &[BigUint],
        routes: &[Route],
    ) -> Result<Vec<RouteQuotes>, RouterError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenValidationResult {
    Unknown,
    /// Fee on transfer.
    Fot,
    /// Safe transfer fails.
    Stf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenValidationResults {
    results: HashMap<Address, TokenValidationResult>,
}

impl TokenValidationResults {
    pub fn new(results: HashMap<Address, TokenValidationResult>) -> Self {
        Self { results }
    }

    pub fn get(&self, token: &Address) -> Option<TokenValidationResult> {
        self.results.get(token).copied()
    }

    pub fn insert(&mut self, token: Address, result: TokenValidationResult) {
        self.results.insert(token, result);
    }

    /// Fee-on-transfer and unsafe-transfer tokens may only sit at the ends of a route.
    pub fn blocks_intermediate(&self, token: &Token, token_in: &Token, token_out: &Token) -> bool {
        if token == token_in || token == token_out {
            return false;
        }
        matches!(
            self.get(&token.address),
            Some(TokenValidationResult::Fot) | Some(TokenValidationResult::Stf)
        )
    }

    /// Drops pools that would route through a flagged token.
    pub fn filter_pools(&self, pools: Vec<Pool>, token_in: &Token, token_out: &Token) -> Vec<Pool> {
        pools
            .into_iter()
            .filter(|pool| {
                let blocked = [pool.token0(), pool.token1()]
                    .into_iter()
                    .find(|token| self.blocks_intermediate(token, token_in, token_out));
                if let Some(token) = blocked {
                    debug!(
                        pool = %format!("{:#x}", pool.address()),
                        token = %token,
                        "Dropping pool with flagged intermediate token"
                    );
                    return false;
                }
                true
            })
            .collect()
    }
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    async fn validate_tokens(
        &self,
        tokens: &[Token],
        config: &ProviderConfig,
    ) -> Result<TokenValidationResults, RouterError>;
}

/// Storage backend for route bundles. Implementors supply the four primitive operations;
/// the provided methods apply mode gating and expiry.
#[async_trait]
pub trait RouteCachingProvider: Send + Sync {
    async fn get_cache_mode(
        &self,
        chain_id: u64,
        amount: &TokenAmount,
        quote_token: &Token,
        trade_type: TradeType,
        protocols: &[Protocol],
    ) -> CacheMode;

    async fn fetch_cached_route(
        &self,
        chain_id: u64,
        amount: &TokenAmount,
        quote_token: &Token,
        trade_type: TradeType,
        protocols: &[Protocol],
    ) -> Result<Option<CachedRoutes>, RouterError>;

    async fn store_cached_route(
        &self,
        cached_routes: CachedRoutes,
        amount: &TokenAmount,
    ) -> Result<bool, RouterError>;

    async fn blocks_to_live(&self, cached_routes: &CachedRoutes, amount: &TokenAmount) -> u64;

    async fn get_cached_route(
        &self,
        chain_id: u64,
        amount: &TokenAmount,
        quote_token: &Token,
        trade_type: TradeType,
        protocols: &[Protocol],
        block_number: u64,
    ) -> Result<Option<CachedRoutes>, RouterError> {
        let mode = self
            .get_cache_mode(chain_id, amount, quote_token, trade_type, protocols)
            .await;
        if mode == CacheMode::Darkmode {
            return Ok(None);
        }
        let cached = self
            .fetch_cached_route(chain_id, amount, quote_token, trade_type, protocols)
            .await?;
        Ok(cached.filter(|bundle| bundle.not_expired(block_number)))
    }

    async fn set_cached_route(
        &self,
        mut cached_routes: CachedRoutes,
        amount: &TokenAmount,
    ) -> Result<bool, RouterError> {
        let quote_token = match cached_routes.trade_type {
            TradeType::ExactInput => cached_routes.token_out.clone(),
            TradeType::ExactOutput => cached_routes.token_in.clone(),
        };
        let mode = self
            .get_cache_mode(
                cached_routes.chain_id,
                amount,
                &quote_token,
                cached_routes.trade_type,
                &cached_routes.protocols_covered,
            )
            .await;
        if mode == CacheMode::Darkmode {
            return Ok(false);
        }
        cached_routes.blocks_to_live = self.blocks_to_live(&cached_routes, amount).await;
        self.store_cached_route(cached_routes, amount).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum L2GasData {
    Optimism {
        l1_base_fee: BigUint,
        scalar: BigUint,
        decimals: u32,
        overhead: BigUint,
    },
    Arbitrum {
        per_l2_tx_fee: BigUint,
        per_l1_calldata_fee: BigUint,
    },
}

#[async_trait]
pub trait L2GasDataProvider: Send + Sync {
    async fn get_gas_data(&self) -> Result<L2GasData, RouterError>;
}

#[async_trait]
pub trait Simulator: Send + Sync {
    /// Returns the route with `simulation_status` set; backend failures become a status,
    /// not an error.
    #[allow(clippy::too_many_arguments)]
    async fn simulate(
        &self,
        from_address: Address,
        swap_options: &SwapOptions,
        swap_route: SwapRoute,
        amount: &TokenAmount,
        quote: &TokenAmount,
        l2_gas_data: Option<&L2GasData>,
        config: &ProviderConfig,
    ) -> Result<SwapRoute, RouterError>;
}
