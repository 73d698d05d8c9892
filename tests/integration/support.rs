use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use smart_order_router::config::chains::MAINNET;
use smart_order_router::config::{ChainTable, ChainTuning, RouterSettings};
use smart_order_router::models::cache::{CacheMode, CachedRoutes};
use smart_order_router::models::pool::{q96, Pool, V2Pair, V3Pool};
use smart_order_router::models::protocol::Protocol;
use smart_order_router::models::route::Route;
use smart_order_router::models::token::{Token, TokenAmount, TradeType};
use smart_order_router::providers::pool_store::PoolStore;
use smart_order_router::providers::route_cache::InMemoryRouteCache;
use smart_order_router::providers::{
    AmountQuote, BlockNumberProvider, CandidatePoolSource, GasPrice, GasPriceProvider,
    OnChainQuoteProvider, ProviderConfig, RouteCachingProvider, RouteQuotes, SubgraphPool,
};
use smart_order_router::{AlphaRouter, RouterError, RouterProviders};

pub const BLOCK: u64 = 17_000_000;
const GAS_PER_HOP: u64 = 100_000;

pub fn ether(units: u64) -> BigUint {
    BigUint::from(units) * BigUint::from(10u64).pow(18)
}

pub fn mainnet() -> Arc<ChainTuning> {
    ChainTable::builtin().get(MAINNET).expect("mainnet")
}

pub fn usdc(chain: &ChainTuning) -> Token {
    chain.usd_tokens[0].clone()
}

pub fn weth(chain: &ChainTuning) -> Token {
    chain.wrapped_native.clone()
}

/// Unit-price V3 pool whose liquidity doubles as virtual reserves for the fake quoter.
pub fn v3_pool(byte: u8, a: &Token, b: &Token, fee: u32, liquidity: u128) -> Pool {
    let (token0, token1) = if a.sorts_before(b) { (a, b) } else { (b, a) };
    Pool::V3(V3Pool {
        address: Address::repeat_byte(byte),
        token0: token0.clone(),
        token1: token1.clone(),
        fee,
        sqrt_price_x96: q96(),
        liquidity,
        tick: 0,
    })
}

pub fn v2_pair(byte: u8, a: &Token, b: &Token, reserve: BigUint) -> Pool {
    let (token0, token1) = if a.sorts_before(b) { (a, b) } else { (b, a) };
    Pool::V2(V2Pair {
        address: Address::repeat_byte(byte),
        token0: token0.clone(),
        token1: token1.clone(),
        reserve0: reserve.clone(),
        reserve1: reserve,
    })
}

fn reserves(pool: &Pool) -> BigUint {
    match pool {
        Pool::V3(pool) => BigUint::from(pool.liquidity),
        Pool::V2(pair) => pair.reserve0.clone(),
    }
}

/// Constant-product output with no fee.
pub fn curve_out(reserve: &BigUint, amount_in: &BigUint) -> BigUint {
    reserve * amount_in / (reserve + amount_in)
}

/// Constant-product input with no fee, rounded up.
pub fn curve_in(reserve: &BigUint, amount_out: &BigUint) -> Option<BigUint> {
    if amount_out >= reserve {
        return None;
    }
    let numerator = reserve * amount_out;
    let denominator = reserve - amount_out;
    let quotient = &numerator / &denominator;
    if (&quotient * &denominator) == numerator {
        Some(quotient)
    } else {
        Some(quotient + BigUint::one())
    }
}

/// Quoter fake that treats every pool as a balanced constant-product curve.
#[derive(Default)]
pub struct CurveQuotes {
    calls: AtomicUsize,
}

impl CurveQuotes {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn quote(route: &Route, amount: &BigUint, trade_type: TradeType) -> AmountQuote {
        let hops = route.pools().len();
        let mut current = amount.clone();
        let mut ok = true;
        let pools: Vec<&Pool> = match trade_type {
            TradeType::ExactInput => route.pools().iter().collect(),
            TradeType::ExactOutput => route.pools().iter().rev().collect(),
        };
        for pool in pools {
            let reserve = reserves(pool);
            let next = match trade_type {
                TradeType::ExactInput => Some(curve_out(&reserve, &current)),
                TradeType::ExactOutput => curve_in(&reserve, &current),
            };
            match next {
                Some(value) if !value.is_zero() => current = value,
                _ => {
                    ok = false;
                    break;
                }
            }
        }
        if !ok {
            return AmountQuote {
                amount: amount.clone(),
                quote: None,
                sqrt_price_x96_after_list: None,
                initialized_ticks_crossed_list: None,
                gas_estimate: None,
            };
        }
        AmountQuote {
            amount: amount.clone(),
            quote: Some(current),
            sqrt_price_x96_after_list: Some(
                route
                    .pools()
                    .iter()
                    .map(|pool| match pool {
                        Pool::V3(pool) => pool.sqrt_price_x96.clone(),
                        Pool::V2(_) => q96(),
                    })
                    .collect(),
            ),
            initialized_ticks_crossed_list: Some(vec![1; hops]),
            gas_estimate: Some(GAS_PER_HOP * hops as u64),
        }
    }

    fn quote_all(&self, amounts: &[BigUint], routes: &[Route], trade_type: TradeType) -> Vec<RouteQuotes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        routes
            .iter()
            .map(|route| RouteQuotes {
                route: route.clone(),
                quotes: amounts
                    .iter()
                    .map(|amount| Self::quote(route, amount, trade_type))
                    .collect(),
            })
            .collect()
    }
}

#[async_trait]
impl OnChainQuoteProvider for CurveQuotes {
    async fn get_quotes_many_exact_in(
        &self,
        amounts: &[BigUint],
        routes: &[Route],
        _config: &ProviderConfig,
    ) -> Result<Vec<RouteQuotes>, RouterError> {
        Ok(self.quote_all(amounts, routes, TradeType::ExactInput))
    }

    async fn get_quotes_many_exact_out(
        &self,
        amounts: &[BigUint],
        routes: &[Route],
        _config: &ProviderConfig,
    ) -> Result<Vec<RouteQuotes>, RouterError> {
        Ok(self.quote_all(amounts, routes, TradeType::ExactOutput))
    }
}

/// Counts listing requests in front of the pool store.
pub struct CountingListing {
    inner: Arc<PoolStore>,
    calls: AtomicUsize,
}

impl CountingListing {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandidatePoolSource for CountingListing {
    async fn get_candidate_pools(
        &self,
        protocol: Protocol,
        token_in: &Token,
        token_out: &Token,
        config: &ProviderConfig,
    ) -> Result<Vec<SubgraphPool>, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner
            .get_candidate_pools(protocol, token_in, token_out, config)
            .await
    }
}

pub struct FixedBlock {
    pub block: u64,
    calls: AtomicUsize,
}

impl FixedBlock {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockNumberProvider for FixedBlock {
    async fn get_block_number(&self) -> Result<u64, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.block)
    }
}

pub struct FixedGasPrice(pub u64);

#[async_trait]
impl GasPriceProvider for FixedGasPrice {
    async fn get_gas_price(&self) -> Result<GasPrice, RouterError> {
        Ok(GasPrice {
            gas_price_wei: BigUint::from(self.0),
        })
    }
}

/// In-memory cache that counts reads and writes.
pub struct CountingCache {
    inner: InMemoryRouteCache,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl CountingCache {
    pub fn new(mode: CacheMode, blocks_to_live: u64) -> Self {
        Self {
            inner: InMemoryRouteCache::new(mode, blocks_to_live),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Lets the background write land.
    pub async fn settle(&self, expected_writes: usize) {
        for _ in 0..100 {
            if self.writes() >= expected_writes {
                return;
            }
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl RouteCachingProvider for CountingCache {
    async fn get_cache_mode(
        &self,
        chain_id: u64,
        amount: &TokenAmount,
        quote_token: &Token,
        trade_type: TradeType,
        protocols: &[Protocol],
    ) -> CacheMode {
        self.inner
            .get_cache_mode(chain_id, amount, quote_token, trade_type, protocols)
            .await
    }

    async fn fetch_cached_route(
        &self,
        chain_id: u64,
        amount: &TokenAmount,
        quote_token: &Token,
        trade_type: TradeType,
        protocols: &[Protocol],
    ) -> Result<Option<CachedRoutes>, RouterError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner
            .fetch_cached_route(chain_id, amount, quote_token, trade_type, protocols)
            .await
    }

    async fn store_cached_route(
        &self,
        cached_routes: CachedRoutes,
        amount: &TokenAmount,
    ) -> Result<bool, RouterError> {
        let stored = self.inner.store_cached_route(cached_routes, amount).await;
        self.writes.fetch_add(1, Ordering::SeqCst);
        stored
    }

    async fn blocks_to_live(&self, cached_routes: &CachedRoutes, amount: &TokenAmount) -> u64 {
        self.inner.blocks_to_live(cached_routes, amount).await
    }
}

pub struct Harness {
    pub chain: Arc<ChainTuning>,
    pub store: Arc<PoolStore>,
    pub listing: Arc<CountingListing>,
    pub quotes: Arc<CurveQuotes>,
    pub blocks: Arc<FixedBlock>,
}

impl Harness {
    pub async fn with_pools(pools: Vec<Pool>) -> Self {
        let store = Arc::new(PoolStore::new());
        for pool in pools {
            store.insert(pool, 1_000_000.0).await;
        }
        Self {
            chain: mainnet(),
            listing: Arc::new(CountingListing {
                inner: store.clone(),
                calls: AtomicUsize::new(0),
            }),
            store,
            quotes: Arc::new(CurveQuotes::default()),
            blocks: Arc::new(FixedBlock {
                block: BLOCK,
                calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn providers(&self, settings: &RouterSettings) -> RouterProviders {
        RouterProviders::with_chain_defaults(
            settings,
            self.blocks.clone(),
            Arc::new(FixedGasPrice(1)),
            self.listing.clone(),
            self.store.clone(),
            self.quotes.clone(),
        )
    }

    pub fn router(&self) -> AlphaRouter {
        let settings = RouterSettings::default();
        AlphaRouter::new(MAINNET, self.providers(&settings), settings).expect("router")
    }

    pub fn router_with_cache(&self, cache: Arc<dyn RouteCachingProvider>) -> AlphaRouter {
        let settings = RouterSettings::default();
        let mut providers = self.providers(&settings);
        providers.route_cache = Some(cache);
        AlphaRouter::new(MAINNET, providers, settings).expect("router")
    }
}
