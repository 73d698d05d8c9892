//! Cache-mode decisions around a single `route()` call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::metrics::{self, CacheLookupOutcome, CacheWriteOutcome};
use crate::models::cache::{CacheMode, CachedRoutes};
use crate::models::protocol::Protocol;
use crate::models::token::{Token, TokenAmount, TradeType};
use crate::providers::RouteCachingProvider;

use super::best_swap_route::BestSwapRoute;
use super::distribution::PERCENT_DENOMINATOR;

/// Extra split percents quoted alongside cached ones, in case the cached split went stale.
const CACHE_EXTRA_PERCENTS: [u32; 2] = [PERCENT_DENOMINATOR, 50];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLookup {
    pub mode: CacheMode,
    pub cached: Option<CachedRoutes>,
}

impl CacheLookup {
    fn disabled() -> Self {
        Self {
            mode: CacheMode::Darkmode,
            cached: None,
        }
    }

    /// Livemode with a usable bundle skips fresh discovery entirely.
    pub fn needs_fresh_routes(&self) -> bool {
        self.cached.is_none() || self.mode != CacheMode::Livemode
    }

    /// Which answer the caller sees.
    pub fn choose(
        &self,
        from_cache: Option<BestSwapRoute>,
        from_chain: Option<BestSwapRoute>,
    ) -> Option<BestSwapRoute> {
        match (self.mode, from_cache) {
            (CacheMode::Livemode, Some(cached)) => {
                info!(cache_mode = %self.mode, "Serving swap route from cache");
                Some(cached)
            }
            _ => from_chain,
        }
    }
}

/// Cached-vs-fresh comparison reported in Tapcompare mode.
#[derive(Debug, Clone, PartialEq)]
pub struct TapcompareDelta {
    pub quote_diff: BigInt,
    pub quote_gas_adjusted_diff: BigInt,
    pub gas_used_diff: i128,
    /// Gas-adjusted difference relative to the fresh (chain) answer.
    pub misquote_percent: f64,
}

/// Percents to quote when replaying a cached bundle.
pub fn cache_percents(cached: &CachedRoutes) -> Vec<u32> {
    let mut percents = cached.percents();
    percents.extend(CACHE_EXTRA_PERCENTS);
    percents.sort_unstable();
    percents.dedup();
    percents
}

/// Compares the two answers; `None` when they agree.
pub fn tapcompare(from_cache: &BestSwapRoute, from_chain: &BestSwapRoute) -> Option<TapcompareDelta> {
    let quote_diff =
        BigInt::from(from_chain.quote.raw.clone()) - BigInt::from(from_cache.quote.raw.clone());
    let quote_gas_adjusted_diff = &from_chain.quote_gas_adjusted - &from_cache.quote_gas_adjusted;
    if quote_diff.is_zero() && quote_gas_adjusted_diff.is_zero() {
        return None;
    }
    let gas_used_diff =
        i128::from(from_chain.estimated_gas_used) - i128::from(from_cache.estimated_gas_used);
    let misquote_percent = if from_chain.quote_gas_adjusted.is_zero() {
        0.0
    } else {
        let diff = quote_gas_adjusted_diff.to_f64().unwrap_or(0.0);
        let base = from_chain.quote_gas_adjusted.to_f64().unwrap_or(f64::INFINITY);
        diff / base * 100.0
    };
    Some(TapcompareDelta {
        quote_diff,
        quote_gas_adjusted_diff,
        gas_used_diff,
        misquote_percent,
    })
}

/// Owns the route cache interactions of the orchestrator.
#[derive(Clone)]
pub struct RouteCacheCoordinator {
    provider: Option<Arc<dyn RouteCachingProvider>>,
    misquotes: Arc<AtomicU64>,
}

impl RouteCacheCoordinator {
    pub fn new(provider: Option<Arc<dyn RouteCachingProvider>>) -> Self {
        Self {
            provider,
            misquotes: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Tapcompare deltas reported since construction.
    pub fn misquotes_reported(&self) -> u64 {
        self.misquotes.load(Ordering::Relaxed)
    }

    /// Resolves the mode and, outside Darkmode, reads a bundle. Expired bundles and read
    /// failures count as misses.
    pub async fn lookup(
        &self,
        chain_id: u64,
        amount: &TokenAmount,
        quote_token: &Token,
        trade_type: TradeType,
        protocols: &[Protocol],
        block_number: u64,
    ) -> CacheLookup {
        let Some(provider) = &self.provider else {
            return CacheLookup::disabled();
        };
        let mode = provider
            .get_cache_mode(chain_id, amount, quote_token, trade_type, protocols)
            .await;
        if mode == CacheMode::Darkmode {
            metrics::emit_cache_lookup(mode, CacheLookupOutcome::Skipped);
            return CacheLookup { mode, cached: None };
        }

        let fetched = match provider
            .fetch_cached_route(chain_id, amount, quote_token, trade_type, protocols)
            .await
        {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!(cache_mode = %mode, error = %err, "Route cache read failed");
                None
            }
        };
        let (outcome, cached) = match fetched {
            None => (CacheLookupOutcome::Miss, None),
            Some(bundle) if !bundle.not_expired(block_number) => {
                (CacheLookupOutcome::Expired, None)
            }
            Some(bundle) => (CacheLookupOutcome::Hit, Some(bundle)),
        };
        metrics::emit_cache_lookup(mode, outcome);
        info!(
            chain_id,
            cache_mode = %mode,
            outcome = ?outcome,
            amount = %amount.raw,
            trade_type = %trade_type,
            "Route cache lookup"
        );
        CacheLookup { mode, cached }
    }

    /// Emits the misquote metric when cached and fresh answers differ.
    pub fn report_tapcompare(
        &self,
        chain_id: u64,
        lookup: &CacheLookup,
        from_cache: Option<&BestSwapRoute>,
        from_chain: Option<&BestSwapRoute>,
    ) -> Option<TapcompareDelta> {
        if lookup.mode != CacheMode::Tapcompare {
            return None;
        }
        let delta = tapcompare(from_cache?, from_chain?)?;
        self.misquotes.fetch_add(1, Ordering::Relaxed);
        metrics::emit_tapcompare_misquote(chain_id, delta.misquote_percent);
        warn!(
            chain_id,
            quote_diff = %delta.quote_diff,
            quote_gas_adjusted_diff = %delta.quote_gas_adjusted_diff,
            gas_used_diff = delta.gas_used_diff,
            misquote_percent = delta.misquote_percent,
            original_amount = lookup
                .cached
                .as_ref()
                .map(|cached| cached.original_amount.as_str())
                .unwrap_or_default(),
            "Cached and fresh quotes differ"
        );
        Some(delta)
    }

    /// Writes the fresh routes in the background on the current tokio runtime. The returned
    /// handle never needs awaiting; failures are logged and counted, never surfaced. Outside a
    /// runtime the write is skipped.
    #[allow(clippy::too_many_arguments)]
    pub fn spawn_store(
        &self,
        mode: CacheMode,
        from_chain: &BestSwapRoute,
        chain_id: u64,
        token_in: &Token,
        token_out: &Token,
        protocols_covered: &[Protocol],
        block_number: u64,
        trade_type: TradeType,
        amount: &TokenAmount,
    ) -> Option<JoinHandle<()>> {
        let provider = self.provider.clone()?;
        if mode == CacheMode::Darkmode {
            return None;
        }
        let bundle = CachedRoutes::from_routes_with_valid_quotes(
            &from_chain.routes,
            chain_id,
            token_in,
            token_out,
            protocols_covered,
            block_number,
            trade_type,
            amount.raw.to_string(),
        )?;
        let pair = format!("{}/{}/{}", token_in.symbol, token_out.symbol, trade_type);
        let runtime = match Handle::try_current() {
            Ok(runtime) => runtime,
            Err(err) => {
                metrics::emit_set_cached_route(CacheWriteOutcome::Failure);
                error!(pair = %pair, error = %err, "No tokio runtime; cached route not stored");
                return None;
            }
        };
        let amount = amount.clone();
        Some(runtime.spawn(async move {
            match provider.set_cached_route(bundle, &amount).await {
                Ok(stored) => {
                    let outcome = if stored {
                        CacheWriteOutcome::Success
                    } else {
                        CacheWriteOutcome::Rejected
                    };
                    metrics::emit_set_cached_route(outcome);
                }
                Err(err) => {
                    metrics::emit_set_cached_route(CacheWriteOutcome::Failure);
                    error!(pair = %pair, error = %err, "Failed to store cached route");
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::Address;
    use async_trait::async_trait;
    use num_bigint::BigUint;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::RouterError;
    use crate::providers::route_cache::InMemoryRouteCache;

    fn tokens() -> (Token, Token) {
        (
            Token::new(1, Address::repeat_byte(1), 6, "USDC"),
            Token::new(1, Address::repeat_byte(2), 18, "WETH"),
        )
    }

    fn best(quote: u64, adjusted: i64, gas: u64) -> BestSwapRoute {
        let (_, weth) = tokens();
        BestSwapRoute {
            quote: TokenAmount::new(weth.clone(), BigUint::from(quote)),
            quote_gas_adjusted: BigInt::from(adjusted),
            estimated_gas_used: gas,
            estimated_gas_used_quote_token: TokenAmount::new(weth, BigUint::zero()),
            estimated_gas_used_usd: BigUint::zero(),
            routes: Vec::new(),
        }
    }

    fn bundle(block_number: u64, blocks_to_live: u64) -> CachedRoutes {
        let (usdc, weth) = tokens();
        CachedRoutes {
            routes: Vec::new(),
            chain_id: 1,
            token_in: usdc,
            token_out: weth,
            protocols_covered: vec![Protocol::V3],
            block_number,
            trade_type: TradeType::ExactInput,
            original_amount: "1000".to_string(),
            blocks_to_live,
        }
    }

    /// A one-route fresh answer that can be turned into a cache bundle.
    fn answer_with_route(amount: &TokenAmount) -> BestSwapRoute {
        let (usdc, weth) = tokens();
        let mut answer = best(1, 1, 1);
        let route = crate::services::gas_model::test_support::single_hop(
            Protocol::V3,
            crate::services::gas_model::test_support::unit_v3_pool(9, &usdc, &weth),
            &usdc,
            &weth,
        );
        answer.routes.push(crate::models::quote::RouteWithValidQuote::new(
            crate::services::gas_model::test_support::quote_for(
                route,
                amount.clone(),
                TokenAmount::new(weth.clone(), BigUint::from(1u32)),
                vec![1],
            ),
            crate::models::quote::GasCostEstimate {
                gas_estimate: 1,
                gas_cost_in_native: BigUint::zero(),
                gas_cost_in_token: TokenAmount::new(weth, BigUint::zero()),
                gas_cost_in_usd: BigUint::zero(),
            },
        ));
        answer
    }

    struct FailingCache {
        mode: CacheMode,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl RouteCachingProvider for FailingCache {
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
            _chain_id: u64,
            _amount: &TokenAmount,
            _quote_token: &Token,
            _trade_type: TradeType,
            _protocols: &[Protocol],
        ) -> Result<Option<CachedRoutes>, RouterError> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            Err(RouterError::upstream("cache unavailable"))
        }

        async fn store_cached_route(
            &self,
            _cached_routes: CachedRoutes,
            _amount: &TokenAmount,
        ) -> Result<bool, RouterError> {
            Err(RouterError::upstream("cache unavailable"))
        }

        async fn blocks_to_live(&self, _cached: &CachedRoutes, _amount: &TokenAmount) -> u64 {
            1
        }
    }

    #[test]
    fn cache_percents_add_full_and_half_splits() {
        let mut cached = bundle(1, 1);
        let (usdc, weth) = tokens();
        let route = crate::services::gas_model::test_support::single_hop(
            Protocol::V3,
            crate::services::gas_model::test_support::unit_v3_pool(9, &usdc, &weth),
            &usdc,
            &weth,
        );
        cached.routes.push(crate::models::cache::CachedRoute { route, percent: 30 });
        assert_eq!(cache_percents(&cached), vec![30, 50, 100]);
    }

    #[test]
    fn tapcompare_uses_chain_quote_as_denominator() {
        let delta = tapcompare(&best(1_000, 900, 10), &best(1_100, 1_000, 12)).expect("differs");
        assert_eq!(delta.quote_diff, BigInt::from(100));
        assert_eq!(delta.quote_gas_adjusted_diff, BigInt::from(100));
        assert_eq!(delta.gas_used_diff, 2);
        assert!((delta.misquote_percent - 10.0).abs() < 1e-9);
        assert!(tapcompare(&best(1_000, 900, 10), &best(1_000, 900, 20)).is_none());
    }

    #[test]
    fn livemode_serves_cache_and_skips_fresh_routes() {
        let lookup = CacheLookup {
            mode: CacheMode::Livemode,
            cached: Some(bundle(1, 1)),
        };
        assert!(!lookup.needs_fresh_routes());
        let chosen = lookup.choose(Some(best(1, 1, 1)), None).expect("cache answer");
        assert_eq!(chosen.quote.raw, BigUint::from(1u32));

        let tap = CacheLookup {
            mode: CacheMode::Tapcompare,
            cached: Some(bundle(1, 1)),
        };
        assert!(tap.needs_fresh_routes());
        let chosen = tap
            .choose(Some(best(1, 1, 1)), Some(best(2, 2, 2)))
            .expect("chain answer");
        assert_eq!(chosen.quote.raw, BigUint::from(2u32));
    }

    #[tokio::test]
    async fn expired_bundles_are_misses() {
        let cache = Arc::new(InMemoryRouteCache::new(CacheMode::Livemode, 5));
        let (usdc, weth) = tokens();
        let amount = TokenAmount::new(usdc, BigUint::from(1_000u32));
        let mut stored = bundle(100, 0);
        let token_in = stored.token_in.clone();
        stored.routes.push(crate::models::cache::CachedRoute {
            route: crate::services::gas_model::test_support::single_hop(
                Protocol::V3,
                crate::services::gas_model::test_support::unit_v3_pool(9, &token_in, &weth),
                &token_in,
                &weth,
            ),
            percent: 100,
        });
        assert!(cache.set_cached_route(stored, &amount).await.expect("stored"));

        let coordinator = RouteCacheCoordinator::new(Some(cache));
        let fresh = coordinator
            .lookup(1, &amount, &weth, TradeType::ExactInput, &[Protocol::V3], 104)
            .await;
        assert!(fresh.cached.is_some());
        let stale = coordinator
            .lookup(1, &amount, &weth, TradeType::ExactInput, &[Protocol::V3], 106)
            .await;
        assert_eq!(stale.mode, CacheMode::Livemode);
        assert!(stale.cached.is_none());
    }

    #[tokio::test]
    async fn read_and_write_failures_are_swallowed() {
        let cache = Arc::new(FailingCache {
            mode: CacheMode::Tapcompare,
            reads: AtomicUsize::new(0),
        });
        let coordinator = RouteCacheCoordinator::new(Some(cache.clone()));
        let (usdc, weth) = tokens();
        let amount = TokenAmount::new(usdc.clone(), BigUint::from(10u32));
        let lookup = coordinator
            .lookup(1, &amount, &weth, TradeType::ExactInput, &[], 1)
            .await;
        assert!(lookup.cached.is_none());
        assert_eq!(cache.reads.load(Ordering::Relaxed), 1);

        let answer = answer_with_route(&amount);
        let handle = coordinator
            .spawn_store(
                lookup.mode,
                &answer,
                1,
                &usdc,
                &weth,
                &[Protocol::V3],
                1,
                TradeType::ExactInput,
                &amount,
            )
            .expect("write spawned");
        handle.await.expect("task completes without panicking");
    }

    #[test]
    fn darkmode_never_writes() {
        let coordinator = RouteCacheCoordinator::new(None);
        let (usdc, weth) = tokens();
        let amount = TokenAmount::new(usdc.clone(), BigUint::from(10u32));
        assert!(coordinator
            .spawn_store(
                CacheMode::Darkmode,
                &best(1, 1, 1),
                1,
                &usdc,
                &weth,
                &[],
                1,
                TradeType::ExactInput,
                &amount,
            )
            .is_none());
    }

    #[test]
    fn store_outside_a_runtime_is_skipped() {
        let cache = Arc::new(InMemoryRouteCache::new(CacheMode::Livemode, 1));
        let coordinator = RouteCacheCoordinator::new(Some(cache));
        let (usdc, weth) = tokens();
        let amount = TokenAmount::new(usdc.clone(), BigUint::from(10u32));
        let handle = coordinator.spawn_store(
            CacheMode::Livemode,
            &answer_with_route(&amount),
            1,
            &usdc,
            &weth,
            &[Protocol::V3],
            1,
            TradeType::ExactInput,
            &amount,
        );
        assert!(handle.is_none());
    }

    #[test]
    fn only_tapcompare_differences_are_counted() {
        let coordinator = RouteCacheCoordinator::new(None);
        let tap = CacheLookup {
            mode: CacheMode::Tapcompare,
            cached: Some(bundle(1, 1)),
        };
        let cached = best(1_000, 900, 10);
        let fresh = best(1_100, 1_000, 12);

        assert!(coordinator
            .report_tapcompare(1, &tap, Some(&cached), Some(&cached))
            .is_none());
        let live = CacheLookup {
            mode: CacheMode::Livemode,
            ..tap.clone()
        };
        assert!(coordinator
            .report_tapcompare(1, &live, Some(&cached), Some(&fresh))
            .is_none());
        assert_eq!(coordinator.misquotes_reported(), 0);

        let delta = coordinator
            .report_tapcompare(1, &tap, Some(&cached), Some(&fresh))
            .expect("answers differ");
        assert!(delta.misquote_percent > 0.0);
        assert_eq!(coordinator.misquotes_reported(), 1);
    }
}
