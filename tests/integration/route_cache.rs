use std::sync::Arc;

use alloy_primitives::Address;
use num_bigint::BigUint;

use smart_order_router::config::RoutingConfigOverrides;
use smart_order_router::models::cache::CacheMode;
use smart_order_router::models::pool::{FEE_LOW, FEE_MEDIUM};
use smart_order_router::models::swap::SwapRoute;
use smart_order_router::models::token::{CurrencyAmount, TradeType};
use smart_order_router::AlphaRouter;

use crate::support::*;

const RESERVE: u128 = 1_000_000_000_000_000_000_000_000;

async fn swap(router: &AlphaRouter, overrides: Option<RoutingConfigOverrides>) -> SwapRoute {
    let chain = mainnet();
    router
        .route(
            CurrencyAmount::new(usdc(&chain), ether(100)),
            weth(&chain).into(),
            TradeType::ExactInput,
            None,
            overrides,
        )
        .await
        .expect("route")
        .expect("liquidity")
}

async fn harness() -> Harness {
    let chain = mainnet();
    Harness::with_pools(vec![v3_pool(1, &usdc(&chain), &weth(&chain), FEE_MEDIUM, RESERVE)]).await
}

#[tokio::test]
async fn livemode_replays_cached_routes_without_discovery() {
    let harness = harness().await;
    let cache = Arc::new(CountingCache::new(CacheMode::Livemode, 10));
    let router = harness.router_with_cache(cache.clone());

    let first = swap(&router, None).await;
    cache.settle(1).await;
    assert_eq!(cache.writes(), 1);
    let listing_calls = harness.listing.calls();
    let quote_calls = harness.quotes.calls();
    assert!(listing_calls > 0);

    let second = swap(&router, None).await;
    assert_eq!(harness.listing.calls(), listing_calls);
    assert_eq!(harness.quotes.calls(), quote_calls + 1);
    assert_eq!(cache.reads(), 2);
    assert_eq!(second.quote, first.quote);
    assert_eq!(
        second.route[0].route().token_path(),
        first.route[0].route().token_path()
    );
}

#[tokio::test]
async fn darkmode_never_touches_the_cache() {
    let harness = harness().await;
    let cache = Arc::new(CountingCache::new(CacheMode::Darkmode, 10));
    let router = harness.router_with_cache(cache.clone());

    swap(&router, None).await;
    swap(&router, None).await;
    tokio::task::yield_now().await;
    assert_eq!(cache.reads(), 0);
    assert_eq!(cache.writes(), 0);
}

#[tokio::test]
async fn tapcompare_returns_the_fresh_answer() {
    let harness = harness().await;
    let cache = Arc::new(CountingCache::new(CacheMode::Tapcompare, 10));
    let router = harness.router_with_cache(cache.clone());

    let first = swap(&router, None).await;
    cache.settle(1).await;
    let listing_calls = harness.listing.calls();
    let quote_calls = harness.quotes.calls();

    let second = swap(&router, None).await;
    // Both the cached replay and fresh discovery hit the quoter.
    assert!(harness.quotes.calls() >= quote_calls + 2);
    assert!(harness.listing.calls() > listing_calls);
    assert_eq!(second.quote, first.quote);
    assert_eq!(
        second.quote.raw,
        curve_out(&BigUint::from(RESERVE), &ether(100))
    );
}

#[tokio::test]
async fn tapcompare_prefers_fresh_routes_over_a_stale_bundle() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let shallow: u128 = 1_000_000_000_000_000_000_000;
    let harness = Harness::with_pools(vec![v3_pool(1, &usdc, &weth, FEE_LOW, shallow)]).await;
    let cache = Arc::new(CountingCache::new(CacheMode::Tapcompare, 10));
    let router = harness.router_with_cache(cache.clone());

    let stale = swap(&router, None).await;
    cache.settle(1).await;
    assert_eq!(stale.quote.raw, curve_out(&BigUint::from(shallow), &ether(100)));
    assert_eq!(router.route_cache().misquotes_reported(), 0);

    // Deeper liquidity appears after the shallow route was cached.
    harness
        .store
        .insert(v3_pool(2, &usdc, &weth, FEE_MEDIUM, RESERVE), 1_000_000.0)
        .await;

    let fresh = swap(&router, None).await;
    assert!(fresh.quote.raw > stale.quote.raw);
    assert!(fresh
        .route
        .iter()
        .any(|record| record.route().pool_addresses().contains(&Address::repeat_byte(2))));
    assert_eq!(router.route_cache().misquotes_reported(), 1);
    assert_eq!(cache.reads(), 2);
}

#[tokio::test]
async fn expired_bundles_trigger_fresh_discovery() {
    let harness = harness().await;
    let cache = Arc::new(CountingCache::new(CacheMode::Livemode, 0));
    let router = harness.router_with_cache(cache.clone());

    swap(&router, None).await;
    cache.settle(1).await;
    let listing_calls = harness.listing.calls();

    let later = RoutingConfigOverrides {
        block_number: Some(BLOCK + 5),
        ..RoutingConfigOverrides::default()
    };
    let second = swap(&router, Some(later)).await;
    assert!(harness.listing.calls() > listing_calls);
    assert_eq!(second.block_number, BLOCK + 5);
    assert_eq!(cache.reads(), 2);
}
