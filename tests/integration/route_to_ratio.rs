use num_bigint::BigUint;

use smart_order_router::models::fraction::Fraction;
use smart_order_router::models::pool::{Pool, V3Pool, FEE_MEDIUM};
use smart_order_router::models::swap::{Position, SwapAndAddConfig, SwapToRatioResult};
use smart_order_router::models::token::CurrencyAmount;

use crate::support::*;

const RESERVE: u128 = 1_000_000_000_000_000_000_000_000;

fn target_pool() -> V3Pool {
    let chain = mainnet();
    match v3_pool(1, &usdc(&chain), &weth(&chain), FEE_MEDIUM, RESERVE) {
        Pool::V3(pool) => pool,
        Pool::V2(_) => unreachable!("v3 builder"),
    }
}

fn position() -> Position {
    Position {
        pool: target_pool(),
        tick_lower: -60,
        tick_upper: 60,
    }
}

fn config() -> SwapAndAddConfig {
    SwapAndAddConfig {
        ratio_error_tolerance: Fraction::new(1, 100).expect("tolerance"),
        max_iterations: 6,
    }
}

#[tokio::test]
async fn one_sided_balance_is_swapped_to_an_even_split() {
    let harness = Harness::with_pools(vec![Pool::V3(target_pool())]).await;
    let pool = target_pool();

    let result = harness
        .router()
        .route_to_ratio(
            CurrencyAmount::new(pool.token0.clone(), ether(1_000)),
            CurrencyAmount::new(pool.token1.clone(), BigUint::default()),
            &position(),
            &config(),
            None,
            None,
        )
        .await
        .expect("ratio search");

    let SwapToRatioResult::Success(found) = result else {
        panic!("expected a swap, got {:?}", result.status());
    };
    assert_eq!(found.swap_route.trade.input_amount.token, pool.token0);
    let sold = &found.swap_route.trade.input_amount.raw;
    assert!(*sold > ether(490) && *sold < ether(510));
    assert_eq!(found.post_swap_target_pool.tick, 0);
    assert_eq!(found.post_swap_target_pool.address, pool.address);
}

#[tokio::test]
async fn balanced_holdings_need_no_swap() {
    let harness = Harness::with_pools(vec![Pool::V3(target_pool())]).await;
    let pool = target_pool();

    let result = harness
        .router()
        .route_to_ratio(
            CurrencyAmount::new(pool.token0.clone(), BigUint::from(1_000u32)),
            CurrencyAmount::new(pool.token1.clone(), BigUint::from(1_000u32)),
            &position(),
            &config(),
            None,
            None,
        )
        .await
        .expect("ratio search");
    assert_eq!(result, SwapToRatioResult::NoSwapNeeded);
    assert_eq!(harness.quotes.calls(), 0);
}

#[tokio::test]
async fn missing_liquidity_reports_no_route() {
    let harness = Harness::with_pools(Vec::new()).await;
    let pool = target_pool();

    let result = harness
        .router()
        .route_to_ratio(
            CurrencyAmount::new(pool.token1.clone(), BigUint::default()),
            CurrencyAmount::new(pool.token0.clone(), ether(1_000)),
            &position(),
            &config(),
            None,
            None,
        )
        .await
        .expect("ratio search");
    assert!(matches!(
        result,
        SwapToRatioResult::NoRouteFound { ref error } if error == "no route found"
    ));
}
