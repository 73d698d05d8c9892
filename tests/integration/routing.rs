use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

use smart_order_router::config::{RouterSettings, RoutingConfig, RoutingConfigOverrides};
use smart_order_router::config::chains::MAINNET;
use smart_order_router::models::pool::{FEE_LOW, FEE_MEDIUM};
use smart_order_router::models::protocol::Protocol;
use smart_order_router::models::quote::{GasCostEstimate, RouteQuote};
use smart_order_router::models::route::Route;
use smart_order_router::models::swap::{SimulationConfig, SwapOptions, SwapType};
use smart_order_router::models::token::{Currency, CurrencyAmount, TokenAmount, TradeType};
use smart_order_router::providers::{OnChainQuoteProvider, ProviderConfig, RouteQuotes};
use smart_order_router::services::gas_model::GasModel;
use smart_order_router::services::quoters::{MixedQuoter, QuoteParams, Quoter};
use smart_order_router::{AlphaRouter, RouterError, RouterErrorKind};

use crate::support::*;

struct ZeroGas;

impl GasModel for ZeroGas {
    fn estimate_gas_cost(&self, quote: &RouteQuote) -> GasCostEstimate {
        GasCostEstimate {
            gas_estimate: 0,
            gas_cost_in_native: BigUint::zero(),
            gas_cost_in_token: TokenAmount::zero(quote.quote.token.clone()),
            gas_cost_in_usd: BigUint::zero(),
        }
    }
}

/// On-chain quoter whose retries are always exhausted.
struct ExhaustedQuotes;

#[async_trait]
impl OnChainQuoteProvider for ExhaustedQuotes {
    async fn get_quotes_many_exact_in(
        &self,
        _amounts: &[BigUint],
        _routes: &[Route],
        _config: &ProviderConfig,
    ) -> Result<Vec<RouteQuotes>, RouterError> {
        Err(RouterError::upstream("quoter retries exhausted"))
    }

    async fn get_quotes_many_exact_out(
        &self,
        _amounts: &[BigUint],
        _routes: &[Route],
        _config: &ProviderConfig,
    ) -> Result<Vec<RouteQuotes>, RouterError> {
        Err(RouterError::upstream("quoter retries exhausted"))
    }
}

fn swap_options(simulate: bool) -> SwapOptions {
    SwapOptions {
        swap_type: SwapType::SwapRouter02,
        recipient: Address::repeat_byte(0x42),
        slippage_tolerance_bps: 50,
        deadline: 1_800_000_000,
        simulate: simulate.then(|| SimulationConfig {
            from_address: Address::repeat_byte(0x42),
        }),
    }
}

#[tokio::test]
async fn single_v3_pool_takes_the_whole_amount() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let reserve: u128 = 1_000_000_000_000_000_000_000_000;
    let harness = Harness::with_pools(vec![v3_pool(1, &usdc, &weth, FEE_MEDIUM, reserve)]).await;
    let router = harness.router();

    let amount = ether(1_000);
    let swap = router
        .route(
            CurrencyAmount::new(usdc.clone(), amount.clone()),
            weth.clone().into(),
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect("route")
        .expect("liquidity");

    assert_eq!(swap.route.len(), 1);
    assert_eq!(swap.route[0].percent(), 100);
    assert_eq!(swap.route[0].protocol(), Protocol::V3);
    assert_eq!(swap.quote.raw, curve_out(&BigUint::from(reserve), &amount));
    assert_eq!(swap.trade.input_amount.raw, amount);
    assert_eq!(swap.block_number, BLOCK);
    assert!(swap.method_parameters.is_none());
    assert!(swap.estimated_gas_used > 0);
    // Exact input pays gas out of the output.
    assert!(swap.estimated_gas_used_quote_token.raw > BigUint::default());
    assert!(swap.quote_gas_adjusted < BigInt::from(swap.quote.raw.clone()));
    assert_eq!(
        swap.quote_gas_adjusted,
        BigInt::from(swap.quote.raw.clone())
            - BigInt::from(swap.estimated_gas_used_quote_token.raw.clone())
    );
    assert_eq!(harness.blocks.calls(), 1);
}

#[tokio::test]
async fn no_pools_means_no_route_and_no_quote_calls() {
    let chain = mainnet();
    let harness = Harness::with_pools(Vec::new()).await;
    let result = harness
        .router()
        .route(
            CurrencyAmount::new(usdc(&chain), ether(1)),
            weth(&chain).into(),
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect("no liquidity is not an error");
    assert!(result.is_none());
    assert_eq!(harness.quotes.calls(), 0);
}

#[tokio::test]
async fn two_equal_pools_split_evenly() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let reserve: u128 = 1_000_000_000_000_000_000_000;
    let harness = Harness::with_pools(vec![
        v3_pool(1, &usdc, &weth, FEE_LOW, reserve),
        v3_pool(2, &usdc, &weth, FEE_MEDIUM, reserve),
    ])
    .await;

    let amount = ether(1_000);
    let swap = harness
        .router()
        .route(
            CurrencyAmount::new(usdc, amount.clone()),
            weth.into(),
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect("route")
        .expect("liquidity");

    let mut percents = swap.route.iter().map(|record| record.percent()).collect::<Vec<_>>();
    percents.sort_unstable();
    assert_eq!(percents, vec![50, 50]);
    assert_eq!(swap.total_percent(), 100);

    let half = curve_out(&BigUint::from(reserve), &(&amount / 2u32));
    assert_eq!(swap.quote.raw, &half * 2u32);
    // A single pool would have returned only half the input.
    assert!(swap.quote.raw > curve_out(&BigUint::from(reserve), &amount));

    let total_in: BigUint = swap.route.iter().map(|record| record.amount().raw.clone()).sum();
    assert_eq!(total_in, amount);
}

#[tokio::test]
async fn exact_output_quotes_the_required_input() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let reserve: u128 = 1_000_000_000_000_000_000_000_000;
    let harness = Harness::with_pools(vec![v3_pool(1, &usdc, &weth, FEE_MEDIUM, reserve)]).await;

    let amount_out = ether(1);
    let swap = harness
        .router()
        .route(
            CurrencyAmount::new(weth.clone(), amount_out.clone()),
            usdc.clone().into(),
            TradeType::ExactOutput,
            None,
            None,
        )
        .await
        .expect("route")
        .expect("liquidity");

    let expected_in = curve_in(&BigUint::from(reserve), &amount_out).expect("within reserves");
    assert_eq!(swap.quote.raw, expected_in);
    assert_eq!(swap.trade.input_amount.token, usdc);
    assert_eq!(swap.trade.output_amount.raw, amount_out);
    // Exact output adds gas to the required input.
    assert!(swap.quote_gas_adjusted > BigInt::from(swap.quote.raw.clone()));
    assert!(swap.route.iter().all(|record| record.protocol() != Protocol::Mixed));
}

#[tokio::test]
async fn v2_pairs_are_quoted_locally() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let harness =
        Harness::with_pools(vec![v2_pair(3, &usdc, &weth, ether(1_000_000))]).await;

    let swap = harness
        .router()
        .route(
            CurrencyAmount::new(usdc, ether(10)),
            weth.into(),
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect("route")
        .expect("liquidity");

    assert_eq!(swap.route.len(), 1);
    assert_eq!(swap.route[0].protocol(), Protocol::V2);
    assert_eq!(harness.quotes.calls(), 0);
}

#[tokio::test]
async fn excluded_protocols_are_not_quoted() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let harness =
        Harness::with_pools(vec![v2_pair(3, &usdc, &weth, ether(1_000_000))]).await;

    let result = harness
        .router()
        .route(
            CurrencyAmount::new(usdc, ether(10)),
            weth.into(),
            TradeType::ExactInput,
            None,
            Some(RoutingConfigOverrides {
                protocols: Some(vec![Protocol::V3]),
                ..RoutingConfigOverrides::default()
            }),
        )
        .await
        .expect("route");
    assert!(result.is_none());
}

#[tokio::test]
async fn native_input_builds_payable_calldata() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let reserve: u128 = 1_000_000_000_000_000_000_000_000;
    let harness = Harness::with_pools(vec![v3_pool(1, &usdc, &weth, FEE_MEDIUM, reserve)]).await;

    let amount = ether(2);
    let swap = harness
        .router()
        .route(
            CurrencyAmount::new(chain.native_currency(), amount.clone()),
            usdc.into(),
            TradeType::ExactInput,
            Some(swap_options(false)),
            None,
        )
        .await
        .expect("route")
        .expect("liquidity");

    assert_eq!(swap.trade.input_amount.token, weth);
    let parameters = swap.method_parameters.expect("calldata");
    assert_eq!(parameters.to, chain.swap_router);
    assert_eq!(parameters.value, amount);
    assert!(!parameters.calldata.is_empty());
}

#[tokio::test]
async fn simulation_without_a_simulator_is_rejected() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let reserve: u128 = 1_000_000_000_000_000_000_000_000;
    let harness = Harness::with_pools(vec![v3_pool(1, &usdc, &weth, FEE_MEDIUM, reserve)]).await;

    let err = harness
        .router()
        .route(
            CurrencyAmount::new(usdc, ether(1)),
            weth.into(),
            TradeType::ExactInput,
            Some(swap_options(true)),
            None,
        )
        .await
        .expect_err("no simulator configured");
    assert_eq!(err.kind(), RouterErrorKind::InvalidRequest);
}

#[tokio::test]
async fn malformed_requests_fail_before_any_network_call() {
    let chain = mainnet();
    let harness = Harness::with_pools(Vec::new()).await;
    let router = harness.router();
    let usdc = usdc(&chain);

    let same_token = router
        .route(
            CurrencyAmount::new(usdc.clone(), ether(1)),
            usdc.clone().into(),
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect_err("same token");
    assert_eq!(same_token.kind(), RouterErrorKind::InvalidRequest);

    let foreign = Currency::Native {
        chain_id: 10,
        symbol: "ETH".to_string(),
        decimals: 18,
    };
    let wrong_chain = router
        .route(
            CurrencyAmount::new(usdc, ether(1)),
            foreign,
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect_err("foreign chain");
    assert!(wrong_chain.is_precondition());
    assert_eq!(harness.blocks.calls(), 0);
}

#[tokio::test]
async fn mixed_quoter_rejects_exact_output_without_network_calls() {
    let harness = Harness::with_pools(Vec::new()).await;
    let chain = harness.chain.clone();
    let quoter = MixedQuoter::new(
        chain.clone(),
        harness.listing.clone(),
        harness.store.clone(),
        harness.store.clone(),
        harness.quotes.clone(),
        None,
    );
    let params = QuoteParams {
        token_in: usdc(&chain),
        token_out: weth(&chain),
        amounts: vec![ether(1)],
        percents: vec![100],
        quote_token: usdc(&chain),
        trade_type: TradeType::ExactOutput,
        routing_config: RoutingConfig::default(),
        provider_config: ProviderConfig::default(),
        gas_model: Arc::new(ZeroGas),
    };

    let err = quoter
        .get_routes_then_quotes(&params)
        .await
        .expect_err("exact output");
    assert_eq!(err.kind(), RouterErrorKind::Unsupported);
    assert_eq!(harness.listing.calls(), 0);
    assert_eq!(harness.quotes.calls(), 0);
}

#[tokio::test]
async fn exhausted_quote_retries_fail_the_request() {
    let chain = mainnet();
    let (usdc, weth) = (usdc(&chain), weth(&chain));
    let reserve: u128 = 1_000_000_000_000_000_000_000_000;
    let harness = Harness::with_pools(vec![
        v3_pool(1, &usdc, &weth, FEE_MEDIUM, reserve),
        v2_pair(3, &usdc, &weth, ether(1_000_000)),
    ])
    .await;
    let settings = RouterSettings::default();
    let mut providers = harness.providers(&settings);
    providers.on_chain_quotes = Arc::new(ExhaustedQuotes);
    let router = AlphaRouter::new(MAINNET, providers, settings).expect("router");

    // The V2 pair alone could fill the trade, but a failed V3 quote is not dropped.
    let err = router
        .route(
            CurrencyAmount::new(usdc, ether(10)),
            weth.into(),
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect_err("upstream failure surfaces");
    assert_eq!(err.kind(), RouterErrorKind::Upstream);
    assert!(err.message().contains("retries exhausted"));
}
