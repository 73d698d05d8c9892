use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use num_bigint::BigUint;

use smart_order_router::config::chains::MAINNET;
use smart_order_router::config::RouterSettings;
use smart_order_router::models::pool::{Pool, FEE_MEDIUM};
use smart_order_router::models::token::{CurrencyAmount, Token, TradeType};
use smart_order_router::providers::{
    ProviderConfig, TokenValidationResult, TokenValidationResults, TokenValidator,
};
use smart_order_router::{AlphaRouter, RouterError};

use crate::support::*;

const RESERVE: u128 = 1_000_000_000_000_000_000_000_000;

/// Flags a fixed set of tokens, or fails every call.
struct FlaggingValidator {
    flagged: Vec<(Address, TokenValidationResult)>,
    fail: bool,
    calls: AtomicUsize,
}

impl FlaggingValidator {
    fn flagging(flagged: Vec<(Address, TokenValidationResult)>) -> Self {
        Self {
            flagged,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            flagged: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenValidator for FlaggingValidator {
    async fn validate_tokens(
        &self,
        tokens: &[Token],
        _config: &ProviderConfig,
    ) -> Result<TokenValidationResults, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RouterError::upstream("token validator unavailable"));
        }
        let results = tokens
            .iter()
            .map(|token| {
                let result = self
                    .flagged
                    .iter()
                    .find(|(address, _)| *address == token.address)
                    .map_or(TokenValidationResult::Unknown, |(_, result)| *result);
                (token.address, result)
            })
            .collect::<HashMap<_, _>>();
        Ok(TokenValidationResults::new(results))
    }
}

fn taxed_token() -> Token {
    Token::new(MAINNET, Address::repeat_byte(0x77), 18, "TAX")
}

/// USDC and WETH connected only through the taxed token.
fn bridged_pools() -> Vec<Pool> {
    let chain = mainnet();
    let taxed = taxed_token();
    vec![
        v3_pool(1, &usdc(&chain), &taxed, FEE_MEDIUM, RESERVE),
        v3_pool(2, &taxed, &weth(&chain), FEE_MEDIUM, RESERVE),
    ]
}

fn router(harness: &Harness, validator: Arc<FlaggingValidator>) -> AlphaRouter {
    let settings = RouterSettings::default();
    let providers = harness
        .providers(&settings)
        .with_token_validator(&settings, validator);
    AlphaRouter::new(MAINNET, providers, settings).expect("router")
}

async fn usdc_to_weth(router: &AlphaRouter) -> Option<BigUint> {
    let chain = mainnet();
    router
        .route(
            CurrencyAmount::new(usdc(&chain), ether(10)),
            weth(&chain).into(),
            TradeType::ExactInput,
            None,
            None,
        )
        .await
        .expect("route")
        .map(|swap| swap.quote.raw)
}

#[tokio::test]
async fn flagged_intermediate_tokens_are_not_routed_through() {
    let harness = Harness::with_pools(bridged_pools()).await;
    let validator = Arc::new(FlaggingValidator::flagging(vec![(
        taxed_token().address,
        TokenValidationResult::Fot,
    )]));

    assert!(usdc_to_weth(&router(&harness, validator.clone())).await.is_none());
    assert!(validator.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn flagged_endpoint_tokens_still_route() {
    let chain = mainnet();
    let harness = Harness::with_pools(vec![v3_pool(
        1,
        &usdc(&chain),
        &weth(&chain),
        FEE_MEDIUM,
        RESERVE,
    )])
    .await;
    let validator = Arc::new(FlaggingValidator::flagging(vec![
        (usdc(&chain).address, TokenValidationResult::Stf),
        (weth(&chain).address, TokenValidationResult::Fot),
    ]));

    let quote = usdc_to_weth(&router(&harness, validator.clone()))
        .await
        .expect("endpoints are never filtered");
    assert_eq!(quote, curve_out(&BigUint::from(RESERVE), &ether(10)));
    assert!(validator.calls.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn validator_failure_keeps_every_pool() {
    let harness = Harness::with_pools(bridged_pools()).await;
    let validator = Arc::new(FlaggingValidator::failing());

    let quote = usdc_to_weth(&router(&harness, validator.clone()))
        .await
        .expect("two-hop route through the unvalidated token");
    let reserve = BigUint::from(RESERVE);
    assert_eq!(quote, curve_out(&reserve, &curve_out(&reserve, &ether(10))));
    assert!(validator.calls.load(Ordering::SeqCst) > 0);
}
