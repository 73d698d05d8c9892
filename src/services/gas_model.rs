//! Gas cost estimation for quoted routes.
//!
//! A gas model is built once per `route()` call from the gas price and a handful of
//! native-currency pools, then prices every quote record synchronously. Gas is first
//! counted in units, multiplied by the gas price, and converted into the quote token and
//! USD through the deepest available native pools.

pub mod l1;
mod mixed;
mod v2;
mod v3;

use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::warn;

use crate::config::ChainTuning;
use crate::error::RouterError;
use crate::models::fraction::Fraction;
use crate::models::pool::{Pool, FEE_TIERS};
use crate::models::quote::{GasCostEstimate, RouteQuote, RouteWithValidQuote, USD_DECIMALS};
use crate::models::token::{Token, TokenAmount};
use crate::providers::{L2GasData, PoolAccessor, PoolKey, PoolProvider, ProviderConfig};

pub use l1::L1GasCost;
pub use mixed::MixedRouteHeuristicGasModelFactory;
pub use v2::V2HeuristicGasModelFactory;
pub use v3::V3HeuristicGasModelFactory;

pub trait GasModel: Send + Sync {
    /// Never fails for a structurally valid route; unpriceable gas degrades to zero.
    fn estimate_gas_cost(&self, quote: &RouteQuote) -> GasCostEstimate;

    /// Rollup data fee for a full set of routes. `None` on chains without one.
    fn calculate_l1_gas_fees(&self, _routes: &[RouteWithValidQuote]) -> Option<L1GasCost> {
        None
    }
}

/// Inputs shared by every gas model factory.
#[derive(Clone)]
pub struct GasModelRequest {
    pub chain: Arc<ChainTuning>,
    pub gas_price_wei: BigUint,
    pub v3_pool_provider: Arc<dyn PoolProvider>,
    pub v2_pool_provider: Option<Arc<dyn PoolProvider>>,
    pub amount_token: Token,
    pub quote_token: Token,
    pub l2_gas_data: Option<L2GasData>,
    pub provider_config: ProviderConfig,
}

#[async_trait]
pub trait GasModelFactory: Send + Sync {
    async fn build_gas_model(
        &self,
        request: GasModelRequest,
    ) -> Result<Arc<dyn GasModel>, RouterError>;
}

/// Native-currency pools resolved for one trade, used to convert wei into the quote token
/// and USD.
#[derive(Debug, Clone)]
pub(crate) struct NativePricing {
    wrapped_native: Token,
    quote_token: Token,
    amount_token: Token,
    quote_native_pool: Option<Pool>,
    amount_native_pool: Option<Pool>,
    usd_pool: Option<(Pool, Token)>,
}

impl NativePricing {
    pub(crate) fn new(
        chain: &ChainTuning,
        amount_token: Token,
        quote_token: Token,
        quote_native_pool: Option<Pool>,
        amount_native_pool: Option<Pool>,
        usd_pool: Option<(Pool, Token)>,
    ) -> Self {
        let pricing = Self {
            wrapped_native: chain.wrapped_native.clone(),
            quote_token,
            amount_token,
            quote_native_pool,
            amount_native_pool,
            usd_pool,
        };
        if !pricing.can_price_quote_token() {
            warn!(
                chain_id = chain.chain_id,
                quote_token = %pricing.quote_token,
                amount_token = %pricing.amount_token,
                "No native pool to price gas in quote token; gas costs will be zero"
            );
        }
        if pricing.usd_pool.is_none() {
            warn!(chain_id = chain.chain_id, "No native/USD pool; USD gas costs will be zero");
        }
        pricing
    }

    fn can_price_quote_token(&self) -> bool {
        self.quote_token == self.wrapped_native
            || self.quote_native_pool.is_some()
            || self.amount_native_pool.is_some()
            || self.amount_token == self.wrapped_native
    }

    pub(crate) fn quote_token(&self) -> &Token {
        &self.quote_token
    }

    /// Gas cost in quote-token raw units. When both the direct quote/native pool and the
    /// synthetic path through the amount token are available, the smaller result wins.
    pub(crate) fn native_to_quote(
        &self,
        native_cost: &BigUint,
        execution_price: Option<&Fraction>,
    ) -> BigUint {
        if self.quote_token == self.wrapped_native {
            return native_cost.clone();
        }

        let direct = self
            .quote_native_pool
            .as_ref()
            .and_then(|pool| pool.price_of(&self.wrapped_native))
            .map(|price| price.apply(native_cost));

        let native_in_amount_token = if self.amount_token == self.wrapped_native {
            Some(Fraction::one())
        } else {
            self.amount_native_pool
                .as_ref()
                .and_then(|pool| pool.price_of(&self.wrapped_native))
        };
        let synthetic = match (native_in_amount_token, execution_price) {
            (Some(native_price), Some(execution_price)) => {
                Some(native_price.mul(execution_price).apply(native_cost))
            }
            _ => None,
        };

        match (direct, synthetic) {
            (Some(direct), Some(synthetic)) => direct.min(synthetic),
            (Some(cost), None) | (None, Some(cost)) => cost,
            (None, None) => BigUint::zero(),
        }
    }

    /// Gas cost in USD with `USD_DECIMALS` decimals.
    pub(crate) fn native_to_usd(&self, native_cost: &BigUint) -> BigUint {
        let Some((pool, usd_token)) = &self.usd_pool else {
            return BigUint::zero();
        };
        let Some(price) = pool.price_of(&self.wrapped_native) else {
            return BigUint::zero();
        };
        let raw = price.apply(native_cost);
        let decimals = u32::from(usd_token.decimals);
        if decimals <= USD_DECIMALS {
            raw * BigUint::from(10u32).pow(USD_DECIMALS - decimals)
        } else {
            raw / BigUint::from(10u32).pow(decimals - USD_DECIMALS)
        }
    }

    pub(crate) fn estimate(
        &self,
        gas_units: u64,
        gas_price_wei: &BigUint,
        quote: &RouteQuote,
    ) -> GasCostEstimate {
        let native_cost = gas_price_wei * BigUint::from(gas_units);
        let in_token = self.native_to_quote(&native_cost, execution_price(quote).as_ref());
        GasCostEstimate {
            gas_estimate: gas_units,
            gas_cost_in_usd: self.native_to_usd(&native_cost),
            gas_cost_in_token: TokenAmount::new(self.quote_token.clone(), in_token),
            gas_cost_in_native: native_cost,
        }
    }
}

/// Quote-token units per amount-token unit realised by the route.
pub(crate) fn execution_price(quote: &RouteQuote) -> Option<Fraction> {
    Fraction::from_unsigned(&quote.quote.raw, &quote.amount.raw)
}

pub(crate) fn v3_native_keys(chain: &ChainTuning, tokens: &[&Token]) -> Vec<PoolKey> {
    let mut keys = Vec::new();
    for token in tokens {
        if **token == chain.wrapped_native {
            continue;
        }
        for fee in FEE_TIERS {
            keys.push(PoolKey::V3 {
                token_a: chain.wrapped_native.clone(),
                token_b: (*token).clone(),
                fee,
            });
        }
    }
    keys
}

/// Highest-liquidity V3 pool for the pair, scanning fee tiers from high to low.
pub(crate) fn deepest_v3_pool(accessor: &PoolAccessor, a: &Token, b: &Token) -> Option<Pool> {
    let mut best: Option<Pool> = None;
    for fee in FEE_TIERS {
        let Some(pool) = accessor.get_v3_pool(a, b, fee) else {
            continue;
        };
        if pool.liquidity == 0 {
            continue;
        }
        let deeper = match &best {
            Some(Pool::V3(current)) => pool.liquidity > current.liquidity,
            _ => true,
        };
        if deeper {
            best = Some(Pool::V3(pool.clone()));
        }
    }
    best
}

pub(crate) fn deepest_v3_usd_pool(
    accessor: &PoolAccessor,
    chain: &ChainTuning,
) -> Option<(Pool, Token)> {
    let mut best: Option<(Pool, Token, u128)> = None;
    for usd in &chain.usd_tokens {
        let Some(pool) = deepest_v3_pool(accessor, &chain.wrapped_native, usd) else {
            continue;
        };
        let liquidity = pool.as_v3().map(|pool| pool.liquidity).unwrap_or_default();
        if best.as_ref().map_or(true, |(_, _, current)| liquidity > *current) {
            best = Some((pool, usd.clone(), liquidity));
        }
    }
    best.map(|(pool, token, _)| (pool, token))
}

/// Resolves the V3 native pools for an amount/quote token pair.
pub(crate) async fn resolve_v3_native_pricing(
    request: &GasModelRequest,
) -> Result<NativePricing, RouterError> {
    let chain = &request.chain;
    let mut tokens = vec![&request.quote_token, &request.amount_token];
    tokens.extend(chain.usd_tokens.iter());
    let keys = v3_native_keys(chain, &tokens);
    let accessor = request
        .v3_pool_provider
        .get_pools(&keys, &request.provider_config)
        .await?;

    Ok(NativePricing::new(
        chain,
        request.amount_token.clone(),
        request.quote_token.clone(),
        deepest_v3_pool(&accessor, &request.quote_token, &chain.wrapped_native),
        deepest_v3_pool(&accessor, &request.amount_token, &chain.wrapped_native),
        deepest_v3_usd_pool(&accessor, chain),
    ))
}
