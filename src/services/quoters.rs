//! Per-protocol quoters.
//!
//! Each quoter runs in two phases: `get_routes` discovers candidate pools and enumerates
//! routes, `get_quotes` prices a route set against the split amounts. The cache path skips
//! phase one and replays cached routes straight into `get_quotes`.

mod candidates;
mod mixed;
mod routes;
mod v2;
mod v3;

use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::{debug, warn};

use crate::config::RoutingConfig;
use crate::error::RouterError;
use crate::models::pool::Pool;
use crate::models::protocol::Protocol;
use crate::models::quote::{RouteQuote, RouteWithValidQuote};
use crate::models::route::Route;
use crate::models::token::{Token, TokenAmount, TradeType};
use crate::providers::{ProviderConfig, RouteQuotes, TokenValidator};

use super::gas_model::GasModel;

pub use candidates::CandidatePoolsBySelectionCriteria;
pub use mixed::MixedQuoter;
pub use routes::{compute_all_mixed_routes, compute_all_routes};
pub use v2::V2Quoter;
pub use v3::V3Quoter;

/// Everything a quoter needs for one trade.
#[derive(Clone)]
pub struct QuoteParams {
    pub token_in: Token,
    pub token_out: Token,
    pub amounts: Vec<BigUint>,
    pub percents: Vec<u32>,
    pub quote_token: Token,
    pub trade_type: TradeType,
    pub routing_config: RoutingConfig,
    pub provider_config: ProviderConfig,
    pub gas_model: Arc<dyn GasModel>,
}

impl QuoteParams {
    pub fn amount_token(&self) -> &Token {
        match self.trade_type {
            TradeType::ExactInput => &self.token_in,
            TradeType::ExactOutput => &self.token_out,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GetRoutesResult {
    pub routes: Vec<Route>,
    pub candidate_pools: Option<CandidatePoolsBySelectionCriteria>,
}

#[derive(Debug, Clone, Default)]
pub struct GetQuotesResult {
    pub routes_with_valid_quotes: Vec<RouteWithValidQuote>,
    pub candidate_pools: Option<CandidatePoolsBySelectionCriteria>,
}

#[async_trait]
pub trait Quoter: Send + Sync {
    fn protocol(&self) -> Protocol;

    async fn get_routes(&self, params: &QuoteParams) -> Result<GetRoutesResult, RouterError>;

    async fn get_quotes(
        &self,
        routes: Vec<Route>,
        params: &QuoteParams,
        candidate_pools: Option<CandidatePoolsBySelectionCriteria>,
    ) -> Result<GetQuotesResult, RouterError>;

    async fn get_routes_then_quotes(
        &self,
        params: &QuoteParams,
    ) -> Result<GetQuotesResult, RouterError> {
        let GetRoutesResult {
            routes,
            candidate_pools,
        } = self.get_routes(params).await?;
        debug!(
            protocol = %self.protocol(),
            routes = routes.len(),
            "Computed routes"
        );
        self.get_quotes(routes, params, candidate_pools).await
    }
}

/// Turns raw quoter output into quote records. Any quote missing a field is dropped.
pub(crate) fn build_records(
    route_quotes: Vec<RouteQuotes>,
    params: &QuoteParams,
) -> Vec<RouteWithValidQuote> {
    let mut records = Vec::new();
    let mut dropped = 0usize;
    for RouteQuotes { route, quotes } in route_quotes {
        for (index, amount_quote) in quotes.into_iter().enumerate() {
            let Some(percent) = params.percents.get(index).copied() else {
                dropped += 1;
                continue;
            };
            let (Some(quote), Some(sqrt_after), Some(ticks), Some(gas_estimate)) = (
                amount_quote.quote,
                amount_quote.sqrt_price_x96_after_list,
                amount_quote.initialized_ticks_crossed_list,
                amount_quote.gas_estimate,
            ) else {
                debug!(
                    route = %route,
                    amount = %amount_quote.amount,
                    "Dropping a null quote for route"
                );
                dropped += 1;
                continue;
            };

            let raw = RouteQuote {
                route: route.clone(),
                percent,
                trade_type: params.trade_type,
                amount: TokenAmount::new(params.amount_token().clone(), amount_quote.amount),
                quote: TokenAmount::new(params.quote_token.clone(), quote),
                sqrt_price_x96_after_list: sqrt_after,
                initialized_ticks_crossed_list: ticks,
                quoter_gas_estimate: gas_estimate,
            };
            let gas = params.gas_model.estimate_gas_cost(&raw);
            records.push(RouteWithValidQuote::new(raw, gas));
        }
    }
    if dropped > 0 {
        debug!(dropped, kept = records.len(), "Dropped null quotes");
    }
    records
}

/// Drops pools routing through fee-on-transfer or unsafe-transfer tokens. A validator
/// failure keeps every pool.
pub(crate) async fn apply_token_validation(
    validator: Option<&Arc<dyn TokenValidator>>,
    pools: Vec<Pool>,
    token_in: &Token,
    token_out: &Token,
    config: &ProviderConfig,
) -> Vec<Pool> {
    let Some(validator) = validator else {
        return pools;
    };
    let mut tokens: Vec<Token> = Vec::new();
    for pool in &pools {
        for token in [pool.token0(), pool.token1()] {
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
    }
    match validator.validate_tokens(&tokens, config).await {
        Ok(results) => results.filter_pools(pools, token_in, token_out),
        Err(err) => {
            warn!(error = %err, "Token validation failed; keeping all pools");
            pools
        }
    }
}
