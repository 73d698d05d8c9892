use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::RouterError;
use crate::models::pool::{Pool, V2Pair};
use crate::models::route::Route;
use crate::models::token::{Token, TradeType};

use super::{AmountQuote, RouteQuotes, V2QuoteProvider};

const FEE_NUMERATOR: u32 = 997;
const FEE_DENOMINATOR: u32 = 1000;

/// Constant-product quoting against the reserves carried by each route's pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalV2QuoteProvider;

impl LocalV2QuoteProvider {
    pub fn new() -> Self {
        Self
    }
}

fn reserves<'a>(pair: &'a V2Pair, token_in: &Token) -> Option<(&'a BigUint, &'a BigUint)> {
    if *token_in == pair.token0 {
        Some((&pair.reserve0, &pair.reserve1))
    } else if *token_in == pair.token1 {
        Some((&pair.reserve1, &pair.reserve0))
    } else {
        None
    }
}

pub fn get_amount_out(pair: &V2Pair, token_in: &Token, amount_in: &BigUint) -> Option<BigUint> {
    let (reserve_in, reserve_out) = reserves(pair, token_in)?;
    if reserve_in.is_zero() || reserve_out.is_zero() || amount_in.is_zero() {
        return None;
    }
    let amount_in_with_fee = amount_in * BigUint::from(FEE_NUMERATOR);
    let numerator = &amount_in_with_fee * reserve_out;
    let denominator = reserve_in * BigUint::from(FEE_DENOMINATOR) + &amount_in_with_fee;
    let out = numerator / denominator;
    (!out.is_zero()).then_some(out)
}

pub fn get_amount_in(pair: &V2Pair, token_out: &Token, amount_out: &BigUint) -> Option<BigUint> {
    let token_in = if *token_out == pair.token0 {
        &pair.token1
    } else if *token_out == pair.token1 {
        &pair.token0
    } else {
        return None;
    };
    let (reserve_in, reserve_out) = reserves(pair, token_in)?;
    if reserve_in.is_zero() || amount_out.is_zero() || amount_out >= reserve_out {
        return None;
    }
    let numerator = reserve_in * amount_out * BigUint::from(FEE_DENOMINATOR);
    let denominator = (reserve_out - amount_out) * BigUint::from(FEE_NUMERATOR);
    Some(numerator / denominator + BigUint::one())
}

fn quote_route(route: &Route, trade_type: TradeType, amount: &BigUint) -> Option<BigUint> {
    let path = route.token_path();
    match trade_type {
        TradeType::ExactInput => {
            let mut current = amount.clone();
            for (pool, token_in) in route.pools().iter().zip(path) {
                let pair = pool_as_pair(pool)?;
                current = get_amount_out(pair, token_in, &current)?;
            }
            Some(current)
        }
        TradeType::ExactOutput => {
            let mut current = amount.clone();
            for (pool, token_out) in route.pools().iter().zip(path.iter().skip(1)).rev() {
                let pair = pool_as_pair(pool)?;
                current = get_amount_in(pair, token_out, &current)?;
            }
            Some(current)
        }
    }
}

fn pool_as_pair(pool: &Pool) -> Option<&V2Pair> {
    pool.as_v2()
}

impl V2QuoteProvider for LocalV2QuoteProvider {
    fn get_quotes_many(
        &self,
        trade_type: TradeType,
        amounts: &[BigUint],
        routes: &[Route],
    ) -> Result<Vec<RouteQuotes>, RouterError> {
        routes
            .iter()
            .map(|route| {
                if route.pools().iter().any(|pool| pool.as_v2().is_none()) {
                    return Err(RouterError::invalid(format!(
                        "V2 quote provider received non-V2 route {route}"
                    )));
                }
                let quotes = amounts
                    .iter()
                    .map(|amount| AmountQuote {
                        amount: amount.clone(),
                        quote: quote_route(route, trade_type, amount),
                        sqrt_price_x96_after_list: Some(Vec::new()),
                        initialized_ticks_crossed_list: Some(Vec::new()),
                        gas_estimate: Some(0),
                    })
                    .collect();
                Ok(RouteQuotes {
                    route: route.clone(),
                    quotes,
                })
            })
            .collect()
    }
}
