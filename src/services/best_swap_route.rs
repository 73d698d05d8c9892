//! Split selection across quote records.
//!
//! Records are bucketed by split percent and sorted best-first. A breadth-first search then
//! grows partial combinations one split per layer, always taking the best unused route at
//! each percent, until the combination covers 100% or the split cap is reached.

use std::collections::{HashMap, HashSet, VecDeque};

use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use tracing::{debug, info};

use crate::config::RoutingConfig;
use crate::error::RouterError;
use crate::models::quote::RouteWithValidQuote;
use crate::models::token::{TokenAmount, TradeType};

use super::distribution::{allocate_amounts_by_percent, PERCENT_DENOMINATOR};
use super::gas_model::GasModel;

/// The winning combination with its aggregate figures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestSwapRoute {
    pub quote: TokenAmount,
    pub quote_gas_adjusted: BigInt,
    pub estimated_gas_used: u64,
    pub estimated_gas_used_quote_token: TokenAmount,
    pub estimated_gas_used_usd: BigUint,
    pub routes: Vec<RouteWithValidQuote>,
}

struct Candidate {
    routes: Vec<RouteWithValidQuote>,
    percent_index: usize,
    remaining: u32,
}

struct Scored {
    routes: Vec<RouteWithValidQuote>,
    adjusted: BigInt,
}

/// Orders adjusted values best-first for the trade direction.
fn better(trade_type: TradeType, candidate: &BigInt, incumbent: &BigInt) -> bool {
    match trade_type {
        TradeType::ExactInput => candidate > incumbent,
        TradeType::ExactOutput => candidate < incumbent,
    }
}

/// Aggregate gas-adjusted value of a full combination, L1 fees included once.
fn score(
    routes: &[RouteWithValidQuote],
    trade_type: TradeType,
    gas_model: &dyn GasModel,
) -> BigInt {
    let mut total: BigInt = routes
        .iter()
        .map(RouteWithValidQuote::quote_adjusted_for_gas)
        .sum();
    if let Some(l1) = gas_model.calculate_l1_gas_fees(routes) {
        let l1_quote = BigInt::from(l1.gas_cost_l1_quote);
        match trade_type {
            TradeType::ExactInput => total -= l1_quote,
            TradeType::ExactOutput => total += l1_quote,
        }
    }
    total
}

fn first_unused<'a>(
    candidates: &'a [RouteWithValidQuote],
    used: &HashSet<String>,
) -> Option<&'a RouteWithValidQuote> {
    candidates
        .iter()
        .find(|record| !used.contains(&record.route().route_id()))
}

/// Finds the combination of records covering exactly 100% with the best aggregate
/// gas-adjusted value. `Ok(None)` when no combination covers the full amount.
pub fn get_best_swap_route(
    amount: &TokenAmount,
    percents: &[u32],
    records: Vec<RouteWithValidQuote>,
    trade_type: TradeType,
    routing_config: &RoutingConfig,
    gas_model: &dyn GasModel,
) -> Result<Option<BestSwapRoute>, RouterError> {
    let mut by_percent: HashMap<u32, Vec<RouteWithValidQuote>> = HashMap::new();
    let mut dropped = 0usize;
    for record in records {
        if record.quote().raw.is_zero() {
            dropped += 1;
            continue;
        }
        by_percent.entry(record.percent()).or_default().push(record);
    }
    if dropped > 0 {
        debug!(dropped, "Ignoring records with a zero quote");
    }
    for bucket in by_percent.values_mut() {
        bucket.sort_by(|a, b| {
            let (a, b) = (a.quote_adjusted_for_gas(), b.quote_adjusted_for_gas());
            match trade_type {
                TradeType::ExactInput => b.cmp(a),
                TradeType::ExactOutput => a.cmp(b),
            }
        });
    }

    let mut percents: Vec<u32> = percents.to_vec();
    percents.sort_unstable();
    percents.dedup();

    let mut best: Option<Scored> = None;
    let consider = |routes: Vec<RouteWithValidQuote>, best: &mut Option<Scored>| {
        let adjusted = score(&routes, trade_type, gas_model);
        let improves = best
            .as_ref()
            .map_or(true, |incumbent| better(trade_type, &adjusted, &incumbent.adjusted));
        if improves {
            *best = Some(Scored { routes, adjusted });
        }
    };

    if routing_config.min_splits <= 1 {
        if let Some(top) = by_percent.get(&PERCENT_DENOMINATOR).and_then(|bucket| bucket.first()) {
            consider(vec![top.clone()], &mut best);
        }
    }

    let mut queue: VecDeque<Candidate> = VecDeque::new();
    for (index, percent) in percents.iter().enumerate().rev() {
        let Some(bucket) = by_percent.get(percent) else {
            continue;
        };
        for record in bucket.iter().take(2) {
            queue.push_back(Candidate {
                routes: vec![record.clone()],
                percent_index: index,
                remaining: PERCENT_DENOMINATOR.saturating_sub(*percent),
            });
        }
    }

    let mut splits = 1usize;
    while !queue.is_empty() {
        splits += 1;
        if splits > routing_config.max_splits {
            break;
        }
        let mut layer = queue.len();
        while layer > 0 {
            layer -= 1;
            let Some(Candidate {
                routes,
                percent_index,
                remaining,
            }) = queue.pop_front()
            else {
                break;
            };
            let used: HashSet<String> = routes.iter().map(|record| record.route().route_id()).collect();

            for index in (0..=percent_index).rev() {
                let percent = percents[index];
                if percent > remaining {
                    continue;
                }
                let Some(bucket) = by_percent.get(&percent) else {
                    continue;
                };
                let Some(record) = first_unused(bucket, &used) else {
                    continue;
                };

                let remaining = remaining - percent;
                let mut extended = routes.clone();
                extended.push(record.clone());
                if remaining == 0 {
                    if splits >= routing_config.min_splits {
                        consider(extended, &mut best);
                    }
                } else {
                    queue.push_back(Candidate {
                        routes: extended,
                        percent_index: index,
                        remaining,
                    });
                }
            }
        }
    }

    let Some(Scored { routes, adjusted }) = best else {
        info!(
            trade_type = %trade_type,
            percents = percents.len(),
            "No combination of routes covers the full amount"
        );
        return Ok(None);
    };
    finalize(amount, routes, adjusted, trade_type, gas_model).map(Some)
}

fn finalize(
    amount: &TokenAmount,
    mut routes: Vec<RouteWithValidQuote>,
    quote_gas_adjusted: BigInt,
    trade_type: TradeType,
    gas_model: &dyn GasModel,
) -> Result<BestSwapRoute, RouterError> {
    routes.sort_by(|a, b| {
        let (a, b) = (a.quote_adjusted_for_gas(), b.quote_adjusted_for_gas());
        match trade_type {
            TradeType::ExactInput => b.cmp(a),
            TradeType::ExactOutput => a.cmp(b),
        }
    });

    let percents: Vec<u32> = routes.iter().map(RouteWithValidQuote::percent).collect();
    let amounts = allocate_amounts_by_percent(&amount.raw, &percents)?;
    let routes: Vec<RouteWithValidQuote> = routes
        .iter()
        .zip(amounts)
        .map(|(record, raw)| record.with_amount(TokenAmount::new(amount.token.clone(), raw)))
        .collect();

    let quote_token = routes
        .first()
        .map(|record| record.quote_token().clone())
        .ok_or_else(|| RouterError::internal("selected combination is empty"))?;
    let mut quote = BigUint::zero();
    let mut gas_used = 0u64;
    let mut gas_quote = BigUint::zero();
    let mut gas_usd = BigUint::zero();
    for record in &routes {
        quote += &record.quote().raw;
        gas_used += record.gas_estimate();
        gas_quote += &record.gas().gas_cost_in_token.raw;
        gas_usd += &record.gas().gas_cost_in_usd;
    }
    if let Some(l1) = gas_model.calculate_l1_gas_fees(&routes) {
        gas_used += l1.gas_used_l1;
        gas_quote += l1.gas_cost_l1_quote;
        gas_usd += l1.gas_cost_l1_usd;
    }

    info!(
        trade_type = %trade_type,
        splits = routes.len(),
        quote = %quote,
        quote_gas_adjusted = %quote_gas_adjusted,
        estimated_gas_used = gas_used,
        routes = %routes
            .iter()
            .map(|record| format!("{}% {}", record.percent(), record.route()))
            .collect::<Vec<_>>()
            .join(", "),
        "Selected best swap route"
    );

    Ok(BestSwapRoute {
        quote: TokenAmount::new(quote_token.clone(), quote),
        quote_gas_adjusted,
        estimated_gas_used: gas_used,
        estimated_gas_used_quote_token: TokenAmount::new(quote_token, gas_quote),
        estimated_gas_used_usd: gas_usd,
        routes,
    })
}
