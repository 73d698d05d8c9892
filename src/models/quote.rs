use alloy_primitives::Address;
use num_bigint::{BigInt, BigUint};

use super::protocol::Protocol;
use super::route::Route;
use super::token::{Token, TokenAmount, TradeType};

/// USD figures are fixed-point with this many decimals regardless of the stablecoin used.
pub const USD_DECIMALS: u32 = 18;

/// A raw quote for one route at one split, before gas is priced in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteQuote {
    pub route: Route,
    pub percent: u32,
    pub trade_type: TradeType,
    /// Input amount for exact-input trades, output amount for exact-output trades.
    pub amount: TokenAmount,
    /// Output amount for exact-input trades, required input for exact-output trades.
    pub quote: TokenAmount,
    pub sqrt_price_x96_after_list: Vec<BigUint>,
    pub initialized_ticks_crossed_list: Vec<u32>,
    pub quoter_gas_estimate: u64,
}

impl RouteQuote {
    pub fn quote_token(&self) -> &Token {
        &self.quote.token
    }

    /// Ticks crossed over the whole route, counted at least once per route.
    pub fn total_initialized_ticks_crossed(&self) -> u64 {
        let crossed: u64 = self
            .initialized_ticks_crossed_list
            .iter()
            .map(|ticks| u64::from(*ticks))
            .sum();
        crossed.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasCostEstimate {
    pub gas_estimate: u64,
    pub gas_cost_in_native: BigUint,
    pub gas_cost_in_token: TokenAmount,
    pub gas_cost_in_usd: BigUint,
}

/// Quote Record: a route at a split percent with its gas-adjusted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteWithValidQuote {
    quote: RouteQuote,
    gas: GasCostEstimate,
    quote_adjusted_for_gas: BigInt,
}

impl RouteWithValidQuote {
    pub fn new(quote: RouteQuote, gas: GasCostEstimate) -> Self {
        let raw = BigInt::from(quote.quote.raw.clone());
        let gas_cost = BigInt::from(gas.gas_cost_in_token.raw.clone());
        let quote_adjusted_for_gas = match quote.trade_type {
            TradeType::ExactInput => raw - gas_cost,
            TradeType::ExactOutput => raw + gas_cost,
        };
        Self {
            quote,
            gas,
            quote_adjusted_for_gas,
        }
    }

    pub fn route(&self) -> &Route {
        &self.quote.route
    }

    pub fn protocol(&self) -> Protocol {
        self.quote.route.protocol()
    }

    pub fn percent(&self) -> u32 {
        self.quote.percent
    }

    pub fn trade_type(&self) -> TradeType {
        self.quote.trade_type
    }

    pub fn amount(&self) -> &TokenAmount {
        &self.quote.amount
    }

    pub fn quote(&self) -> &TokenAmount {
        &self.quote.quote
    }

    pub fn raw_quote(&self) -> &RouteQuote {
        &self.quote
    }

    pub fn quote_token(&self) -> &Token {
        self.quote.quote_token()
    }

    pub fn gas(&self) -> &GasCostEstimate {
        &self.gas
    }

    pub fn gas_estimate(&self) -> u64 {
        self.gas.gas_estimate
    }

    pub fn quote_adjusted_for_gas(&self) -> &BigInt {
        &self.quote_adjusted_for_gas
    }

    pub fn pool_addresses(&self) -> Vec<Address> {
        self.quote.route.pool_addresses()
    }

    pub fn sqrt_price_x96_after_list(&self) -> &[BigUint] {
        &self.quote.sqrt_price_x96_after_list
    }

    pub fn initialized_ticks_crossed_list(&self) -> &[u32] {
        &self.quote.initialized_ticks_crossed_list
    }

    /// Copy with the split amount replaced; used when a rounding residual is attributed.
    pub fn with_amount(&self, amount: TokenAmount) -> Self {
        let mut copy = self.clone();
        copy.quote.amount = amount;
        copy
    }
}
