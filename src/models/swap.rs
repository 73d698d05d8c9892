use alloy_primitives::Address;
use num_bigint::{BigInt, BigUint};
use serde::{Deserialize, Serialize};

use super::fraction::Fraction;
use super::pool::V3Pool;
use super::quote::RouteWithValidQuote;
use super::token::{TokenAmount, TradeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapType {
    SwapRouter02,
    UniversalRouter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Succeeded,
    Failed,
    NotApproved,
    NotSupported,
}

impl SimulationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SimulationStatus::Succeeded => "succeeded",
            SimulationStatus::Failed => "failed",
            SimulationStatus::NotApproved => "not_approved",
            SimulationStatus::NotSupported => "not_supported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationConfig {
    pub from_address: Address,
}

/// Execution options supplied by the caller when calldata should be built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOptions {
    pub swap_type: SwapType,
    pub recipient: Address,
    pub slippage_tolerance_bps: u32,
    pub deadline: u64,
    pub simulate: Option<SimulationConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameters {
    pub to: Address,
    pub calldata: Vec<u8>,
    pub value: BigUint,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub trade_type: TradeType,
    pub input_amount: TokenAmount,
    pub output_amount: TokenAmount,
}

/// Result of a successful `route()` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRoute {
    pub quote: TokenAmount,
    pub quote_gas_adjusted: BigInt,
    pub estimated_gas_used: u64,
    pub estimated_gas_used_quote_token: TokenAmount,
    pub estimated_gas_used_usd: BigUint,
    pub gas_price_wei: BigUint,
    pub route: Vec<RouteWithValidQuote>,
    pub trade: Trade,
    pub method_parameters: Option<MethodParameters>,
    pub block_number: u64,
    pub simulation_status: Option<SimulationStatus>,
}

impl SwapRoute {
    pub fn total_percent(&self) -> u32 {
        self.route.iter().map(RouteWithValidQuote::percent).sum()
    }
}

/// A V3 liquidity position range the caller wants to fund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub pool: V3Pool,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapAndAddConfig {
    pub ratio_error_tolerance: Fraction,
    pub max_iterations: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapToRatioStatus {
    Success,
    NoRouteFound,
    NoSwapNeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapToRatioRoute {
    pub swap_route: SwapRoute,
    pub optimal_ratio: Fraction,
    pub post_swap_target_pool: V3Pool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwapToRatioResult {
    Success(Box<SwapToRatioRoute>),
    NoRouteFound { error: String },
    NoSwapNeeded,
}

impl SwapToRatioResult {
    pub fn status(&self) -> SwapToRatioStatus {
        match self {
            SwapToRatioResult::Success(_) => SwapToRatioStatus::Success,
            SwapToRatioResult::NoRouteFound { .. } => SwapToRatioStatus::NoRouteFound,
            SwapToRatioResult::NoSwapNeeded => SwapToRatioStatus::NoSwapNeeded,
        }
    }
}
