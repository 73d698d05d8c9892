use num_bigint::BigUint;
use num_traits::Zero;

use crate::config::ChainTuning;
use crate::models::fraction::Fraction;
use crate::models::quote::RouteWithValidQuote;
use crate::models::token::TradeType;
use crate::providers::L2GasData;
use crate::services::calldata;

use super::NativePricing;

const ZERO_BYTE_GAS: u64 = 4;
const NON_ZERO_BYTE_GAS: u64 = 16;
/// Signature bytes the sequencer adds to every transaction.
const UNSIGNED_TX_PADDING_BYTES: u64 = 68;

/// Rollup data-publishing cost for one candidate set of routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L1GasCost {
    pub gas_used_l1: u64,
    pub gas_cost_l1_native: BigUint,
    pub gas_cost_l1_quote: BigUint,
    pub gas_cost_l1_usd: BigUint,
}

pub fn calldata_gas(calldata: &[u8]) -> u64 {
    calldata
        .iter()
        .map(|byte| {
            if *byte == 0 {
                ZERO_BYTE_GAS
            } else {
                NON_ZERO_BYTE_GAS
            }
        })
        .sum()
}

/// Returns (l1 gas units, fee in wei) for an OP-stack transaction.
pub fn optimism_l1_fee(
    calldata: &[u8],
    l1_base_fee: &BigUint,
    scalar: &BigUint,
    decimals: u32,
    overhead: &BigUint,
) -> (BigUint, BigUint) {
    let l1_gas = overhead
        + BigUint::from(calldata_gas(calldata))
        + BigUint::from(UNSIGNED_TX_PADDING_BYTES * NON_ZERO_BYTE_GAS);
    let fee = &l1_gas * l1_base_fee * scalar / BigUint::from(10u32).pow(decimals);
    (l1_gas, fee)
}

/// Returns (l1 gas units, fee in wei) for an Arbitrum transaction.
pub fn arbitrum_l1_fee(
    calldata: &[u8],
    per_l2_tx_fee: &BigUint,
    per_l1_calldata_fee: &BigUint,
) -> (BigUint, BigUint) {
    let l1_gas = BigUint::from(calldata.len() as u64 * NON_ZERO_BYTE_GAS);
    let fee = per_l2_tx_fee + &l1_gas * per_l1_calldata_fee;
    (l1_gas, fee)
}

/// Prices the L1 fee of `routes` with the same pools the L2 gas model uses.
pub(crate) fn l1_gas_cost(
    chain: &ChainTuning,
    data: &L2GasData,
    pricing: &NativePricing,
    gas_price_wei: &BigUint,
    routes: &[RouteWithValidQuote],
) -> Option<L1GasCost> {
    let first = routes.first()?;
    let trade_type: TradeType = first.trade_type();
    let calldata = calldata::estimate_calldata(chain, routes, trade_type).ok()?;

    let (l1_gas, fee) = match data {
        L2GasData::Optimism {
            l1_base_fee,
            scalar,
            decimals,
            overhead,
        } => optimism_l1_fee(&calldata, l1_base_fee, scalar, *decimals, overhead),
        L2GasData::Arbitrum {
            per_l2_tx_fee,
            per_l1_calldata_fee,
        } => {
            let (_, fee) = arbitrum_l1_fee(&calldata, per_l2_tx_fee, per_l1_calldata_fee);
            // Arbitrum reports the L1 component as L2 gas at the current gas price.
            let gas = if gas_price_wei.is_zero() {
                BigUint::zero()
            } else {
                &fee / gas_price_wei
            };
            (gas, fee)
        }
    };

    let total_amount: BigUint = routes.iter().map(|route| &route.amount().raw).sum();
    let total_quote: BigUint = routes.iter().map(|route| &route.quote().raw).sum();
    let execution_price = Fraction::from_unsigned(&total_quote, &total_amount);

    Some(L1GasCost {
        gas_used_l1: u64::try_from(&l1_gas).unwrap_or(u64::MAX),
        gas_cost_l1_quote: pricing.native_to_quote(&fee, execution_price.as_ref()),
        gas_cost_l1_usd: pricing.native_to_usd(&fee),
        gas_cost_l1_native: fee,
    })
}
