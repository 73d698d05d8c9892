//! Position math for swap-to-ratio: how much of one token to sell so the remaining balances
//! match what a V3 range position consumes.

use num_bigint::{BigInt, BigUint};
use num_traits::Zero;

use crate::error::RouterError;
use crate::models::fraction::Fraction;
use crate::models::swap::Position;
use crate::models::token::TokenAmount;

use super::tick_math::{get_amount0_delta, get_amount1_delta, get_sqrt_ratio_at_tick};

/// Liquidity used when measuring the token0/token1 mix of a range.
const RATIO_PRECISION: u64 = 1_000_000_000_000_000_000;

/// Direction and starting point of a swap-to-ratio search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioPlan {
    /// Sell token0 for token1.
    pub zero_for_one: bool,
    pub optimal_ratio: Fraction,
    /// Price of the input token in output-token raw units.
    pub exchange_rate: Fraction,
}

/// Input-per-output ratio the position consumes at `sqrt_ratio_x96`. Zero outside the range.
pub fn calculate_optimal_ratio(
    position: &Position,
    sqrt_ratio_x96: &BigUint,
    zero_for_one: bool,
) -> Result<Fraction, RouterError> {
    let upper = get_sqrt_ratio_at_tick(position.tick_upper)?;
    let lower = get_sqrt_ratio_at_tick(position.tick_lower)?;
    if *sqrt_ratio_x96 > upper || *sqrt_ratio_x96 < lower {
        return Ok(Fraction::zero());
    }

    let precision = BigUint::from(RATIO_PRECISION);
    let amount0 = get_amount0_delta(sqrt_ratio_x96, &upper, &precision, true);
    let amount1 = get_amount1_delta(sqrt_ratio_x96, &lower, &precision, true);
    let ratio = Fraction::from_unsigned(&amount0, &amount1).ok_or_else(|| {
        RouterError::invalid("Position sits on its lower bound; no token1 is needed")
    })?;
    if zero_for_one {
        Ok(ratio)
    } else {
        ratio
            .invert()
            .ok_or_else(|| RouterError::invalid("Position needs no token0 at this price"))
    }
}

/// Picks which side to sell. Out-of-range positions need only one token.
pub fn plan_swap(
    position: &Position,
    token0_balance: &BigUint,
    token1_balance: &BigUint,
) -> Result<RatioPlan, RouterError> {
    let pool = &position.pool;
    let mut optimal_ratio = calculate_optimal_ratio(position, &pool.sqrt_price_x96, true)?;
    let zero_for_one = if pool.tick > position.tick_upper {
        true
    } else if pool.tick < position.tick_lower {
        false
    } else {
        let held = Fraction::from_unsigned(token0_balance, token1_balance);
        // Holding no token1 at all always means selling token0.
        let zero_for_one = held.map_or(true, |held| held > optimal_ratio);
        if !zero_for_one {
            optimal_ratio = optimal_ratio.invert().unwrap_or_else(Fraction::zero);
        }
        zero_for_one
    };

    let price = if zero_for_one {
        pool.token0_price()
    } else {
        pool.token1_price()
    };
    let exchange_rate = price.ok_or_else(|| RouterError::invalid("Target pool has no price"))?;
    Ok(RatioPlan {
        zero_for_one,
        optimal_ratio,
        exchange_rate,
    })
}

/// Input amount that leaves `(input - x) / (output + x * price)` at `optimal_ratio`.
pub fn calculate_ratio_amount_in(
    optimal_ratio: &Fraction,
    input_token_price: &Fraction,
    input_balance: &BigUint,
    output_balance: &BigUint,
) -> Result<BigUint, RouterError> {
    let numerator = Fraction::from_integer(BigInt::from(input_balance.clone()))
        .sub(&optimal_ratio.mul(&Fraction::from_integer(BigInt::from(output_balance.clone()))));
    let denominator = optimal_ratio.mul(input_token_price).add(&Fraction::one());
    let amount = numerator
        .div(&denominator)
        .ok_or_else(|| RouterError::internal("Degenerate swap-to-ratio denominator"))?;
    if amount.is_negative() {
        return Err(RouterError::invalid(
            "routeToRatio: insufficient input token amount",
        ));
    }
    Ok(amount.quotient_unsigned())
}

/// Balance ratio after a swap, input over output.
pub fn post_swap_ratio(
    input_balance: &TokenAmount,
    output_balance: &TokenAmount,
    swapped_in: &BigUint,
    swapped_out: &BigUint,
) -> Result<Fraction, RouterError> {
    if swapped_in > &input_balance.raw {
        return Err(RouterError::invalid(
            "Swap consumes more than the available input balance",
        ));
    }
    let remaining = &input_balance.raw - swapped_in;
    let received = &output_balance.raw + swapped_out;
    Fraction::from_unsigned(&remaining, &received)
        .ok_or_else(|| RouterError::internal("Empty output balance after swap"))
}

pub fn ratio_within_tolerance(
    new_ratio: &Fraction,
    optimal_ratio: &Fraction,
    tolerance: &Fraction,
) -> bool {
    if new_ratio == optimal_ratio {
        return true;
    }
    match new_ratio.div(optimal_ratio) {
        Some(relative) => relative.sub(&Fraction::one()).abs() < *tolerance,
        None => false,
    }
}

/// Exchange rate implied by a completed swap; zero when nothing came out.
pub fn realized_rate(amount_in: &BigUint, amount_out: &BigUint) -> Fraction {
    if amount_in.is_zero() {
        return Fraction::zero();
    }
    Fraction::from_unsigned(amount_out, amount_in).unwrap_or_else(Fraction::zero)
}
