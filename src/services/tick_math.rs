//! V3 tick and sqrt-price arithmetic over big integers.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::error::RouterError;
use crate::models::pool::q96;

pub const MIN_TICK: i32 = -887_272;
pub const MAX_TICK: i32 = 887_272;

const RATIO_FACTORS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

/// sqrt(1.0001^tick) as a Q64.96 value.
pub fn get_sqrt_ratio_at_tick(tick: i32) -> Result<BigUint, RouterError> {
    if !(MIN_TICK..=MAX_TICK).contains(&tick) {
        return Err(RouterError::invalid(format!("tick {tick} out of range")));
    }
    let abs_tick = tick.unsigned_abs();

    let mut ratio = if abs_tick & 0x1 != 0 {
        BigUint::from(0xfffcb933bd6fad37aa2d162d1a594001u128)
    } else {
        BigUint::one() << 128
    };
    for (mask, factor) in RATIO_FACTORS {
        if abs_tick & mask != 0 {
            ratio = (ratio * BigUint::from(factor)) >> 128;
        }
    }

    if tick > 0 {
        let max = (BigUint::one() << 256) - BigUint::one();
        ratio = max / ratio;
    }

    // Q128.128 to Q64.96, rounding up.
    let shift_mask = (BigUint::one() << 32) - BigUint::one();
    let round_up = if (&ratio & &shift_mask).is_zero() {
        BigUint::zero()
    } else {
        BigUint::one()
    };
    Ok((ratio >> 32) + round_up)
}

/// Greatest tick whose sqrt ratio does not exceed `sqrt_ratio_x96`.
pub fn get_tick_at_sqrt_ratio(sqrt_ratio_x96: &BigUint) -> Result<i32, RouterError> {
    let min = get_sqrt_ratio_at_tick(MIN_TICK)?;
    let max = get_sqrt_ratio_at_tick(MAX_TICK)?;
    if *sqrt_ratio_x96 < min || *sqrt_ratio_x96 >= max {
        return Err(RouterError::invalid("sqrt ratio out of range"));
    }
    let (mut low, mut high) = (MIN_TICK, MAX_TICK);
    while low < high {
        let mid = low + (high - low + 1) / 2;
        if get_sqrt_ratio_at_tick(mid)? <= *sqrt_ratio_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

fn div_rounding_up(numerator: &BigUint, denominator: &BigUint) -> BigUint {
    let quotient = numerator / denominator;
    if (numerator % denominator).is_zero() {
        quotient
    } else {
        quotient + BigUint::one()
    }
}

/// Token0 owed for `liquidity` between two sqrt prices.
pub fn get_amount0_delta(
    sqrt_ratio_a_x96: &BigUint,
    sqrt_ratio_b_x96: &BigUint,
    liquidity: &BigUint,
    round_up: bool,
) -> BigUint {
    let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };
    if lower.is_zero() {
        return BigUint::zero();
    }
    let numerator1 = liquidity << 96;
    let numerator2 = upper - lower;
    if round_up {
        div_rounding_up(&div_rounding_up(&(numerator1 * numerator2), upper), lower)
    } else {
        numerator1 * numerator2 / upper / lower
    }
}

/// Token1 owed for `liquidity` between two sqrt prices.
pub fn get_amount1_delta(
    sqrt_ratio_a_x96: &BigUint,
    sqrt_ratio_b_x96: &BigUint,
    liquidity: &BigUint,
    round_up: bool,
) -> BigUint {
    let (lower, upper) = if sqrt_ratio_a_x96 > sqrt_ratio_b_x96 {
        (sqrt_ratio_b_x96, sqrt_ratio_a_x96)
    } else {
        (sqrt_ratio_a_x96, sqrt_ratio_b_x96)
    };
    let product = liquidity * (upper - lower);
    if round_up {
        div_rounding_up(&product, &q96())
    } else {
        product / q96()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_zero_is_unit_price() {
        assert_eq!(get_sqrt_ratio_at_tick(0).expect("in range"), q96());
    }

    #[test]
    fn extreme_ticks_match_protocol_bounds() {
        assert_eq!(
            get_sqrt_ratio_at_tick(MIN_TICK).expect("min"),
            BigUint::from(4295128739u64)
        );
        assert_eq!(
            get_sqrt_ratio_at_tick(MAX_TICK).expect("max"),
            BigUint::parse_bytes(b"1461446703485210103287273052203988822378723970342", 10)
                .expect("literal")
        );
        assert!(get_sqrt_ratio_at_tick(MAX_TICK + 1).is_err());
    }

    #[test]
    fn tick_lookup_inverts_sqrt_ratio() {
        for tick in [-200_000, -60, -1, 0, 1, 60, 123_456] {
            let ratio = get_sqrt_ratio_at_tick(tick).expect("ratio");
            assert_eq!(get_tick_at_sqrt_ratio(&ratio).expect("tick"), tick);
            assert_eq!(
                get_tick_at_sqrt_ratio(&(ratio + BigUint::one())).expect("tick"),
                tick
            );
        }
    }

    #[test]
    fn amount_deltas_are_symmetric_in_bounds() {
        let a = get_sqrt_ratio_at_tick(-600).expect("a");
        let b = get_sqrt_ratio_at_tick(600).expect("b");
        let liquidity = BigUint::from(10u64.pow(18));
        assert_eq!(
            get_amount0_delta(&a, &b, &liquidity, true),
            get_amount0_delta(&b, &a, &liquidity, true)
        );
        let down = get_amount1_delta(&a, &b, &liquidity, false);
        let up = get_amount1_delta(&a, &b, &liquidity, true);
        assert!(up == down || up == down + BigUint::one());
    }
}
