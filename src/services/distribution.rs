use num_bigint::BigUint;
use num_traits::Zero;

use crate::error::RouterError;

pub(crate) const PERCENT_DENOMINATOR: u32 = 100;

fn mul_percent(amount: &BigUint, percent: u32) -> BigUint {
    if percent == 0 {
        return BigUint::zero();
    }
    (amount * BigUint::from(percent)) / BigUint::from(PERCENT_DENOMINATOR)
}

/// Split grid for a trade: `distribution_percent, 2 * distribution_percent, ..., 100`
/// with the matching floored amounts.
pub fn get_amount_distribution(
    amount: &BigUint,
    distribution_percent: u32,
) -> Result<(Vec<u32>, Vec<BigUint>), RouterError> {
    if distribution_percent == 0
        || distribution_percent > PERCENT_DENOMINATOR
        || PERCENT_DENOMINATOR % distribution_percent != 0
    {
        return Err(RouterError::invalid(format!(
            "distribution_percent must evenly divide 100, got {}",
            distribution_percent
        )));
    }

    let steps = PERCENT_DENOMINATOR / distribution_percent;
    let mut percents = Vec::with_capacity(steps as usize);
    let mut amounts = Vec::with_capacity(steps as usize);
    for step in 1..=steps {
        let percent = step * distribution_percent;
        percents.push(percent);
        amounts.push(mul_percent(amount, percent));
    }
    Ok((percents, amounts))
}

/// Amounts for an arbitrary percent set (used when replaying cached routes).
pub fn amounts_for_percents(amount: &BigUint, percents: &[u32]) -> Vec<BigUint> {
    percents
        .iter()
        .map(|percent| mul_percent(amount, *percent))
        .collect()
}

/// Exact allocation of `total` over chosen split percents. The percents must sum to 100;
/// the final entry absorbs whatever flooring left over.
pub fn allocate_amounts_by_percent(
    total: &BigUint,
    percents: &[u32],
) -> Result<Vec<BigUint>, RouterError> {
    if percents.is_empty() {
        return Err(RouterError::invalid("split percents must not be empty"));
    }
    let sum: u32 = percents.iter().sum();
    if sum != PERCENT_DENOMINATOR {
        return Err(RouterError::invalid(format!(
            "split percents must sum to 100, got {}",
            sum
        )));
    }

    let last_index = percents.len() - 1;
    let mut allocated = BigUint::zero();
    let mut amounts = Vec::with_capacity(percents.len());
    for (index, percent) in percents.iter().enumerate() {
        if *percent == 0 {
            return Err(RouterError::invalid("split percent must be > 0"));
        }
        if index < last_index {
            let amount = mul_percent(total, *percent);
            allocated += &amount;
            amounts.push(amount);
        } else {
            amounts.push(total - &allocated);
        }
    }
    Ok(amounts)
}
