use std::cmp::Ordering;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Signed, Zero};

/// Exact rational number over big integers. The denominator is kept positive.
#[derive(Debug, Clone)]
pub struct Fraction {
    numerator: BigInt,
    denominator: BigInt,
}

impl Fraction {
    /// Returns `None` for a zero denominator.
    pub fn new(numerator: impl Into<BigInt>, denominator: impl Into<BigInt>) -> Option<Self> {
        let numerator = numerator.into();
        let denominator = denominator.into();
        if denominator.is_zero() {
            return None;
        }
        if denominator.is_negative() {
            return Some(Self {
                numerator: -numerator,
                denominator: -denominator,
            });
        }
        Some(Self {
            numerator,
            denominator,
        })
    }

    pub fn from_integer(value: impl Into<BigInt>) -> Self {
        Self {
            numerator: value.into(),
            denominator: BigInt::one(),
        }
    }

    pub fn from_unsigned(numerator: &BigUint, denominator: &BigUint) -> Option<Self> {
        Self::new(
            BigInt::from(numerator.clone()),
            BigInt::from(denominator.clone()),
        )
    }

    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    pub fn one() -> Self {
        Self::from_integer(1)
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.numerator.is_negative()
    }

    pub fn add(&self, other: &Fraction) -> Fraction {
        Fraction {
            numerator: &self.numerator * &other.denominator + &other.numerator * &self.denominator,
            denominator: &self.denominator * &other.denominator,
        }
    }

    pub fn sub(&self, other: &Fraction) -> Fraction {
        Fraction {
            numerator: &self.numerator * &other.denominator - &other.numerator * &self.denominator,
            denominator: &self.denominator * &other.denominator,
        }
    }

    pub fn mul(&self, other: &Fraction) -> Fraction {
        Fraction {
            numerator: &self.numerator * &other.numerator,
            denominator: &self.denominator * &other.denominator,
        }
    }

    /// Returns `None` when dividing by zero.
    pub fn div(&self, other: &Fraction) -> Option<Fraction> {
        Fraction::new(
            &self.numerator * &other.denominator,
            &self.denominator * &other.numerator,
        )
    }

    pub fn invert(&self) -> Option<Fraction> {
        Fraction::new(self.denominator.clone(), self.numerator.clone())
    }

    pub fn abs(&self) -> Fraction {
        Fraction {
            numerator: self.numerator.abs(),
            denominator: self.denominator.clone(),
        }
    }

    /// Floor of the value.
    pub fn quotient(&self) -> BigInt {
        let (q, r) = (
            &self.numerator / &self.denominator,
            &self.numerator % &self.denominator,
        );
        if r.is_negative() {
            q - 1
        } else {
            q
        }
    }

    /// Floor of the value clamped at zero.
    pub fn quotient_unsigned(&self) -> BigUint {
        match self.quotient().to_biguint() {
            Some(value) => value,
            None => BigUint::zero(),
        }
    }

    /// Multiplies an unsigned amount by this fraction, rounding down and clamping at zero.
    pub fn apply(&self, amount: &BigUint) -> BigUint {
        self.mul(&Fraction::from_integer(BigInt::from(amount.clone())))
            .quotient_unsigned()
    }

    pub fn to_f64(&self) -> f64 {
        let scale = BigInt::from(10u64).pow(18);
        let scaled = (&self.numerator * &scale) / &self.denominator;
        let magnitude = scaled
            .magnitude()
            .to_string()
            .parse::<f64>()
            .unwrap_or(f64::MAX);
        let value = magnitude / 1e18;
        if scaled.sign() == Sign::Minus {
            -value
        } else {
            value
        }
    }
}

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_negative_denominator() {
        let value = Fraction::new(3, -4).expect("non-zero denominator");
        assert!(value.is_negative());
        assert_eq!(value.denominator(), &BigInt::from(4));
    }

    #[test]
    fn quotient_floors_toward_negative_infinity() {
        assert_eq!(Fraction::new(7, 2).unwrap().quotient(), BigInt::from(3));
        assert_eq!(Fraction::new(-7, 2).unwrap().quotient(), BigInt::from(-4));
        assert_eq!(Fraction::new(-7, 2).unwrap().quotient_unsigned(), BigUint::zero());
    }

    #[test]
    fn compares_by_cross_multiplication() {
        let half = Fraction::new(1, 2).unwrap();
        let two_quarters = Fraction::new(2, 4).unwrap();
        let third = Fraction::new(1, 3).unwrap();
        assert_eq!(half, two_quarters);
        assert!(third < half);
        assert!(half.sub(&third) > Fraction::zero());
    }

    #[test]
    fn division_by_zero_is_none() {
        assert!(Fraction::one().div(&Fraction::zero()).is_none());
        assert!(Fraction::zero().invert().is_none());
    }

    #[test]
    fn apply_scales_amount() {
        let price = Fraction::new(3, 2).unwrap();
        assert_eq!(price.apply(&BigUint::from(11u32)), BigUint::from(16u32));
        assert!((price.to_f64() - 1.5).abs() < 1e-12);
    }
}
