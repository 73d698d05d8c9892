use alloy_primitives::Address;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

use super::fraction::Fraction;
use super::protocol::Protocol;
use super::token::Token;

/// V3 fee tiers in hundredths of a basis point.
pub const FEE_LOWEST: u32 = 100;
pub const FEE_LOW: u32 = 500;
pub const FEE_MEDIUM: u32 = 3000;
pub const FEE_HIGH: u32 = 10000;
pub const FEE_TIERS: [u32; 4] = [FEE_HIGH, FEE_MEDIUM, FEE_LOW, FEE_LOWEST];

pub fn q96() -> BigUint {
    BigUint::one() << 96
}

pub fn q192() -> BigUint {
    BigUint::one() << 192
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3Pool {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub fee: u32,
    pub sqrt_price_x96: BigUint,
    pub liquidity: u128,
    pub tick: i32,
}

impl V3Pool {
    /// Price of token0 in token1 raw units.
    pub fn token0_price(&self) -> Option<Fraction> {
        let squared = &self.sqrt_price_x96 * &self.sqrt_price_x96;
        Fraction::from_unsigned(&squared, &q192())
    }

    pub fn token1_price(&self) -> Option<Fraction> {
        self.token0_price().and_then(|price| price.invert())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct V2Pair {
    pub address: Address,
    pub token0: Token,
    pub token1: Token,
    pub reserve0: BigUint,
    pub reserve1: BigUint,
}

impl V2Pair {
    pub fn reserve_of(&self, token: &Token) -> Option<&BigUint> {
        if *token == self.token0 {
            Some(&self.reserve0)
        } else if *token == self.token1 {
            Some(&self.reserve1)
        } else {
            None
        }
    }

    pub fn token0_price(&self) -> Option<Fraction> {
        Fraction::from_unsigned(&self.reserve1, &self.reserve0)
    }

    pub fn token1_price(&self) -> Option<Fraction> {
        Fraction::from_unsigned(&self.reserve0, &self.reserve1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "protocol", rename_all = "UPPERCASE")]
pub enum Pool {
    V2(V2Pair),
    V3(V3Pool),
}

impl Pool {
    pub fn protocol(&self) -> Protocol {
        match self {
            Pool::V2(_) => Protocol::V2,
            Pool::V3(_) => Protocol::V3,
        }
    }

    pub fn address(&self) -> Address {
        match self {
            Pool::V2(pair) => pair.address,
            Pool::V3(pool) => pool.address,
        }
    }

    pub fn token0(&self) -> &Token {
        match self {
            Pool::V2(pair) => &pair.token0,
            Pool::V3(pool) => &pool.token0,
        }
    }

    pub fn token1(&self) -> &Token {
        match self {
            Pool::V2(pair) => &pair.token1,
            Pool::V3(pool) => &pool.token1,
        }
    }

    pub fn involves_token(&self, token: &Token) -> bool {
        self.token0() == token || self.token1() == token
    }

    pub fn other_token(&self, token: &Token) -> Option<&Token> {
        if self.token0() == token {
            Some(self.token1())
        } else if self.token1() == token {
            Some(self.token0())
        } else {
            None
        }
    }

    /// Mid price of `token` denominated in the other pool token, in raw units.
    pub fn price_of(&self, token: &Token) -> Option<Fraction> {
        let is_token0 = self.token0() == token;
        if !is_token0 && self.token1() != token {
            return None;
        }
        match (self, is_token0) {
            (Pool::V2(pair), true) => pair.token0_price(),
            (Pool::V2(pair), false) => pair.token1_price(),
            (Pool::V3(pool), true) => pool.token0_price(),
            (Pool::V3(pool), false) => pool.token1_price(),
        }
    }

    pub fn has_liquidity(&self) -> bool {
        match self {
            Pool::V2(pair) => !pair.reserve0.is_zero() && !pair.reserve1.is_zero(),
            Pool::V3(pool) => pool.liquidity > 0,
        }
    }

    pub fn as_v3(&self) -> Option<&V3Pool> {
        match self {
            Pool::V3(pool) => Some(pool),
            Pool::V2(_) => None,
        }
    }

    pub fn as_v2(&self) -> Option<&V2Pair> {
        match self {
            Pool::V2(pair) => Some(pair),
            Pool::V3(_) => None,
        }
    }
}
