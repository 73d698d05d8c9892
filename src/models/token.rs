use std::fmt;
use std::hash::{Hash, Hasher};

use alloy_primitives::Address;
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    ExactInput,
    ExactOutput,
}

impl TradeType {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::ExactInput => "EXACT_INPUT",
            TradeType::ExactOutput => "EXACT_OUTPUT",
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ERC-20 token. Identity is (chain id, address); metadata is informational.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub chain_id: u64,
    pub address: Address,
    pub decimals: u8,
    pub symbol: String,
}

impl Token {
    pub fn new(chain_id: u64, address: Address, decimals: u8, symbol: impl Into<String>) -> Self {
        Self {
            chain_id,
            address,
            decimals,
            symbol: symbol.into(),
        }
    }

    /// Matches the pool ordering convention: token0 has the lower address.
    pub fn sorts_before(&self, other: &Token) -> bool {
        self.address < other.address
    }

    /// Lowercase hex address, the normalised form used as a map key.
    pub fn key(&self) -> String {
        format!("{:#x}", self.address)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:#x})", self.symbol, self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Currency {
    Native {
        chain_id: u64,
        symbol: String,
        decimals: u8,
    },
    Token(Token),
}

impl Currency {
    pub fn chain_id(&self) -> u64 {
        match self {
            Currency::Native { chain_id, .. } => *chain_id,
            Currency::Token(token) => token.chain_id,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Currency::Native { .. })
    }

    pub fn symbol(&self) -> &str {
        match self {
            Currency::Native { symbol, .. } => symbol,
            Currency::Token(token) => &token.symbol,
        }
    }
}

impl From<Token> for Currency {
    fn from(token: Token) -> Self {
        Currency::Token(token)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: Token,
    pub raw: BigUint,
}

impl TokenAmount {
    pub fn new(token: Token, raw: BigUint) -> Self {
        Self { token, raw }
    }

    pub fn zero(token: Token) -> Self {
        Self {
            token,
            raw: BigUint::zero(),
        }
    }

    /// Adds two amounts denominated in the same token.
    pub fn checked_add(&self, other: &TokenAmount) -> Option<TokenAmount> {
        if self.token != other.token {
            return None;
        }
        Some(TokenAmount {
            token: self.token.clone(),
            raw: &self.raw + &other.raw,
        })
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.raw, self.token.symbol)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyAmount {
    pub currency: Currency,
    pub raw: BigUint,
}

impl CurrencyAmount {
    pub fn new(currency: impl Into<Currency>, raw: BigUint) -> Self {
        Self {
            currency: currency.into(),
            raw,
        }
    }
}
