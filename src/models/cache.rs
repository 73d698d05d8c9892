use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RouterError;

use super::protocol::Protocol;
use super::quote::RouteWithValidQuote;
use super::route::Route;
use super::token::{Token, TradeType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheMode {
    /// Never read or write the cache.
    Darkmode,
    /// Serve from cache when a fresh bundle exists.
    Livemode,
    /// Read the cache and quote fresh; report the difference.
    Tapcompare,
}

impl CacheMode {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheMode::Darkmode => "darkmode",
            CacheMode::Livemode => "livemode",
            CacheMode::Tapcompare => "tapcompare",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheMode {
    type Err = RouterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "darkmode" => Ok(CacheMode::Darkmode),
            "livemode" => Ok(CacheMode::Livemode),
            "tapcompare" => Ok(CacheMode::Tapcompare),
            _ => Err(RouterError::invalid(format!("Unknown cache mode: {value}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRoute {
    pub route: Route,
    pub percent: u32,
}

impl CachedRoute {
    pub fn protocol(&self) -> Protocol {
        self.route.protocol()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRoutes {
    pub routes: Vec<CachedRoute>,
    pub chain_id: u64,
    pub token_in: Token,
    pub token_out: Token,
    pub protocols_covered: Vec<Protocol>,
    pub block_number: u64,
    pub trade_type: TradeType,
    pub original_amount: String,
    pub blocks_to_live: u64,
}

impl CachedRoutes {
    /// Builds a bundle from the winning routes; `None` when there is nothing to cache.
    #[allow(clippy::too_many_arguments)]
    pub fn from_routes_with_valid_quotes(
        routes: &[RouteWithValidQuote],
        chain_id: u64,
        token_in: &Token,
        token_out: &Token,
        protocols_covered: &[Protocol],
        block_number: u64,
        trade_type: TradeType,
        original_amount: String,
    ) -> Option<Self> {
        if routes.is_empty() {
            return None;
        }
        Some(Self {
            routes: routes
                .iter()
                .map(|record| CachedRoute {
                    route: record.route().clone(),
                    percent: record.percent(),
                })
                .collect(),
            chain_id,
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            protocols_covered: Protocol::canonical_set(protocols_covered),
            block_number,
            trade_type,
            original_amount,
            blocks_to_live: 0,
        })
    }

    pub fn not_expired(&self, current_block: u64) -> bool {
        current_block.saturating_sub(self.block_number) <= self.blocks_to_live
    }

    pub fn routes_for(&self, protocol: Protocol) -> Vec<Route> {
        self.routes
            .iter()
            .filter(|cached| cached.protocol() == protocol)
            .map(|cached| cached.route.clone())
            .collect()
    }

    pub fn percents(&self) -> Vec<u32> {
        self.routes.iter().map(|cached| cached.percent).collect()
    }
}
