use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::RouterError;

use super::pool::Pool;
use super::protocol::Protocol;
use super::token::Token;

/// Ordered chain of pools connecting `input` to `output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    protocol: Protocol,
    pools: Vec<Pool>,
    input: Token,
    output: Token,
    token_path: Vec<Token>,
}

impl Route {
    pub fn new(
        protocol: Protocol,
        pools: Vec<Pool>,
        input: Token,
        output: Token,
    ) -> Result<Self, RouterError> {
        if pools.is_empty() {
            return Err(RouterError::invalid("route requires at least one pool"));
        }

        for pool in &pools {
            let matches = match protocol {
                Protocol::Mixed => true,
                other => pool.protocol() == other,
            };
            if !matches {
                return Err(RouterError::invalid(format!(
                    "{} route contains a {} pool {:#x}",
                    protocol,
                    pool.protocol(),
                    pool.address()
                )));
            }
            if pool.token0().chain_id != input.chain_id {
                return Err(RouterError::invalid("route pools span multiple chains"));
            }
        }

        let mut token_path = Vec::with_capacity(pools.len() + 1);
        token_path.push(input.clone());
        let mut current = input.clone();
        for (index, pool) in pools.iter().enumerate() {
            let next = pool.other_token(&current).cloned().ok_or_else(|| {
                RouterError::invalid(format!(
                    "pool {} ({:#x}) does not contain {}",
                    index,
                    pool.address(),
                    current
                ))
            })?;
            token_path.push(next.clone());
            current = next;
        }
        if current != output {
            return Err(RouterError::invalid(format!(
                "route ends at {} but output is {}",
                current, output
            )));
        }

        Ok(Self {
            protocol,
            pools,
            input,
            output,
            token_path,
        })
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn pools(&self) -> &[Pool] {
        &self.pools
    }

    pub fn input(&self) -> &Token {
        &self.input
    }

    pub fn output(&self) -> &Token {
        &self.output
    }

    pub fn token_path(&self) -> &[Token] {
        &self.token_path
    }

    pub fn hops(&self) -> usize {
        self.pools.len()
    }

    pub fn pool_addresses(&self) -> Vec<Address> {
        self.pools.iter().map(Pool::address).collect()
    }

    /// Stable identity of the path, independent of pool state.
    pub fn route_id(&self) -> String {
        let pools = self
            .pools
            .iter()
            .map(|pool| format!("{:#x}", pool.address()))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}[{}]", self.protocol, pools)
    }

    /// Contiguous runs of pools sharing a protocol, as (protocol, pools) pairs.
    pub fn sections(&self) -> Vec<(Protocol, &[Pool])> {
        let mut sections = Vec::new();
        let mut start = 0;
        for index in 1..=self.pools.len() {
            let boundary = index == self.pools.len()
                || self.pools[index].protocol() != self.pools[start].protocol();
            if boundary {
                sections.push((self.pools[start].protocol(), &self.pools[start..index]));
                start = index;
            }
        }
        sections
    }

    /// Swaps input and output; the pool order is reversed.
    pub fn reversed(&self) -> Result<Route, RouterError> {
        let mut pools = self.pools.clone();
        pools.reverse();
        Route::new(
            self.protocol,
            pools,
            self.output.clone(),
            self.input.clone(),
        )
    }

    /// Same route with pools replaced by fresher snapshots of the same addresses.
    pub fn with_pools(&self, pools: Vec<Pool>) -> Result<Route, RouterError> {
        if pools.len() != self.pools.len()
            || pools
                .iter()
                .zip(&self.pools)
                .any(|(fresh, old)| fresh.address() != old.address())
        {
            return Err(RouterError::internal("refreshed pools do not match route"));
        }
        Route::new(self.protocol, pools, self.input.clone(), self.output.clone())
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = self
            .token_path
            .iter()
            .map(|token| token.symbol.as_str())
            .collect::<Vec<_>>()
            .join(" -> ");
        write!(f, "[{}] {}", self.protocol, path)
    }
}
