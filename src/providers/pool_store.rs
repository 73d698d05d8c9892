use std::collections::{HashMap, HashSet};

use alloy_primitives::Address;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::RouterError;
use crate::models::pool::Pool;
use crate::models::protocol::Protocol;
use crate::models::token::Token;

use super::{
    BlockNumberProvider, CandidatePoolSource, PoolAccessor, PoolKey, PoolProvider, ProviderConfig,
    SubgraphPool,
};

#[derive(Debug, Clone)]
struct PoolEntry {
    pool: Pool,
    tvl_usd: f64,
}

#[derive(Debug, Default)]
struct ProtocolShard {
    pools: RwLock<HashMap<Address, PoolEntry>>,
}

pub struct UpdateSummary {
    pub block_number: u64,
    pub upserted: usize,
    pub removed: usize,
    pub total_pools: usize,
}

/// In-memory pool registry sharded by protocol, usable as a static pool list for
/// discovery, pool resolution and block tracking.
pub struct PoolStore {
    shards: HashMap<Protocol, ProtocolShard>,
    // Token -> pool address index to avoid scanning all pools per lookup.
    token_index: RwLock<HashMap<Address, HashSet<Address>>>,
    block_number: RwLock<u64>,
}

impl Default for PoolStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PoolStore {
    pub fn new() -> Self {
        let mut shards = HashMap::new();
        for protocol in [Protocol::V2, Protocol::V3] {
            shards.insert(protocol, ProtocolShard::default());
        }
        PoolStore {
            shards,
            token_index: RwLock::new(HashMap::new()),
            block_number: RwLock::new(0),
        }
    }

    /// Applies a block's worth of pool changes.
    pub async fn apply_update(
        &self,
        block_number: u64,
        upserts: Vec<(Pool, f64)>,
        removals: Vec<Address>,
    ) -> UpdateSummary {
        *self.block_number.write().await = block_number;

        let mut upserted = 0;
        for (pool, tvl_usd) in upserts {
            let address = pool.address();
            let tokens = [pool.token0().address, pool.token1().address];
            if let Some(shard) = self.shards.get(&pool.protocol()) {
                shard
                    .pools
                    .write()
                    .await
                    .insert(address, PoolEntry { pool, tvl_usd });
                let mut index = self.token_index.write().await;
                for token in tokens {
                    index.entry(token).or_default().insert(address);
                }
                upserted += 1;
            }
        }

        let mut removed = 0;
        for address in removals {
            let mut entry = None;
            for shard in self.shards.values() {
                if let Some(found) = shard.pools.write().await.remove(&address) {
                    entry = Some(found);
                    break;
                }
            }
            match entry {
                Some(entry) => {
                    let mut index = self.token_index.write().await;
                    for token in [entry.pool.token0().address, entry.pool.token1().address] {
                        if let Some(ids) = index.get_mut(&token) {
                            ids.remove(&address);
                            if ids.is_empty() {
                                index.remove(&token);
                            }
                        }
                    }
                    removed += 1;
                }
                None => debug!(pool = %format!("{:#x}", address), "Removal for unknown pool"),
            }
        }

        UpdateSummary {
            block_number,
            upserted,
            removed,
            total_pools: self.total_pools().await,
        }
    }

    pub async fn insert(&self, pool: Pool, tvl_usd: f64) {
        let block = self.current_block().await;
        self.apply_update(block, vec![(pool, tvl_usd)], Vec::new())
            .await;
    }

    pub async fn current_block(&self) -> u64 {
        *self.block_number.read().await
    }

    pub async fn total_pools(&self) -> usize {
        let mut total = 0;
        for shard in self.shards.values() {
            total += shard.pools.read().await.len();
        }
        total
    }

    pub async fn pools_for_token(&self, token: &Address) -> Vec<Pool> {
        let ids = match self.token_index.read().await.get(token) {
            Some(ids) => ids.clone(),
            None => return Vec::new(),
        };
        let mut pools = Vec::with_capacity(ids.len());
        for shard in self.shards.values() {
            let guard = shard.pools.read().await;
            pools.extend(
                ids.iter()
                    .filter_map(|id| guard.get(id))
                    .map(|entry| entry.pool.clone()),
            );
        }
        pools.sort_by_key(Pool::address);
        pools
    }

    async fn find(&self, protocol: Protocol, token_a: &Token, token_b: &Token, fee: Option<u32>) -> Vec<Pool> {
        let Some(shard) = self.shards.get(&protocol) else {
            return Vec::new();
        };
        let guard = shard.pools.read().await;
        guard
            .values()
            .map(|entry| &entry.pool)
            .filter(|pool| pool.involves_token(token_a) && pool.involves_token(token_b))
            .filter(|pool| match (pool, fee) {
                (Pool::V3(v3), Some(fee)) => v3.fee == fee,
                _ => true,
            })
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PoolProvider for PoolStore {
    async fn get_pools(
        &self,
        keys: &[PoolKey],
        _config: &ProviderConfig,
    ) -> Result<PoolAccessor, RouterError> {
        let mut pools = Vec::new();
        for key in keys {
            let found = match key {
                PoolKey::V2 { token_a, token_b } => {
                    self.find(Protocol::V2, token_a, token_b, None).await
                }
                PoolKey::V3 {
                    token_a,
                    token_b,
                    fee,
                } => self.find(Protocol::V3, token_a, token_b, Some(*fee)).await,
            };
            pools.extend(found);
        }
        Ok(PoolAccessor::new(pools))
    }
}

#[async_trait]
impl CandidatePoolSource for PoolStore {
    async fn get_candidate_pools(
        &self,
        protocol: Protocol,
        _token_in: &Token,
        _token_out: &Token,
        _config: &ProviderConfig,
    ) -> Result<Vec<SubgraphPool>, RouterError> {
        let Some(shard) = self.shards.get(&protocol) else {
            return Ok(Vec::new());
        };
        let guard = shard.pools.read().await;
        let mut listing = guard
            .values()
            .map(|entry| SubgraphPool {
                id: format!("{:#x}", entry.pool.address()),
                protocol,
                token0: entry.pool.token0().address,
                token1: entry.pool.token1().address,
                fee_tier: entry.pool.as_v3().map(|pool| pool.fee),
                tvl_usd: entry.tvl_usd,
            })
            .collect::<Vec<_>>();
        listing.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(listing)
    }
}

#[async_trait]
impl BlockNumberProvider for PoolStore {
    async fn get_block_number(&self) -> Result<u64, RouterError> {
        Ok(self.current_block().await)
    }
}
