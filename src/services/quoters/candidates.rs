use std::collections::HashSet;

use alloy_primitives::Address;
use tracing::debug;

use crate::config::{ChainTuning, PoolSelection};
use crate::error::RouterError;
use crate::metrics;
use crate::models::protocol::Protocol;
use crate::models::token::{Token, TradeType};
use crate::providers::{
    CandidatePoolSource, PoolAccessor, PoolKey, PoolProvider, ProviderConfig, SubgraphPool,
};

/// Candidate pools grouped by the rule that selected them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePoolsBySelectionCriteria {
    pub protocol: Option<Protocol>,
    pub top_by_base_with_token_in: Vec<SubgraphPool>,
    pub top_by_base_with_token_out: Vec<SubgraphPool>,
    pub top_by_direct_swap_pool: Vec<SubgraphPool>,
    pub top_by_eth_quote_token_pool: Vec<SubgraphPool>,
    pub top_by_tvl: Vec<SubgraphPool>,
    pub top_by_tvl_using_token_in: Vec<SubgraphPool>,
    pub top_by_tvl_using_token_out: Vec<SubgraphPool>,
    pub top_by_tvl_using_token_in_second_hops: Vec<SubgraphPool>,
    pub top_by_tvl_using_token_out_second_hops: Vec<SubgraphPool>,
}

impl CandidatePoolsBySelectionCriteria {
    fn buckets(&self) -> [(&'static str, &Vec<SubgraphPool>); 9] {
        [
            ("top_by_base_with_token_in", &self.top_by_base_with_token_in),
            ("top_by_base_with_token_out", &self.top_by_base_with_token_out),
            ("top_by_direct_swap_pool", &self.top_by_direct_swap_pool),
            ("top_by_eth_quote_token_pool", &self.top_by_eth_quote_token_pool),
            ("top_by_tvl", &self.top_by_tvl),
            ("top_by_tvl_using_token_in", &self.top_by_tvl_using_token_in),
            ("top_by_tvl_using_token_out", &self.top_by_tvl_using_token_out),
            (
                "top_by_tvl_using_token_in_second_hops",
                &self.top_by_tvl_using_token_in_second_hops,
            ),
            (
                "top_by_tvl_using_token_out_second_hops",
                &self.top_by_tvl_using_token_out_second_hops,
            ),
        ]
    }

    /// Every selected pool once, in bucket order.
    pub fn all_pools(&self) -> Vec<&SubgraphPool> {
        let mut seen = HashSet::new();
        self.buckets()
            .into_iter()
            .flat_map(|(_, pools)| pools.iter())
            .filter(|pool| seen.insert(pool.id.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.all_pools().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Union of two selections, used for mixed routing.
    pub fn merge(mut self, other: CandidatePoolsBySelectionCriteria) -> Self {
        self.protocol = None;
        self.top_by_base_with_token_in.extend(other.top_by_base_with_token_in);
        self.top_by_base_with_token_out.extend(other.top_by_base_with_token_out);
        self.top_by_direct_swap_pool.extend(other.top_by_direct_swap_pool);
        self.top_by_eth_quote_token_pool.extend(other.top_by_eth_quote_token_pool);
        self.top_by_tvl.extend(other.top_by_tvl);
        self.top_by_tvl_using_token_in.extend(other.top_by_tvl_using_token_in);
        self.top_by_tvl_using_token_out.extend(other.top_by_tvl_using_token_out);
        self.top_by_tvl_using_token_in_second_hops
            .extend(other.top_by_tvl_using_token_in_second_hops);
        self.top_by_tvl_using_token_out_second_hops
            .extend(other.top_by_tvl_using_token_out_second_hops);
        self
    }

    fn emit_metrics(&self, protocol: Protocol) {
        for (name, pools) in self.buckets() {
            metrics::emit_pool_selection(protocol, name, pools.len());
        }
    }
}

struct Selector<'a> {
    sorted: &'a [SubgraphPool],
    selected: HashSet<String>,
}

impl<'a> Selector<'a> {
    fn new(sorted: &'a [SubgraphPool]) -> Self {
        Self {
            sorted,
            selected: HashSet::new(),
        }
    }

    fn take<F>(&mut self, limit: usize, predicate: F) -> Vec<SubgraphPool>
    where
        F: Fn(&SubgraphPool) -> bool,
    {
        let picked: Vec<SubgraphPool> = self
            .sorted
            .iter()
            .filter(|pool| !self.selected.contains(&pool.id) && predicate(pool))
            .take(limit)
            .cloned()
            .collect();
        self.mark(&picked);
        picked
    }

    fn mark(&mut self, pools: &[SubgraphPool]) {
        for pool in pools {
            self.selected.insert(pool.id.clone());
        }
    }

    /// Top pools pairing each base token with `token`, capped overall.
    fn base_pools(
        &mut self,
        base_tokens: &[Address],
        token: Address,
        per_base: usize,
        total: usize,
    ) -> Vec<SubgraphPool> {
        let mut pools: Vec<SubgraphPool> = Vec::new();
        for base in base_tokens {
            if *base == token {
                continue;
            }
            pools.extend(
                self.sorted
                    .iter()
                    .filter(|pool| {
                        !self.selected.contains(&pool.id)
                            && pool.involves(base)
                            && pool.involves(&token)
                            && !pools.iter().any(|picked| picked.id == pool.id)
                    })
                    .take(per_base)
                    .cloned()
                    .collect::<Vec<_>>(),
            );
        }
        sort_by_tvl(&mut pools);
        pools.truncate(total);
        self.mark(&pools);
        pools
    }

    fn second_hops(&mut self, first_hops: &[SubgraphPool], token: Address, limit: usize) -> Vec<SubgraphPool> {
        let mut pools = Vec::new();
        for pool in first_hops {
            let Some(next) = pool.other(&token) else {
                continue;
            };
            pools.extend(self.take(limit, |candidate| candidate.involves(&next)));
        }
        pools
    }
}

fn sort_by_tvl(pools: &mut [SubgraphPool]) {
    pools.sort_by(|a, b| {
        b.tvl_usd
            .partial_cmp(&a.tvl_usd)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Applies the selection buckets to a pool listing.
pub(crate) fn select_candidates(
    chain: &ChainTuning,
    protocol: Protocol,
    mut listing: Vec<SubgraphPool>,
    token_in: &Token,
    token_out: &Token,
    trade_type: TradeType,
    selection: &PoolSelection,
) -> CandidatePoolsBySelectionCriteria {
    listing.retain(|pool| pool.protocol == protocol);
    sort_by_tvl(&mut listing);
    let base_tokens: Vec<Address> = chain.base_tokens.iter().map(|token| token.address).collect();
    let (token_in, token_out) = (token_in.address, token_out.address);
    let native = chain.wrapped_native.address;
    let quote_token = match trade_type {
        TradeType::ExactInput => token_out,
        TradeType::ExactOutput => token_in,
    };

    let mut selector = Selector::new(&listing);
    let top_by_direct_swap_pool = selector.take(selection.top_n_direct_swaps, |pool| {
        pool.involves(&token_in) && pool.involves(&token_out)
    });
    let top_by_base_with_token_in = selector.base_pools(
        &base_tokens,
        token_in,
        selection.top_n_with_each_base_token,
        selection.top_n_with_base_token,
    );
    let top_by_base_with_token_out = selector.base_pools(
        &base_tokens,
        token_out,
        selection.top_n_with_each_base_token,
        selection.top_n_with_base_token,
    );
    let top_by_eth_quote_token_pool = if quote_token == native {
        Vec::new()
    } else {
        selector.take(1, |pool| pool.involves(&native) && pool.involves(&quote_token))
    };
    let top_by_tvl = selector.take(selection.top_n, |_| true);
    let top_by_tvl_using_token_in =
        selector.take(selection.top_n_token_in_out, |pool| pool.involves(&token_in));
    let top_by_tvl_using_token_out =
        selector.take(selection.top_n_token_in_out, |pool| pool.involves(&token_out));
    let top_by_tvl_using_token_in_second_hops =
        selector.second_hops(&top_by_tvl_using_token_in, token_in, selection.top_n_second_hop);
    let top_by_tvl_using_token_out_second_hops =
        selector.second_hops(&top_by_tvl_using_token_out, token_out, selection.top_n_second_hop);

    CandidatePoolsBySelectionCriteria {
        protocol: Some(protocol),
        top_by_base_with_token_in,
        top_by_base_with_token_out,
        top_by_direct_swap_pool,
        top_by_eth_quote_token_pool,
        top_by_tvl,
        top_by_tvl_using_token_in,
        top_by_tvl_using_token_out,
        top_by_tvl_using_token_in_second_hops,
        top_by_tvl_using_token_out_second_hops,
    }
}

/// Pool lookups match on (chain, address); resolved pools carry full token metadata, so
/// unknown tokens get placeholder metadata here.
fn lookup_token(chain: &ChainTuning, known: &[&Token], address: Address) -> Token {
    known
        .iter()
        .copied()
        .chain(chain.base_tokens.iter())
        .chain(chain.usd_tokens.iter())
        .find(|token| token.address == address)
        .cloned()
        .unwrap_or_else(|| Token::new(chain.chain_id, address, 18, format!("{:#x}", address)))
}

fn pool_keys(
    chain: &ChainTuning,
    pools: &[&SubgraphPool],
    token_in: &Token,
    token_out: &Token,
) -> Vec<PoolKey> {
    let known = [token_in, token_out];
    pools
        .iter()
        .map(|pool| {
            let token_a = lookup_token(chain, &known, pool.token0);
            let token_b = lookup_token(chain, &known, pool.token1);
            match pool.fee_tier {
                Some(fee) => PoolKey::V3 {
                    token_a,
                    token_b,
                    fee,
                },
                None => PoolKey::V2 { token_a, token_b },
            }
        })
        .collect()
}

pub(crate) struct CandidateRequest<'a> {
    pub chain: &'a ChainTuning,
    pub protocol: Protocol,
    pub token_in: &'a Token,
    pub token_out: &'a Token,
    pub trade_type: TradeType,
    pub selection: &'a PoolSelection,
    pub provider_config: &'a ProviderConfig,
}

/// Selects candidate pools from the listing and resolves them through the pool provider.
pub(crate) async fn get_candidate_pools(
    source: &dyn CandidatePoolSource,
    pool_provider: &dyn PoolProvider,
    request: CandidateRequest<'_>,
) -> Result<(PoolAccessor, CandidatePoolsBySelectionCriteria), RouterError> {
    let listing = source
        .get_candidate_pools(
            request.protocol,
            request.token_in,
            request.token_out,
            request.provider_config,
        )
        .await?;
    let listed = listing.len();
    let candidates = select_candidates(
        request.chain,
        request.protocol,
        listing,
        request.token_in,
        request.token_out,
        request.trade_type,
        request.selection,
    );
    candidates.emit_metrics(request.protocol);

    let selected = candidates.all_pools();
    debug!(
        protocol = %request.protocol,
        listed,
        selected = selected.len(),
        "Selected candidate pools"
    );
    let keys = pool_keys(request.chain, &selected, request.token_in, request.token_out);
    if keys.is_empty() {
        return Ok((PoolAccessor::default(), candidates));
    }
    let accessor = pool_provider.get_pools(&keys, request.provider_config).await?;
    Ok((accessor, candidates))
}
