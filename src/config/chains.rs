use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use alloy_primitives::{address, Address};

use crate::error::RouterError;
use crate::models::token::{Currency, Token};

use super::routing::{PoolSelection, RoutingConfig};

pub const MAINNET: u64 = 1;
pub const GOERLI: u64 = 5;
pub const OPTIMISM: u64 = 10;
pub const BSC: u64 = 56;
pub const POLYGON: u64 = 137;
pub const ARBITRUM_ONE: u64 = 42161;
pub const CELO: u64 = 42220;

const SWAP_ROUTER_02: Address = address!("68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum L1FeeKind {
    OptimismFamily,
    ArbitrumFamily,
}

/// Retry policy handed to the on-chain quote collaborator with every batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRetryOptions {
    pub retries: u32,
    pub min_timeout: Duration,
    pub max_timeout: Duration,
}

impl Default for QuoteRetryOptions {
    fn default() -> Self {
        Self {
            retries: 2,
            min_timeout: Duration::from_millis(100),
            max_timeout: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasHeuristics {
    pub base_swap_cost: u64,
    pub cost_per_hop: u64,
    pub cost_per_init_tick: u64,
    pub v2_base_swap_cost: u64,
    pub v2_cost_per_extra_hop: u64,
}

impl Default for GasHeuristics {
    fn default() -> Self {
        Self {
            base_swap_cost: 2_000,
            cost_per_hop: 80_000,
            cost_per_init_tick: 31_000,
            v2_base_swap_cost: 135_000,
            v2_cost_per_extra_hop: 50_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainTuning {
    pub chain_id: u64,
    pub name: &'static str,
    pub native_symbol: &'static str,
    pub wrapped_native: Token,
    pub usd_tokens: Vec<Token>,
    pub base_tokens: Vec<Token>,
    pub v2_supported: bool,
    pub mixed_supported: bool,
    pub simulation_supported: bool,
    pub l1_fee: Option<L1FeeKind>,
    pub gas: GasHeuristics,
    pub quote_retry: QuoteRetryOptions,
    pub multicall_chunk: usize,
    pub gas_limit_per_call: u64,
    pub quote_min_success_rate: f64,
    pub swap_router: Address,
    pub default_routing: RoutingConfig,
}

impl ChainTuning {
    pub fn native_currency(&self) -> Currency {
        Currency::Native {
            chain_id: self.chain_id,
            symbol: self.native_symbol.to_string(),
            decimals: self.wrapped_native.decimals,
        }
    }

    /// Resolves native currency to its wrapped token.
    pub fn wrap(&self, currency: &Currency) -> Result<Token, RouterError> {
        if currency.chain_id() != self.chain_id {
            return Err(RouterError::invalid(format!(
                "currency {} is on chain {}, router is on chain {}",
                currency.symbol(),
                currency.chain_id(),
                self.chain_id
            )));
        }
        Ok(match currency {
            Currency::Native { .. } => self.wrapped_native.clone(),
            Currency::Token(token) => token.clone(),
        })
    }

    pub fn is_wrapped_native(&self, token: &Token) -> bool {
        *token == self.wrapped_native
    }
}

/// Chain id to tuning record lookup.
#[derive(Debug, Clone, Default)]
pub struct ChainTable {
    chains: HashMap<u64, Arc<ChainTuning>>,
}

impl ChainTable {
    pub fn builtin() -> &'static ChainTable {
        static TABLE: OnceLock<ChainTable> = OnceLock::new();
        TABLE.get_or_init(|| {
            let mut table = ChainTable::default();
            for tuning in builtin_chains() {
                table.insert(tuning);
            }
            table
        })
    }

    pub fn insert(&mut self, tuning: ChainTuning) {
        self.chains.insert(tuning.chain_id, Arc::new(tuning));
    }

    pub fn get(&self, chain_id: u64) -> Result<Arc<ChainTuning>, RouterError> {
        self.chains
            .get(&chain_id)
            .cloned()
            .ok_or_else(|| RouterError::unsupported(format!("Unsupported chain id {chain_id}")))
    }

    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids = self.chains.keys().copied().collect::<Vec<_>>();
        ids.sort_unstable();
        ids
    }
}

fn token(chain_id: u64, address: Address, decimals: u8, symbol: &str) -> Token {
    Token::new(chain_id, address, decimals, symbol)
}

fn l1_routing() -> RoutingConfig {
    RoutingConfig {
        v3_pool_selection: PoolSelection {
            top_n: 2,
            top_n_direct_swaps: 2,
            top_n_token_in_out: 3,
            top_n_second_hop: 1,
            top_n_with_each_base_token: 3,
            top_n_with_base_token: 5,
        },
        v2_pool_selection: PoolSelection {
            top_n: 3,
            top_n_direct_swaps: 1,
            top_n_token_in_out: 5,
            top_n_second_hop: 2,
            top_n_with_each_base_token: 2,
            top_n_with_base_token: 6,
        },
        max_swaps_per_path: 3,
        min_splits: 1,
        max_splits: 7,
        distribution_percent: 5,
        ..RoutingConfig::default()
    }
}

fn l2_routing() -> RoutingConfig {
    RoutingConfig {
        v3_pool_selection: PoolSelection {
            top_n: 2,
            top_n_direct_swaps: 2,
            top_n_token_in_out: 2,
            top_n_second_hop: 1,
            top_n_with_each_base_token: 3,
            top_n_with_base_token: 3,
        },
        distribution_percent: 10,
        ..l1_routing()
    }
}

fn builtin_chains() -> Vec<ChainTuning> {
    let base = |chain_id: u64,
                name: &'static str,
                native_symbol: &'static str,
                wrapped_native: Token,
                usd_tokens: Vec<Token>| {
        let mut base_tokens = vec![wrapped_native.clone()];
        base_tokens.extend(usd_tokens.iter().cloned());
        ChainTuning {
            chain_id,
            name,
            native_symbol,
            wrapped_native,
            usd_tokens,
            base_tokens,
            v2_supported: false,
            mixed_supported: false,
            simulation_supported: true,
            l1_fee: None,
            gas: GasHeuristics::default(),
            quote_retry: QuoteRetryOptions::default(),
            multicall_chunk: 210,
            gas_limit_per_call: 705_000,
            quote_min_success_rate: 0.15,
            swap_router: SWAP_ROUTER_02,
            default_routing: l1_routing(),
        }
    };

    vec![
        ChainTuning {
            v2_supported: true,
            mixed_supported: true,
            ..base(
                MAINNET,
                "mainnet",
                "ETH",
                token(MAINNET, address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"), 18, "WETH"),
                vec![
                    token(MAINNET, address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"), 6, "USDC"),
                    token(MAINNET, address!("dAC17F958D2ee523a2206206994597C13D831ec7"), 6, "USDT"),
                    token(MAINNET, address!("6B175474E89094C44Da98b954EedeAC495271d0F"), 18, "DAI"),
                ],
            )
        },
        ChainTuning {
            v2_supported: true,
            mixed_supported: true,
            ..base(
                GOERLI,
                "goerli",
                "ETH",
                token(GOERLI, address!("B4FBF271143F4FBf7B91A5ded31805e42b2208d6"), 18, "WETH"),
                vec![token(GOERLI, address!("07865c6E87B9F70255377e024ace6630C1Eaa37F"), 6, "USDC")],
            )
        },
        ChainTuning {
            l1_fee: Some(L1FeeKind::OptimismFamily),
            multicall_chunk: 110,
            gas_limit_per_call: 1_200_000,
            quote_min_success_rate: 0.1,
            default_routing: l2_routing(),
            ..base(
                OPTIMISM,
                "optimism",
                "ETH",
                token(OPTIMISM, address!("4200000000000000000000000000000000000006"), 18, "WETH"),
                vec![
                    token(OPTIMISM, address!("7F5c764cBc14f9669B88837ca1490cCa17c31607"), 6, "USDC"),
                    token(OPTIMISM, address!("94b008aA00579c1307B0EF2c499aD98a8ce58e58"), 6, "USDT"),
                    token(OPTIMISM, address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1"), 18, "DAI"),
                ],
            )
        },
        ChainTuning {
            l1_fee: Some(L1FeeKind::ArbitrumFamily),
            gas: GasHeuristics {
                base_swap_cost: 5_000,
                ..GasHeuristics::default()
            },
            multicall_chunk: 10,
            gas_limit_per_call: 12_000_000,
            quote_min_success_rate: 0.1,
            default_routing: l2_routing(),
            ..base(
                ARBITRUM_ONE,
                "arbitrum",
                "ETH",
                token(ARBITRUM_ONE, address!("82aF49447D8a07e3bd95BD0d56f35241523fBab1"), 18, "WETH"),
                vec![
                    token(ARBITRUM_ONE, address!("FF970A61A04b1cA14834A43f5dE4533eBDDB5CC8"), 6, "USDC"),
                    token(ARBITRUM_ONE, address!("Fd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"), 6, "USDT"),
                    token(ARBITRUM_ONE, address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1"), 18, "DAI"),
                ],
            )
        },
        base(
            POLYGON,
            "polygon",
            "MATIC",
            token(POLYGON, address!("0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270"), 18, "WMATIC"),
            vec![
                token(POLYGON, address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"), 6, "USDC"),
                token(POLYGON, address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"), 18, "DAI"),
            ],
        ),
        ChainTuning {
            simulation_supported: false,
            multicall_chunk: 10,
            gas_limit_per_call: 5_000_000,
            quote_min_success_rate: 0.1,
            swap_router: address!("5615CDAb10dc425a742d643d949a7F474C01abc4"),
            default_routing: RoutingConfig {
                distribution_percent: 10,
                ..l1_routing()
            },
            ..base(
                CELO,
                "celo",
                "CELO",
                token(CELO, address!("471EcE3750Da237f93B8E339c536989b8978a438"), 18, "CELO"),
                vec![token(CELO, address!("765DE816845861e75A25fCA122bb6898B8B1282a"), 18, "cUSD")],
            )
        },
        ChainTuning {
            swap_router: address!("B971eF87ede563556b2ED4b1C0b0019111Dd85d2"),
            ..base(
                BSC,
                "bsc",
                "BNB",
                token(BSC, address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c"), 18, "WBNB"),
                vec![
                    token(BSC, address!("55d398326f99059fF775485246999027B3197955"), 18, "USDT"),
                    token(BSC, address!("e9e7CEA3DedcA5984780Bafc599bD69ADd087D56"), 18, "BUSD"),
                    token(BSC, address!("8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"), 18, "USDC"),
                ],
            )
        },
    ]
}
