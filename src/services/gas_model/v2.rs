use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::debug;

use crate::config::{ChainTuning, GasHeuristics};
use crate::error::RouterError;
use crate::models::pool::Pool;
use crate::models::quote::{GasCostEstimate, RouteQuote};
use crate::models::token::Token;
use crate::providers::{PoolAccessor, PoolKey};

use super::{GasModel, GasModelFactory, GasModelRequest, NativePricing};

/// Pairs holding less than this many whole native units are too shallow to price gas.
const MIN_NATIVE_RESERVE_UNITS: u32 = 10;

pub struct V2HeuristicGasModel {
    chain: Arc<ChainTuning>,
    gas_price_wei: BigUint,
    pricing: NativePricing,
}

impl V2HeuristicGasModel {
    pub(crate) fn gas_units(gas: &GasHeuristics, hops: usize) -> u64 {
        let extra_hops = hops.saturating_sub(1) as u64;
        gas.v2_base_swap_cost + gas.v2_cost_per_extra_hop * extra_hops
    }
}

impl GasModel for V2HeuristicGasModel {
    fn estimate_gas_cost(&self, quote: &RouteQuote) -> GasCostEstimate {
        let units = Self::gas_units(&self.chain.gas, quote.route.hops());
        self.pricing.estimate(units, &self.gas_price_wei, quote)
    }
}

fn deepest_native_pair(accessor: &PoolAccessor, chain: &ChainTuning, token: &Token) -> Option<Pool> {
    let native = &chain.wrapped_native;
    let pair = accessor.get_v2_pair(token, native)?;
    let reserve = pair.reserve_of(native)?;
    let minimum =
        BigUint::from(MIN_NATIVE_RESERVE_UNITS) * BigUint::from(10u32).pow(u32::from(native.decimals));
    if *reserve < minimum {
        debug!(
            pair = %format!("{:#x}", pair.address),
            reserve = %reserve,
            "V2 native pair below minimum reserve"
        );
        return None;
    }
    Some(Pool::V2(pair.clone()))
}

#[derive(Debug, Default, Clone, Copy)]
pub struct V2HeuristicGasModelFactory;

#[async_trait]
impl GasModelFactory for V2HeuristicGasModelFactory {
    async fn build_gas_model(
        &self,
        request: GasModelRequest,
    ) -> Result<Arc<dyn GasModel>, RouterError> {
        let chain = request.chain.clone();
        let provider = request
            .v2_pool_provider
            .clone()
            .ok_or_else(|| RouterError::internal("V2 gas model requires a V2 pool provider"))?;

        let mut counterparts = vec![request.quote_token.clone(), request.amount_token.clone()];
        counterparts.extend(chain.usd_tokens.iter().cloned());
        let keys = counterparts
            .iter()
            .filter(|token| **token != chain.wrapped_native)
            .map(|token| PoolKey::V2 {
                token_a: chain.wrapped_native.clone(),
                token_b: token.clone(),
            })
            .collect::<Vec<_>>();
        let accessor = provider.get_pools(&keys, &request.provider_config).await?;

        let mut usd_pool: Option<(Pool, Token, BigUint)> = None;
        for usd in &chain.usd_tokens {
            let Some(pool) = deepest_native_pair(&accessor, &chain, usd) else {
                continue;
            };
            let depth = pool
                .as_v2()
                .and_then(|pair| pair.reserve_of(&chain.wrapped_native).cloned())
                .unwrap_or_default();
            if usd_pool.as_ref().map_or(true, |(_, _, best)| depth > *best) {
                usd_pool = Some((pool, usd.clone(), depth));
            }
        }

        let pricing = NativePricing::new(
            &chain,
            request.amount_token.clone(),
            request.quote_token.clone(),
            deepest_native_pair(&accessor, &chain, &request.quote_token),
            deepest_native_pair(&accessor, &chain, &request.amount_token),
            usd_pool.map(|(pool, token, _)| (pool, token)),
        );
        Ok(Arc::new(V2HeuristicGasModel {
            chain,
            gas_price_wei: request.gas_price_wei,
            pricing,
        }))
    }
}

#[cfg(test)]
mod tests {
    use num_bigint::BigUint;
    use num_traits::Zero;

    use super::super::test_support::*;
    use super::*;
    use crate::models::protocol::Protocol;
    use crate::models::token::TokenAmount;
    use crate::providers::ProviderConfig;

    fn ether(units: u64) -> BigUint {
        BigUint::from(units) * BigUint::from(10u64.pow(18))
    }

    #[test]
    fn extra_hops_cost_less_than_base() {
        let gas = GasHeuristics::default();
        assert_eq!(V2HeuristicGasModel::gas_units(&gas, 1), 135_000);
        assert_eq!(V2HeuristicGasModel::gas_units(&gas, 3), 235_000);
    }

    #[tokio::test]
    async fn shallow_native_pair_is_ignored() {
        let chain = mainnet();
        let weth = chain.wrapped_native.clone();
        let dai = chain.usd_tokens[2].clone();
        let usdc = usdc(&chain);
        let shallow = v2_pair(1, &weth, &dai, ether(1), ether(2_000));
        let provider = Arc::new(StaticPools::new(vec![shallow.clone()]));
        let model = V2HeuristicGasModelFactory
            .build_gas_model(GasModelRequest {
                chain: chain.clone(),
                gas_price_wei: BigUint::from(1u32),
                v3_pool_provider: provider.clone(),
                v2_pool_provider: Some(provider),
                amount_token: usdc.clone(),
                quote_token: dai.clone(),
                l2_gas_data: None,
                provider_config: ProviderConfig::default(),
            })
            .await
            .expect("model");

        let route_pool = v2_pair(2, &usdc, &dai, ether(1_000), ether(1_000));
        let quote = quote_for(
            single_hop(Protocol::V2, route_pool, &usdc, &dai),
            TokenAmount::new(usdc, BigUint::from(1_000u32)),
            TokenAmount::new(dai, BigUint::from(1_000u32)),
            Vec::new(),
        );
        let estimate = model.estimate_gas_cost(&quote);
        assert_eq!(estimate.gas_estimate, 135_000);
        assert!(estimate.gas_cost_in_token.raw.is_zero());
    }

    #[tokio::test]
    async fn deep_native_pair_prices_gas() {
        let chain = mainnet();
        let weth = chain.wrapped_native.clone();
        let dai = chain.usd_tokens[2].clone();
        let usdc = usdc(&chain);
        let deep = v2_pair(1, &weth, &dai, ether(100), ether(200_000));
        let provider = Arc::new(StaticPools::new(vec![deep]));
        let model = V2HeuristicGasModelFactory
            .build_gas_model(GasModelRequest {
                chain: chain.clone(),
                gas_price_wei: BigUint::from(1u32),
                v3_pool_provider: provider.clone(),
                v2_pool_provider: Some(provider),
                amount_token: usdc.clone(),
                quote_token: dai.clone(),
                l2_gas_data: None,
                provider_config: ProviderConfig::default(),
            })
            .await
            .expect("model");

        let route_pool = v2_pair(2, &usdc, &dai, ether(1_000), ether(1_000));
        let quote = quote_for(
            single_hop(Protocol::V2, route_pool, &usdc, &dai),
            TokenAmount::new(usdc, BigUint::from(1_000u32)),
            TokenAmount::new(dai.clone(), BigUint::from(1_000u32)),
            Vec::new(),
        );
        let estimate = model.estimate_gas_cost(&quote);
        // 135000 wei at 2000 DAI per WETH.
        assert_eq!(estimate.gas_cost_in_token.raw, BigUint::from(135_000u64 * 2_000));
        assert!(!estimate.gas_cost_in_usd.is_zero());
    }
}
