use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;

use crate::config::{ChainTuning, GasHeuristics};
use crate::error::RouterError;
use crate::models::protocol::Protocol;
use crate::models::quote::{GasCostEstimate, RouteQuote};

use super::{resolve_v3_native_pricing, GasModel, GasModelFactory, GasModelRequest, NativePricing};

/// Mixed routes pay the V3 or V2 cost of each contiguous section, plus one base cost and
/// the V3 tick cost.
pub struct MixedRouteHeuristicGasModel {
    chain: Arc<ChainTuning>,
    gas_price_wei: BigUint,
    pricing: NativePricing,
}

impl MixedRouteHeuristicGasModel {
    pub(crate) fn gas_units(gas: &GasHeuristics, quote: &RouteQuote) -> u64 {
        let mut units = gas.base_swap_cost;
        for (protocol, pools) in quote.route.sections() {
            let hops = pools.len() as u64;
            units += match protocol {
                Protocol::V2 => gas.v2_base_swap_cost + gas.v2_cost_per_extra_hop * (hops - 1),
                _ => gas.cost_per_hop * hops,
            };
        }
        units + gas.cost_per_init_tick * quote.total_initialized_ticks_crossed()
    }
}

impl GasModel for MixedRouteHeuristicGasModel {
    fn estimate_gas_cost(&self, quote: &RouteQuote) -> GasCostEstimate {
        let units = Self::gas_units(&self.chain.gas, quote);
        self.pricing.estimate(units, &self.gas_price_wei, quote)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MixedRouteHeuristicGasModelFactory;

#[async_trait]
impl GasModelFactory for MixedRouteHeuristicGasModelFactory {
    async fn build_gas_model(
        &self,
        request: GasModelRequest,
    ) -> Result<Arc<dyn GasModel>, RouterError> {
        let pricing = resolve_v3_native_pricing(&request).await?;
        Ok(Arc::new(MixedRouteHeuristicGasModel {
            chain: request.chain,
            gas_price_wei: request.gas_price_wei,
            pricing,
        }))
    }
}
