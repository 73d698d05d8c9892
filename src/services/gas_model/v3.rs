use std::sync::Arc;

use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::debug;

use crate::config::{ChainTuning, GasHeuristics};
use crate::error::RouterError;
use crate::models::quote::{GasCostEstimate, RouteQuote, RouteWithValidQuote};
use crate::providers::L2GasData;

use super::l1::{l1_gas_cost, L1GasCost};
use super::{resolve_v3_native_pricing, GasModel, GasModelFactory, GasModelRequest, NativePricing};

/// Heuristic V3 model: base + per hop + per initialized tick crossed.
pub struct V3HeuristicGasModel {
    chain: Arc<ChainTuning>,
    gas_price_wei: BigUint,
    pricing: NativePricing,
    l2_gas_data: Option<L2GasData>,
}

impl V3HeuristicGasModel {
    pub(crate) fn gas_units(gas: &GasHeuristics, quote: &RouteQuote) -> u64 {
        let hops = quote.route.hops() as u64;
        gas.base_swap_cost
            + gas.cost_per_hop * hops
            + gas.cost_per_init_tick * quote.total_initialized_ticks_crossed()
    }
}

impl GasModel for V3HeuristicGasModel {
    fn estimate_gas_cost(&self, quote: &RouteQuote) -> GasCostEstimate {
        let units = Self::gas_units(&self.chain.gas, quote);
        self.pricing.estimate(units, &self.gas_price_wei, quote)
    }

    fn calculate_l1_gas_fees(&self, routes: &[RouteWithValidQuote]) -> Option<L1GasCost> {
        self.chain.l1_fee?;
        let data = self.l2_gas_data.as_ref()?;
        l1_gas_cost(&self.chain, data, &self.pricing, &self.gas_price_wei, routes)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct V3HeuristicGasModelFactory;

#[async_trait]
impl GasModelFactory for V3HeuristicGasModelFactory {
    async fn build_gas_model(
        &self,
        request: GasModelRequest,
    ) -> Result<Arc<dyn GasModel>, RouterError> {
        let pricing = resolve_v3_native_pricing(&request).await?;
        debug!(
            chain_id = request.chain.chain_id,
            quote_token = %pricing.quote_token(),
            gas_price_wei = %request.gas_price_wei,
            "Built V3 gas model"
        );
        Ok(Arc::new(V3HeuristicGasModel {
            chain: request.chain,
            gas_price_wei: request.gas_price_wei,
            pricing,
            l2_gas_data: request.l2_gas_data,
        }))
    }
}
