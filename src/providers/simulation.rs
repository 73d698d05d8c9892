use std::sync::Arc;

use alloy_primitives::Address;
use async_trait::async_trait;
use num_bigint::{BigInt, BigUint};
use num_traits::Zero;
use tracing::{info, warn};

use crate::config::ChainTuning;
use crate::error::RouterError;
use crate::metrics;
use crate::models::swap::{MethodParameters, SimulationStatus, SwapOptions, SwapRoute};
use crate::models::token::{Token, TokenAmount, TradeType};

use super::{L2GasData, ProviderConfig, Simulator};

/// Multipliers applied to simulated gas, in percent.
const ESTIMATE_GAS_INFLATION_PERCENT: u64 = 120;
const BUNDLE_GAS_INFLATION_PERCENT: u64 = 125;

#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn estimate_gas(
        &self,
        from: Address,
        transaction: &MethodParameters,
        config: &ProviderConfig,
    ) -> Result<u64, RouterError>;
}

#[async_trait]
pub trait ApprovalChecker: Send + Sync {
    async fn is_approved(
        &self,
        owner: Address,
        token: &Token,
        spender: Address,
        amount: &BigUint,
    ) -> Result<bool, RouterError>;
}

/// Simulates approve + swap as one bundle for callers that have not approved yet.
#[async_trait]
pub trait BundleSimulator: Send + Sync {
    async fn simulate_with_approval(
        &self,
        from: Address,
        token_in: &Token,
        transaction: &MethodParameters,
        config: &ProviderConfig,
    ) -> Result<u64, RouterError>;
}

/// Estimates gas directly when the swap can execute as-is and falls back to a bundle
/// simulation when an approval is still missing.
pub struct FallbackSimulator {
    chain: Arc<ChainTuning>,
    estimator: Arc<dyn GasEstimator>,
    approvals: Arc<dyn ApprovalChecker>,
    bundle: Option<Arc<dyn BundleSimulator>>,
}

impl FallbackSimulator {
    pub fn new(
        chain: Arc<ChainTuning>,
        estimator: Arc<dyn GasEstimator>,
        approvals: Arc<dyn ApprovalChecker>,
        bundle: Option<Arc<dyn BundleSimulator>>,
    ) -> Self {
        Self {
            chain,
            estimator,
            approvals,
            bundle,
        }
    }

    async fn simulated_gas(
        &self,
        from: Address,
        swap_route: &SwapRoute,
        transaction: &MethodParameters,
        config: &ProviderConfig,
    ) -> Result<Option<u64>, RouterError> {
        let token_in = &swap_route.trade.input_amount.token;
        let native_input = !transaction.value.is_zero();
        let approved = native_input
            || self
                .approvals
                .is_approved(
                    from,
                    token_in,
                    transaction.to,
                    &swap_route.trade.input_amount.raw,
                )
                .await?;

        if approved {
            let gas = self.estimator.estimate_gas(from, transaction, config).await?;
            return Ok(Some(gas * ESTIMATE_GAS_INFLATION_PERCENT / 100));
        }

        match &self.bundle {
            Some(bundle) => {
                let gas = bundle
                    .simulate_with_approval(from, token_in, transaction, config)
                    .await?;
                Ok(Some(gas * BUNDLE_GAS_INFLATION_PERCENT / 100))
            }
            None => Ok(None),
        }
    }
}

/// Rescales the route's gas figures to a simulated gas amount.
pub fn apply_simulated_gas(mut swap_route: SwapRoute, simulated_gas: u64) -> SwapRoute {
    let previous = swap_route.estimated_gas_used;
    if previous > 0 {
        let scale = |value: &BigUint| value * BigUint::from(simulated_gas) / BigUint::from(previous);
        swap_route.estimated_gas_used_quote_token = TokenAmount::new(
            swap_route.estimated_gas_used_quote_token.token.clone(),
            scale(&swap_route.estimated_gas_used_quote_token.raw),
        );
        swap_route.estimated_gas_used_usd = scale(&swap_route.estimated_gas_used_usd);
    }
    swap_route.estimated_gas_used = simulated_gas;

    let quote = BigInt::from(swap_route.quote.raw.clone());
    let gas_cost = BigInt::from(swap_route.estimated_gas_used_quote_token.raw.clone());
    swap_route.quote_gas_adjusted = match swap_route.trade.trade_type {
        TradeType::ExactInput => quote - gas_cost,
        TradeType::ExactOutput => quote + gas_cost,
    };
    swap_route
}

fn with_status(mut swap_route: SwapRoute, status: SimulationStatus) -> SwapRoute {
    metrics::emit_simulation_status(status);
    swap_route.simulation_status = Some(status);
    swap_route
}

#[async_trait]
impl Simulator for FallbackSimulator {
    async fn simulate(
        &self,
        from_address: Address,
        _swap_options: &SwapOptions,
        swap_route: SwapRoute,
        _amount: &TokenAmount,
        _quote: &TokenAmount,
        _l2_gas_data: Option<&L2GasData>,
        config: &ProviderConfig,
    ) -> Result<SwapRoute, RouterError> {
        if !self.chain.simulation_supported {
            info!(chain_id = self.chain.chain_id, "Simulation not supported on chain");
            return Ok(with_status(swap_route, SimulationStatus::NotSupported));
        }

        let transaction = swap_route
            .method_parameters
            .clone()
            .ok_or_else(|| RouterError::invalid("No calldata provided to simulate transaction"))?;

        match self
            .simulated_gas(from_address, &swap_route, &transaction, config)
            .await
        {
            Ok(Some(gas)) => {
                info!(
                    estimated_gas = swap_route.estimated_gas_used,
                    simulated_gas = gas,
                    "Simulation succeeded"
                );
                Ok(with_status(
                    apply_simulated_gas(swap_route, gas),
                    SimulationStatus::Succeeded,
                ))
            }
            Ok(None) => Ok(with_status(swap_route, SimulationStatus::NotApproved)),
            Err(err) => {
                warn!(error = %err, "Simulation failed");
                Ok(with_status(swap_route, SimulationStatus::Failed))
            }
        }
    }
}
