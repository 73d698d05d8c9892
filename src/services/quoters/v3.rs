use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ChainTuning;
use crate::error::RouterError;
use crate::models::protocol::Protocol;
use crate::models::route::Route;
use crate::providers::{
    CandidatePoolSource, OnChainQuoteProvider, PoolProvider, ProviderConfig, TokenValidator,
};

use super::candidates::{get_candidate_pools, CandidateRequest};
use super::routes::compute_all_routes;
use super::{
    apply_token_validation, build_records, CandidatePoolsBySelectionCriteria, GetQuotesResult,
    GetRoutesResult, QuoteParams, Quoter,
};

/// Quotes V3 routes through the on-chain quoter collaborator.
pub struct V3Quoter {
    chain: Arc<ChainTuning>,
    candidate_source: Arc<dyn CandidatePoolSource>,
    pool_provider: Arc<dyn PoolProvider>,
    on_chain_quotes: Arc<dyn OnChainQuoteProvider>,
    token_validator: Option<Arc<dyn TokenValidator>>,
}

impl V3Quoter {
    pub fn new(
        chain: Arc<ChainTuning>,
        candidate_source: Arc<dyn CandidatePoolSource>,
        pool_provider: Arc<dyn PoolProvider>,
        on_chain_quotes: Arc<dyn OnChainQuoteProvider>,
        token_validator: Option<Arc<dyn TokenValidator>>,
    ) -> Self {
        Self {
            chain,
            candidate_source,
            pool_provider,
            on_chain_quotes,
            token_validator,
        }
    }
}

/// Quote batches always carry the chain's retry policy.
pub(crate) fn quote_config(chain: &ChainTuning, params: &QuoteParams) -> ProviderConfig {
    ProviderConfig {
        block_number: params.provider_config.block_number,
        retry: Some(chain.quote_retry),
    }
}

#[async_trait]
impl Quoter for V3Quoter {
    fn protocol(&self) -> Protocol {
        Protocol::V3
    }

    async fn get_routes(&self, params: &QuoteParams) -> Result<GetRoutesResult, RouterError> {
        let (accessor, candidates) = get_candidate_pools(
            self.candidate_source.as_ref(),
            self.pool_provider.as_ref(),
            CandidateRequest {
                chain: &self.chain,
                protocol: Protocol::V3,
                token_in: &params.token_in,
                token_out: &params.token_out,
                trade_type: params.trade_type,
                selection: &params.routing_config.v3_pool_selection,
                provider_config: &params.provider_config,
            },
        )
        .await?;

        let pools = accessor
            .get_all_pools()
            .into_iter()
            .filter(|pool| pool.protocol() == Protocol::V3)
            .collect();
        let pools = apply_token_validation(
            self.token_validator.as_ref(),
            pools,
            &params.token_in,
            &params.token_out,
            &params.provider_config,
        )
        .await;
        let routes = compute_all_routes(
            Protocol::V3,
            &params.token_in,
            &params.token_out,
            &pools,
            params.routing_config.max_swaps_per_path,
        );
        Ok(GetRoutesResult {
            routes,
            candidate_pools: Some(candidates),
        })
    }

    async fn get_quotes(
        &self,
        routes: Vec<Route>,
        params: &QuoteParams,
        candidate_pools: Option<CandidatePoolsBySelectionCriteria>,
    ) -> Result<GetQuotesResult, RouterError> {
        if routes.is_empty() {
            debug!("No V3 routes to quote");
            return Ok(GetQuotesResult {
                routes_with_valid_quotes: Vec::new(),
                candidate_pools,
            });
        }

        info!(
            routes = routes.len(),
            amounts = params.amounts.len(),
            trade_type = %params.trade_type,
            "Quoting V3 routes"
        );
        let route_quotes = self
            .on_chain_quotes
            .get_quotes_many(
                params.trade_type,
                &params.amounts,
                &routes,
                &quote_config(&self.chain, params),
            )
            .await?;
        Ok(GetQuotesResult {
            routes_with_valid_quotes: build_records(route_quotes, params),
            candidate_pools,
        })
    }
}
