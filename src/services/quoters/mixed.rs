use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::ChainTuning;
use crate::error::RouterError;
use crate::models::protocol::Protocol;
use crate::models::route::Route;
use crate::models::token::TradeType;
use crate::providers::{CandidatePoolSource, OnChainQuoteProvider, PoolProvider, TokenValidator};

use super::candidates::{get_candidate_pools, CandidateRequest};
use super::routes::compute_all_mixed_routes;
use super::v3::quote_config;
use super::{
    apply_token_validation, build_records, CandidatePoolsBySelectionCriteria, GetQuotesResult,
    GetRoutesResult, QuoteParams, Quoter,
};

fn reject_exact_output(trade_type: TradeType) -> Result<(), RouterError> {
    match trade_type {
        TradeType::ExactInput => Ok(()),
        TradeType::ExactOutput => Err(RouterError::unsupported(
            "Mixed route quotes are not supported for EXACT_OUTPUT",
        )),
    }
}

/// Routes mixing V3 and V2 pools. Exact-input only.
pub struct MixedQuoter {
    chain: Arc<ChainTuning>,
    candidate_source: Arc<dyn CandidatePoolSource>,
    v3_pool_provider: Arc<dyn PoolProvider>,
    v2_pool_provider: Arc<dyn PoolProvider>,
    on_chain_quotes: Arc<dyn OnChainQuoteProvider>,
    token_validator: Option<Arc<dyn TokenValidator>>,
}

impl MixedQuoter {
    pub fn new(
        chain: Arc<ChainTuning>,
        candidate_source: Arc<dyn CandidatePoolSource>,
        v3_pool_provider: Arc<dyn PoolProvider>,
        v2_pool_provider: Arc<dyn PoolProvider>,
        on_chain_quotes: Arc<dyn OnChainQuoteProvider>,
        token_validator: Option<Arc<dyn TokenValidator>>,
    ) -> Self {
        Self {
            chain,
            candidate_source,
            v3_pool_provider,
            v2_pool_provider,
            on_chain_quotes,
            token_validator,
        }
    }

    fn request<'a>(
        &'a self,
        protocol: Protocol,
        params: &'a QuoteParams,
    ) -> CandidateRequest<'a> {
        let selection = match protocol {
            Protocol::V2 => &params.routing_config.v2_pool_selection,
            _ => &params.routing_config.v3_pool_selection,
        };
        CandidateRequest {
            chain: &self.chain,
            protocol,
            token_in: &params.token_in,
            token_out: &params.token_out,
            trade_type: params.trade_type,
            selection,
            provider_config: &params.provider_config,
        }
    }
}

#[async_trait]
impl Quoter for MixedQuoter {
    fn protocol(&self) -> Protocol {
        Protocol::Mixed
    }

    async fn get_routes(&self, params: &QuoteParams) -> Result<GetRoutesResult, RouterError> {
        reject_exact_output(params.trade_type)?;

        let (v3, v2) = futures::try_join!(
            get_candidate_pools(
                self.candidate_source.as_ref(),
                self.v3_pool_provider.as_ref(),
                self.request(Protocol::V3, params),
            ),
            get_candidate_pools(
                self.candidate_source.as_ref(),
                self.v2_pool_provider.as_ref(),
                self.request(Protocol::V2, params),
            ),
        )?;
        let (v3_accessor, v3_candidates) = v3;
        let (v2_accessor, v2_candidates) = v2;

        let mut pools = v3_accessor
            .get_all_pools()
            .into_iter()
            .filter(|pool| pool.protocol() == Protocol::V3)
            .collect::<Vec<_>>();
        pools.extend(
            v2_accessor
                .get_all_pools()
                .into_iter()
                .filter(|pool| pool.protocol() == Protocol::V2),
        );
        let pools = apply_token_validation(
            self.token_validator.as_ref(),
            pools,
            &params.token_in,
            &params.token_out,
            &params.provider_config,
        )
        .await;
        let routes = compute_all_mixed_routes(
            &params.token_in,
            &params.token_out,
            &pools,
            params.routing_config.max_swaps_per_path,
        );
        Ok(GetRoutesResult {
            routes,
            candidate_pools: Some(v3_candidates.merge(v2_candidates)),
        })
    }

    async fn get_quotes(
        &self,
        routes: Vec<Route>,
        params: &QuoteParams,
        candidate_pools: Option<CandidatePoolsBySelectionCriteria>,
    ) -> Result<GetQuotesResult, RouterError> {
        reject_exact_output(params.trade_type)?;
        if routes.is_empty() {
            debug!("No mixed routes to quote");
            return Ok(GetQuotesResult {
                routes_with_valid_quotes: Vec::new(),
                candidate_pools,
            });
        }

        info!(
            routes = routes.len(),
            amounts = params.amounts.len(),
            "Quoting mixed routes"
        );
        let route_quotes = self
            .on_chain_quotes
            .get_quotes_many_exact_in(&params.amounts, &routes, &quote_config(&self.chain, params))
            .await?;
        Ok(GetQuotesResult {
            routes_with_valid_quotes: build_records(route_quotes, params),
            candidate_pools,
        })
    }
}
