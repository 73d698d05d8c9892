use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::ChainTuning;
use crate::error::RouterError;
use crate::models::pool::Pool;
use crate::models::protocol::Protocol;
use crate::models::route::Route;
use crate::providers::{
    CandidatePoolSource, PoolKey, PoolProvider, ProviderConfig, TokenValidator, V2QuoteProvider,
};

use super::candidates::{get_candidate_pools, CandidateRequest};
use super::routes::compute_all_routes;
use super::{
    apply_token_validation, build_records, CandidatePoolsBySelectionCriteria, GetQuotesResult,
    GetRoutesResult, QuoteParams, Quoter,
};

/// Quotes V2 routes from pair reserves.
pub struct V2Quoter {
    chain: Arc<ChainTuning>,
    candidate_source: Arc<dyn CandidatePoolSource>,
    pool_provider: Arc<dyn PoolProvider>,
    v2_quotes: Arc<dyn V2QuoteProvider>,
    token_validator: Option<Arc<dyn TokenValidator>>,
}

impl V2Quoter {
    pub fn new(
        chain: Arc<ChainTuning>,
        candidate_source: Arc<dyn CandidatePoolSource>,
        pool_provider: Arc<dyn PoolProvider>,
        v2_quotes: Arc<dyn V2QuoteProvider>,
        token_validator: Option<Arc<dyn TokenValidator>>,
    ) -> Self {
        Self {
            chain,
            candidate_source,
            pool_provider,
            v2_quotes,
            token_validator,
        }
    }

    /// Cached routes carry stale reserves; reload every pair at the requested block.
    /// Routes whose pairs are gone are dropped.
    async fn refresh_reserves(
        &self,
        routes: Vec<Route>,
        config: &ProviderConfig,
    ) -> Result<Vec<Route>, RouterError> {
        let mut keys: Vec<PoolKey> = Vec::new();
        for route in &routes {
            for pool in route.pools() {
                let key = PoolKey::V2 {
                    token_a: pool.token0().clone(),
                    token_b: pool.token1().clone(),
                };
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }
        let accessor = self.pool_provider.get_pools(&keys, config).await?;

        let mut refreshed = Vec::with_capacity(routes.len());
        for route in routes {
            let pools: Option<Vec<Pool>> = route
                .pools()
                .iter()
                .map(|pool| accessor.get_pool_by_address(&pool.address()).cloned())
                .collect();
            let Some(pools) = pools else {
                debug!(route = %route, "Dropping V2 route with a missing pair");
                continue;
            };
            match route.with_pools(pools) {
                Ok(route) => refreshed.push(route),
                Err(err) => warn!(route = %route, error = %err, "Could not refresh V2 route"),
            }
        }
        Ok(refreshed)
    }
}

#[async_trait]
impl Quoter for V2Quoter {
    fn protocol(&self) -> Protocol {
        Protocol::V2
    }

    async fn get_routes(&self, params: &QuoteParams) -> Result<GetRoutesResult, RouterError> {
        let (accessor, candidates) = get_candidate_pools(
            self.candidate_source.as_ref(),
            self.pool_provider.as_ref(),
            CandidateRequest {
                chain: &self.chain,
                protocol: Protocol::V2,
                token_in: &params.token_in,
                token_out: &params.token_out,
                trade_type: params.trade_type,
                selection: &params.routing_config.v2_pool_selection,
                provider_config: &params.provider_config,
            },
        )
        .await?;

        let pools = accessor
            .get_all_pools()
            .into_iter()
            .filter(|pool| pool.protocol() == Protocol::V2)
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
            Protocol::V2,
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
        // Fresh discovery already resolved pairs at this block.
        let routes = if candidate_pools.is_some() {
            routes
        } else {
            self.refresh_reserves(routes, &params.provider_config).await?
        };
        if routes.is_empty() {
            debug!("No V2 routes to quote");
            return Ok(GetQuotesResult {
                routes_with_valid_quotes: Vec::new(),
                candidate_pools,
            });
        }

        info!(
            routes = routes.len(),
            amounts = params.amounts.len(),
            trade_type = %params.trade_type,
            "Quoting V2 routes"
        );
        let route_quotes =
            self.v2_quotes
                .get_quotes_many(params.trade_type, &params.amounts, &routes)?;
        Ok(GetQuotesResult {
            routes_with_valid_quotes: build_records(route_quotes, params),
            candidate_pools,
        })
    }
}
