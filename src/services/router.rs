//! The alpha router.
//!
//! One `route()` call pins a block, prices gas, consults the route cache, fans out to the
//! protocol quoters and hands every quote record to the split selector. Quoters, gas models
//! and the selector hold no state across calls; the route cache is the only shared resource.

use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture, FutureExt};
use num_bigint::BigUint;
use num_traits::Zero;
use tracing::{debug, info, warn};

use crate::config::{ChainTable, ChainTuning, RouterSettings, RoutingConfig, RoutingConfigOverrides};
use crate::error::RouterError;
use crate::metrics;
use crate::models::cache::{CacheMode, CachedRoutes};
use crate::models::pool::{Pool, V3Pool};
use crate::models::protocol::Protocol;
use crate::models::quote::RouteWithValidQuote;
use crate::models::route::Route;
use crate::models::swap::{
    Position, SwapAndAddConfig, SwapOptions, SwapRoute, SwapToRatioResult, SwapToRatioRoute, Trade,
};
use crate::models::token::{Currency, CurrencyAmount, Token, TokenAmount, TradeType};
use crate::providers::gas_price::CachingGasPriceProvider;
use crate::providers::route_cache::InMemoryRouteCache;
use crate::providers::token_validator::CachingTokenValidator;
use crate::providers::v2_quote::LocalV2QuoteProvider;
use crate::providers::{
    BlockNumberProvider, CandidatePoolSource, GasPriceProvider, L2GasData, L2GasDataProvider,
    OnChainQuoteProvider, PoolProvider, ProviderConfig, RouteCachingProvider, Simulator,
    TokenValidator, V2QuoteProvider,
};

use super::best_swap_route::{get_best_swap_route, BestSwapRoute};
use super::calldata::{build_method_parameters, NativeLegs};
use super::distribution::{amounts_for_percents, get_amount_distribution};
use super::gas_model::{
    GasModel, GasModelFactory, GasModelRequest, MixedRouteHeuristicGasModelFactory,
    V2HeuristicGasModelFactory, V3HeuristicGasModelFactory,
};
use super::quoters::{GetQuotesResult, MixedQuoter, QuoteParams, Quoter, V2Quoter, V3Quoter};
use super::ratio::{
    calculate_optimal_ratio, calculate_ratio_amount_in, plan_swap, post_swap_ratio,
    ratio_within_tolerance, realized_rate,
};
use super::retry::retry_with_backoff;
use super::route_cache::{cache_percents, RouteCacheCoordinator};
use super::tick_math::get_tick_at_sqrt_ratio;

/// Every collaborator the router talks to.
#[derive(Clone)]
pub struct RouterProviders {
    pub block_numbers: Arc<dyn BlockNumberProvider>,
    pub gas_price: Arc<dyn GasPriceProvider>,
    pub v3_candidates: Arc<dyn CandidatePoolSource>,
    pub v2_candidates: Arc<dyn CandidatePoolSource>,
    pub v3_pools: Arc<dyn PoolProvider>,
    pub v2_pools: Arc<dyn PoolProvider>,
    pub on_chain_quotes: Arc<dyn OnChainQuoteProvider>,
    pub v2_quotes: Arc<dyn V2QuoteProvider>,
    pub token_validator: Option<Arc<dyn TokenValidator>>,
    pub route_cache: Option<Arc<dyn RouteCachingProvider>>,
    pub l2_gas_data: Option<Arc<dyn L2GasDataProvider>>,
    pub simulator: Option<Arc<dyn Simulator>>,
    pub v3_gas_model_factory: Arc<dyn GasModelFactory>,
    pub v2_gas_model_factory: Arc<dyn GasModelFactory>,
    pub mixed_gas_model_factory: Arc<dyn GasModelFactory>,
}

impl RouterProviders {
    /// Fills everything but the network-facing collaborators with the in-process defaults:
    /// heuristic gas models, reserve-based V2 quoting, a TTL cache around the gas price and
    /// an in-memory route cache when the configured mode is not Darkmode.
    pub fn with_chain_defaults(
        settings: &RouterSettings,
        block_numbers: Arc<dyn BlockNumberProvider>,
        gas_price: Arc<dyn GasPriceProvider>,
        candidate_source: Arc<dyn CandidatePoolSource>,
        pool_provider: Arc<dyn PoolProvider>,
        on_chain_quotes: Arc<dyn OnChainQuoteProvider>,
    ) -> Self {
        let route_cache: Option<Arc<dyn RouteCachingProvider>> = match settings.cache_mode {
            CacheMode::Darkmode => None,
            mode => Some(Arc::new(InMemoryRouteCache::new(
                mode,
                settings.cache_blocks_to_live,
            ))),
        };
        Self {
            block_numbers,
            gas_price: Arc::new(CachingGasPriceProvider::new(
                gas_price,
                settings.gas_price_cache_ttl,
            )),
            v3_candidates: candidate_source.clone(),
            v2_candidates: candidate_source,
            v3_pools: pool_provider.clone(),
            v2_pools: pool_provider,
            on_chain_quotes,
            v2_quotes: Arc::new(LocalV2QuoteProvider::new()),
            token_validator: None,
            route_cache,
            l2_gas_data: None,
            simulator: None,
            v3_gas_model_factory: Arc::new(V3HeuristicGasModelFactory),
            v2_gas_model_factory: Arc::new(V2HeuristicGasModelFactory),
            mixed_gas_model_factory: Arc::new(MixedRouteHeuristicGasModelFactory),
        }
    }

    /// Screens intermediate tokens through `validator`, cached per process.
    pub fn with_token_validator(
        mut self,
        settings: &RouterSettings,
        validator: Arc<dyn TokenValidator>,
    ) -> Self {
        self.token_validator = Some(Arc::new(CachingTokenValidator::new(
            validator,
            settings.token_validation_timeout,
        )));
        self
    }
}

/// Protocols quoted by fresh discovery for this request.
pub fn enabled_protocols(
    chain: &ChainTuning,
    config: &RoutingConfig,
    trade_type: TradeType,
) -> Vec<Protocol> {
    let unspecified = config.protocols_unspecified();
    let mut protocols = Vec::new();
    if unspecified || config.requests(Protocol::V3) {
        protocols.push(Protocol::V3);
    }
    if chain.v2_supported && (unspecified || config.requests(Protocol::V2)) {
        protocols.push(Protocol::V2);
    }
    let mixed_wanted =
        config.requests(Protocol::Mixed) || (unspecified && chain.v2_supported);
    if mixed_wanted && chain.mixed_supported && trade_type == TradeType::ExactInput {
        protocols.push(Protocol::Mixed);
    }
    protocols
}

/// Gas models built once per call.
#[derive(Clone)]
struct GasModels {
    v3: Arc<dyn GasModel>,
    v2: Option<Arc<dyn GasModel>>,
    mixed: Option<Arc<dyn GasModel>>,
}

impl GasModels {
    fn for_protocol(&self, protocol: Protocol) -> Option<Arc<dyn GasModel>> {
        match protocol {
            Protocol::V3 => Some(self.v3.clone()),
            Protocol::V2 => self.v2.clone(),
            Protocol::Mixed => self.mixed.clone(),
        }
    }
}

/// Per-call inputs shared by the cache and fresh paths.
struct RouteContext {
    token_in: Token,
    token_out: Token,
    amount: TokenAmount,
    quote_token: Token,
    trade_type: TradeType,
    routing_config: RoutingConfig,
    provider_config: ProviderConfig,
    gas_models: GasModels,
}

impl RouteContext {
    fn params(&self, percents: Vec<u32>, amounts: Vec<BigUint>, gas_model: Arc<dyn GasModel>) -> QuoteParams {
        QuoteParams {
            token_in: self.token_in.clone(),
            token_out: self.token_out.clone(),
            amounts,
            percents,
            quote_token: self.quote_token.clone(),
            trade_type: self.trade_type,
            routing_config: self.routing_config.clone(),
            provider_config: self.provider_config,
            gas_model,
        }
    }
}

enum QuoteJob {
    Discover,
    Replay(Vec<Route>),
}

pub struct AlphaRouter {
    chain: Arc<ChainTuning>,
    providers: RouterProviders,
    settings: RouterSettings,
    cache: RouteCacheCoordinator,
    v3_quoter: V3Quoter,
    v2_quoter: V2Quoter,
    mixed_quoter: MixedQuoter,
}

impl AlphaRouter {
    pub fn new(
        chain_id: u64,
        providers: RouterProviders,
        settings: RouterSettings,
    ) -> Result<Self, RouterError> {
        Self::with_chain(ChainTable::builtin().get(chain_id)?, providers, settings)
    }

    pub fn with_chain(
        chain: Arc<ChainTuning>,
        providers: RouterProviders,
        settings: RouterSettings,
    ) -> Result<Self, RouterError> {
        chain.default_routing.validate()?;
        let v3_quoter = V3Quoter::new(
            chain.clone(),
            providers.v3_candidates.clone(),
            providers.v3_pools.clone(),
            providers.on_chain_quotes.clone(),
            providers.token_validator.clone(),
        );
        let v2_quoter = V2Quoter::new(
            chain.clone(),
            providers.v2_candidates.clone(),
            providers.v2_pools.clone(),
            providers.v2_quotes.clone(),
            providers.token_validator.clone(),
        );
        // Mixed discovery asks the V3 listing source for both protocols.
        let mixed_quoter = MixedQuoter::new(
            chain.clone(),
            providers.v3_candidates.clone(),
            providers.v3_pools.clone(),
            providers.v2_pools.clone(),
            providers.on_chain_quotes.clone(),
            providers.token_validator.clone(),
        );
        info!(
            chain_id = chain.chain_id,
            chain = chain.name,
            v2_supported = chain.v2_supported,
            mixed_supported = chain.mixed_supported,
            route_cache = providers.route_cache.is_some(),
            simulator = providers.simulator.is_some(),
            "Alpha router initialised"
        );
        Ok(Self {
            cache: RouteCacheCoordinator::new(providers.route_cache.clone()),
            chain,
            providers,
            settings,
            v3_quoter,
            v2_quoter,
            mixed_quoter,
        })
    }

    pub fn chain(&self) -> &ChainTuning {
        &self.chain
    }

    pub fn route_cache(&self) -> &RouteCacheCoordinator {
        &self.cache
    }

    /// Finds the best split of `amount` into `quote_currency`. `Ok(None)` means no route
    /// could fill the whole amount. Cache writes are spawned on the caller's tokio runtime.
    pub async fn route(
        &self,
        amount: CurrencyAmount,
        quote_currency: Currency,
        trade_type: TradeType,
        swap_options: Option<SwapOptions>,
        overrides: Option<RoutingConfigOverrides>,
    ) -> Result<Option<SwapRoute>, RouterError> {
        let (currency_in, currency_out) = match trade_type {
            TradeType::ExactInput => (amount.currency.clone(), quote_currency.clone()),
            TradeType::ExactOutput => (quote_currency.clone(), amount.currency.clone()),
        };
        let token_in = self.chain.wrap(&currency_in)?;
        let token_out = self.chain.wrap(&currency_out)?;
        if token_in == token_out {
            return Err(RouterError::invalid(format!(
                "token in and token out are both {}",
                token_in
            )));
        }
        if amount.raw.is_zero() {
            return Err(RouterError::invalid("amount must be greater than zero"));
        }
        let amount_token = self.chain.wrap(&amount.currency)?;
        let quote_token = self.chain.wrap(&quote_currency)?;
        let amount = TokenAmount::new(amount_token, amount.raw);

        let overrides = overrides.unwrap_or_default();
        let block_number = match overrides.block_number {
            Some(block_number) => block_number,
            None => self.block_number().await?,
        };
        let mut routing_config = overrides.merge_onto(&self.chain.default_routing);
        routing_config.block_number = Some(block_number);
        routing_config.protocols = Protocol::canonical_set(&routing_config.protocols);
        routing_config.validate()?;
        let provider_config = ProviderConfig {
            block_number: Some(block_number),
            retry: None,
        };

        info!(
            chain_id = self.chain.chain_id,
            token_in = %token_in,
            token_out = %token_out,
            amount = %amount,
            trade_type = %trade_type,
            block_number,
            protocols = ?routing_config.protocols,
            "Routing request"
        );

        let (lookup, (gas_price_wei, l2_gas_data)) = futures::try_join!(
            async {
                Ok::<_, RouterError>(
                    self.cache
                        .lookup(
                            self.chain.chain_id,
                            &amount,
                            &quote_token,
                            trade_type,
                            &routing_config.protocols,
                            block_number,
                        )
                        .await,
                )
            },
            self.gas_inputs(),
        )?;

        let fresh_protocols = if lookup.needs_fresh_routes() {
            enabled_protocols(&self.chain, &routing_config, trade_type)
        } else {
            Vec::new()
        };
        let mut needed = fresh_protocols.clone();
        if let Some(cached) = &lookup.cached {
            needed.extend(cached.routes.iter().map(|route| route.protocol()));
        }
        let gas_models = self
            .build_gas_models(
                &Protocol::canonical_set(&needed),
                GasModelRequest {
                    chain: self.chain.clone(),
                    gas_price_wei: gas_price_wei.clone(),
                    v3_pool_provider: self.providers.v3_pools.clone(),
                    v2_pool_provider: Some(self.providers.v2_pools.clone()),
                    amount_token: amount.token.clone(),
                    quote_token: quote_token.clone(),
                    l2_gas_data: l2_gas_data.clone(),
                    provider_config,
                },
            )
            .await?;

        let context = RouteContext {
            token_in: token_in.clone(),
            token_out: token_out.clone(),
            amount: amount.clone(),
            quote_token: quote_token.clone(),
            trade_type,
            routing_config,
            provider_config,
            gas_models,
        };

        let (from_cache, from_chain) = futures::try_join!(
            self.swap_route_from_cache(lookup.cached.as_ref(), &context),
            self.swap_route_from_chain(&fresh_protocols, &context),
        )?;

        self.cache.report_tapcompare(
            self.chain.chain_id,
            &lookup,
            from_cache.as_ref(),
            from_chain.as_ref(),
        );
        if let Some(fresh) = &from_chain {
            self.cache.spawn_store(
                lookup.mode,
                fresh,
                self.chain.chain_id,
                &token_in,
                &token_out,
                &context.routing_config.protocols,
                block_number,
                trade_type,
                &amount,
            );
        }

        let Some(best) = lookup.choose(from_cache, from_chain) else {
            info!(
                chain_id = self.chain.chain_id,
                token_in = %token_in,
                token_out = %token_out,
                "No route found"
            );
            metrics::emit_quote_result(self.chain.chain_id, lookup.mode, false);
            return Ok(None);
        };
        metrics::emit_quote_result(self.chain.chain_id, lookup.mode, true);

        let swap_route = self
            .assemble(
                best,
                &amount,
                trade_type,
                gas_price_wei,
                block_number,
                NativeLegs {
                    input: currency_in.is_native(),
                    output: currency_out.is_native(),
                },
                swap_options.as_ref(),
            )?;
        let swap_route = match swap_options.as_ref() {
            Some(options) if options.simulate.is_some() => {
                self.simulate(options, swap_route, &amount, l2_gas_data.as_ref(), &provider_config)
                    .await?
            }
            _ => swap_route,
        };

        info!(
            chain_id = self.chain.chain_id,
            quote = %swap_route.quote,
            quote_gas_adjusted = %swap_route.quote_gas_adjusted,
            estimated_gas_used = swap_route.estimated_gas_used,
            splits = swap_route.route.len(),
            block_number,
            "Found swap route"
        );
        Ok(Some(swap_route))
    }

    /// Searches for a swap that leaves the balances in the ratio `position` consumes.
    pub async fn route_to_ratio(
        &self,
        token0_balance: CurrencyAmount,
        token1_balance: CurrencyAmount,
        position: &Position,
        swap_and_add_config: &SwapAndAddConfig,
        swap_options: Option<SwapOptions>,
        overrides: Option<RoutingConfigOverrides>,
    ) -> Result<SwapToRatioResult, RouterError> {
        let (mut balance0, mut balance1) = (token0_balance, token1_balance);
        if self
            .chain
            .wrap(&balance1.currency)?
            .sorts_before(&self.chain.wrap(&balance0.currency)?)
        {
            std::mem::swap(&mut balance0, &mut balance1);
        }

        let plan = plan_swap(position, &balance0.raw, &balance1.raw)?;
        let zero_for_one = plan.zero_for_one;
        let pre_swap_optimal_ratio = plan.optimal_ratio.clone();
        let (input_balance, output_balance) = if zero_for_one {
            (balance0, balance1)
        } else {
            (balance1, balance0)
        };
        let input_token = TokenAmount::new(
            self.chain.wrap(&input_balance.currency)?,
            input_balance.raw.clone(),
        );
        let output_token = TokenAmount::new(
            self.chain.wrap(&output_balance.currency)?,
            output_balance.raw.clone(),
        );

        let mut overrides = overrides.unwrap_or_default();
        overrides.protocols = Some(vec![Protocol::V3, Protocol::V2]);

        let mut optimal_ratio = plan.optimal_ratio;
        let mut exchange_rate = plan.exchange_rate;
        let mut post_swap_target_pool = position.pool.clone();
        let mut iteration = 0u32;
        loop {
            iteration += 1;
            if iteration > swap_and_add_config.max_iterations {
                info!(iteration, "Swap to ratio exceeded max iterations");
                return Ok(SwapToRatioResult::NoRouteFound {
                    error: "max iterations exceeded".to_string(),
                });
            }

            let amount_to_swap = calculate_ratio_amount_in(
                &optimal_ratio,
                &exchange_rate,
                &input_balance.raw,
                &output_balance.raw,
            )?;
            if amount_to_swap.is_zero() {
                info!("No swap needed to reach ratio");
                return Ok(SwapToRatioResult::NoSwapNeeded);
            }

            let swap = self
                .route(
                    CurrencyAmount::new(input_balance.currency.clone(), amount_to_swap),
                    output_balance.currency.clone(),
                    TradeType::ExactInput,
                    swap_options.clone(),
                    Some(overrides.clone()),
                )
                .await?;
            let Some(swap) = swap else {
                info!("No route found while swapping to ratio");
                return Ok(SwapToRatioResult::NoRouteFound {
                    error: "no route found".to_string(),
                });
            };

            let new_ratio = post_swap_ratio(
                &input_token,
                &output_token,
                &swap.trade.input_amount.raw,
                &swap.trade.output_amount.raw,
            )?;

            let target_price = target_pool_price_after(&swap.route, &position.pool);
            optimal_ratio = match &target_price {
                Some(sqrt_price) => calculate_optimal_ratio(position, sqrt_price, zero_for_one)?,
                None => pre_swap_optimal_ratio.clone(),
            };
            let achieved = ratio_within_tolerance(
                &new_ratio,
                &optimal_ratio,
                &swap_and_add_config.ratio_error_tolerance,
            );
            if achieved {
                if let Some(sqrt_price) = &target_price {
                    post_swap_target_pool = V3Pool {
                        sqrt_price_x96: sqrt_price.clone(),
                        tick: get_tick_at_sqrt_ratio(sqrt_price)?,
                        ..position.pool.clone()
                    };
                }
            }

            exchange_rate = realized_rate(&swap.trade.input_amount.raw, &swap.trade.output_amount.raw);
            debug!(
                iteration,
                exchange_rate = exchange_rate.to_f64(),
                optimal_ratio = optimal_ratio.to_f64(),
                new_ratio = new_ratio.to_f64(),
                tolerance = swap_and_add_config.ratio_error_tolerance.to_f64(),
                "Swap to ratio iteration"
            );
            if exchange_rate.is_zero() {
                return Ok(SwapToRatioResult::NoRouteFound {
                    error: "insufficient liquidity to swap to optimal ratio".to_string(),
                });
            }
            if achieved {
                return Ok(SwapToRatioResult::Success(Box::new(SwapToRatioRoute {
                    swap_route: swap,
                    optimal_ratio,
                    post_swap_target_pool,
                })));
            }
        }
    }

    async fn block_number(&self) -> Result<u64, RouterError> {
        let provider = self.providers.block_numbers.clone();
        retry_with_backoff(
            |attempt| {
                let provider = provider.clone();
                async move {
                    if attempt > 0 {
                        info!(attempt = attempt + 1, "Get block number attempt");
                    }
                    provider.get_block_number().await
                }
            },
            self.settings.block_retry,
            "get_block_number",
        )
        .await
    }

    async fn gas_inputs(&self) -> Result<(BigUint, Option<L2GasData>), RouterError> {
        let l2_provider = match (&self.chain.l1_fee, &self.providers.l2_gas_data) {
            (Some(_), Some(provider)) => Some(provider.clone()),
            (Some(_), None) => {
                warn!(
                    chain_id = self.chain.chain_id,
                    "No L2 gas data provider; L1 data fees will not be priced"
                );
                None
            }
            _ => None,
        };
        let (gas_price, l2_gas_data) = futures::try_join!(
            self.providers.gas_price.get_gas_price(),
            async {
                match l2_provider {
                    Some(provider) => provider.get_gas_data().await.map(Some),
                    None => Ok(None),
                }
            },
        )?;
        Ok((gas_price.gas_price_wei, l2_gas_data))
    }

    async fn build_gas_models(
        &self,
        protocols: &[Protocol],
        request: GasModelRequest,
    ) -> Result<GasModels, RouterError> {
        let optional = |wanted: bool, factory: Arc<dyn GasModelFactory>| {
            let request = request.clone();
            async move {
                if wanted {
                    factory.build_gas_model(request).await.map(Some)
                } else {
                    Ok(None)
                }
            }
        };
        let (v3, v2, mixed) = futures::try_join!(
            self.providers.v3_gas_model_factory.build_gas_model(request.clone()),
            optional(
                protocols.contains(&Protocol::V2),
                self.providers.v2_gas_model_factory.clone(),
            ),
            optional(
                protocols.contains(&Protocol::Mixed),
                self.providers.mixed_gas_model_factory.clone(),
            ),
        )?;
        Ok(GasModels { v3, v2, mixed })
    }

    fn quoter(&self, protocol: Protocol) -> &dyn Quoter {
        match protocol {
            Protocol::V3 => &self.v3_quoter,
            Protocol::V2 => &self.v2_quoter,
            Protocol::Mixed => &self.mixed_quoter,
        }
    }

    /// Runs the quote jobs concurrently. Any protocol failure fails the whole request.
    async fn gather(
        &self,
        jobs: Vec<(Protocol, QuoteJob)>,
        context: &RouteContext,
        percents: &[u32],
        amounts: &[BigUint],
    ) -> Result<Vec<RouteWithValidQuote>, RouterError> {
        let mut futures: Vec<BoxFuture<'_, Result<(Protocol, GetQuotesResult), RouterError>>> =
            Vec::with_capacity(jobs.len());
        for (protocol, job) in jobs {
            let Some(gas_model) = context.gas_models.for_protocol(protocol) else {
                return Err(RouterError::internal(format!(
                    "no gas model built for {protocol}"
                )));
            };
            let params = context.params(percents.to_vec(), amounts.to_vec(), gas_model);
            let quoter = self.quoter(protocol);
            futures.push(
                async move {
                    let result = match job {
                        QuoteJob::Discover => quoter.get_routes_then_quotes(&params).await,
                        QuoteJob::Replay(routes) => quoter.get_quotes(routes, &params, None).await,
                    };
                    result.map(|result| (protocol, result)).map_err(|err| {
                        warn!(protocol = %protocol, error = %err, "Protocol quote path failed");
                        err
                    })
                }
                .boxed(),
            );
        }

        let mut records = Vec::new();
        for (protocol, result) in try_join_all(futures).await? {
            debug!(
                protocol = %protocol,
                records = result.routes_with_valid_quotes.len(),
                "Protocol quotes gathered"
            );
            records.extend(result.routes_with_valid_quotes);
        }
        Ok(records)
    }

    async fn swap_route_from_cache(
        &self,
        cached: Option<&CachedRoutes>,
        context: &RouteContext,
    ) -> Result<Option<BestSwapRoute>, RouterError> {
        let Some(cached) = cached else {
            return Ok(None);
        };
        let percents = cache_percents(cached);
        let amounts = amounts_for_percents(&context.amount.raw, &percents);
        let jobs = Protocol::ALL
            .into_iter()
            .filter_map(|protocol| {
                let routes = cached.routes_for(protocol);
                (!routes.is_empty()).then_some((protocol, QuoteJob::Replay(routes)))
            })
            .collect::<Vec<_>>();
        info!(
            block_number = cached.block_number,
            routes = cached.routes.len(),
            percents = ?percents,
            "Quoting cached routes"
        );
        let records = self.gather(jobs, context, &percents, &amounts).await?;
        get_best_swap_route(
            &context.amount,
            &percents,
            records,
            context.trade_type,
            &context.routing_config,
            context.gas_models.v3.as_ref(),
        )
    }

    async fn swap_route_from_chain(
        &self,
        protocols: &[Protocol],
        context: &RouteContext,
    ) -> Result<Option<BestSwapRoute>, RouterError> {
        if protocols.is_empty() {
            return Ok(None);
        }
        let (percents, amounts) = get_amount_distribution(
            &context.amount.raw,
            context.routing_config.distribution_percent,
        )?;
        let jobs = protocols
            .iter()
            .map(|protocol| (*protocol, QuoteJob::Discover))
            .collect::<Vec<_>>();
        let records = self.gather(jobs, context, &percents, &amounts).await?;
        if records.is_empty() {
            info!(protocols = ?protocols, "No valid quotes from any protocol");
            return Ok(None);
        }
        get_best_swap_route(
            &context.amount,
            &percents,
            records,
            context.trade_type,
            &context.routing_config,
            context.gas_models.v3.as_ref(),
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        best: BestSwapRoute,
        amount: &TokenAmount,
        trade_type: TradeType,
        gas_price_wei: BigUint,
        block_number: u64,
        native: NativeLegs,
        swap_options: Option<&SwapOptions>,
    ) -> Result<SwapRoute, RouterError> {
        let (input_amount, output_amount) = match trade_type {
            TradeType::ExactInput => (amount.clone(), best.quote.clone()),
            TradeType::ExactOutput => (best.quote.clone(), amount.clone()),
        };
        let method_parameters = swap_options
            .map(|options| {
                build_method_parameters(&self.chain, &best.routes, trade_type, native, options)
            })
            .transpose()?;
        Ok(SwapRoute {
            quote: best.quote,
            quote_gas_adjusted: best.quote_gas_adjusted,
            estimated_gas_used: best.estimated_gas_used,
            estimated_gas_used_quote_token: best.estimated_gas_used_quote_token,
            estimated_gas_used_usd: best.estimated_gas_used_usd,
            gas_price_wei,
            route: best.routes,
            trade: Trade {
                trade_type,
                input_amount,
                output_amount,
            },
            method_parameters,
            block_number,
            simulation_status: None,
        })
    }

    async fn simulate(
        &self,
        options: &SwapOptions,
        swap_route: SwapRoute,
        amount: &TokenAmount,
        l2_gas_data: Option<&L2GasData>,
        provider_config: &ProviderConfig,
    ) -> Result<SwapRoute, RouterError> {
        let Some(config) = &options.simulate else {
            return Ok(swap_route);
        };
        let Some(simulator) = &self.providers.simulator else {
            return Err(RouterError::invalid("Simulator not initialized"));
        };
        let quote = swap_route.quote.clone();
        simulator
            .simulate(
                config.from_address,
                options,
                swap_route,
                amount,
                &quote,
                l2_gas_data,
                provider_config,
            )
            .await
    }
}

/// Post-swap sqrt price of the position's pool if the swap crossed it.
fn target_pool_price_after(routes: &[RouteWithValidQuote], target: &V3Pool) -> Option<BigUint> {
    let mut price = None;
    for record in routes {
        if record.protocol() != Protocol::V3 {
            continue;
        }
        for (index, pool) in record.route().pools().iter().enumerate() {
            let Pool::V3(pool) = pool else {
                continue;
            };
            if pool.token0 == target.token0 && pool.token1 == target.token1 && pool.fee == target.fee {
                if let Some(after) = record.sqrt_price_x96_after_list().get(index) {
                    price = Some(after.clone());
                }
            }
        }
    }
    price
}
