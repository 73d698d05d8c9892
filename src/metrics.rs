use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::models::cache::CacheMode;
use crate::models::protocol::Protocol;
use crate::models::swap::SimulationStatus;

const METRIC_NAMESPACE: &str = "Routing/AlphaRouter";
const METRIC_ROUTE_CACHE_LOOKUP: &str = "RouteCacheLookup";
const METRIC_SET_CACHED_ROUTE: &str = "SetCachedRoute";
const METRIC_TAPCOMPARE_MISQUOTE: &str = "TapcompareMisquote";
const METRIC_QUOTE_FOUND: &str = "QuoteFound";
const METRIC_QUOTE_NOT_FOUND: &str = "QuoteNotFound";
const METRIC_POOL_SELECTION: &str = "PoolSelection";
const METRIC_SIMULATION_STATUS: &str = "SimulationStatus";
const DIM_CACHE_MODE: &str = "CacheMode";
const DIM_OUTCOME: &str = "Outcome";
const DIM_CHAIN_ID: &str = "ChainId";
const DIM_PROTOCOL: &str = "Protocol";
const DIM_SELECTION: &str = "Selection";
const DIM_STATUS: &str = "Status";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookupOutcome {
    Hit,
    Miss,
    Expired,
    Skipped,
}

impl CacheLookupOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Expired => "expired",
            Self::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheWriteOutcome {
    Success,
    Rejected,
    Failure,
}

impl CacheWriteOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failure => "failure",
        }
    }
}

pub fn emit_cache_lookup(mode: CacheMode, outcome: CacheLookupOutcome) {
    emit_metric(
        METRIC_ROUTE_CACHE_LOOKUP,
        "Count",
        json!(1),
        &[
            (DIM_CACHE_MODE, json!(mode.as_str())),
            (DIM_OUTCOME, json!(outcome.as_str())),
        ],
    );
}

pub fn emit_set_cached_route(outcome: CacheWriteOutcome) {
    emit_metric(
        METRIC_SET_CACHED_ROUTE,
        "Count",
        json!(1),
        &[(DIM_OUTCOME, json!(outcome.as_str()))],
    );
}

pub fn emit_tapcompare_misquote(chain_id: u64, misquote_percent: f64) {
    emit_metric(
        METRIC_TAPCOMPARE_MISQUOTE,
        "Percent",
        json!(misquote_percent),
        &[(DIM_CHAIN_ID, json!(chain_id.to_string()))],
    );
}

pub fn emit_quote_result(chain_id: u64, mode: CacheMode, found: bool) {
    let name = if found {
        METRIC_QUOTE_FOUND
    } else {
        METRIC_QUOTE_NOT_FOUND
    };
    emit_metric(
        name,
        "Count",
        json!(1),
        &[
            (DIM_CHAIN_ID, json!(chain_id.to_string())),
            (DIM_CACHE_MODE, json!(mode.as_str())),
        ],
    );
}

pub fn emit_pool_selection(protocol: Protocol, selection: &str, pool_count: usize) {
    emit_metric(
        METRIC_POOL_SELECTION,
        "Count",
        json!(pool_count as u64),
        &[
            (DIM_PROTOCOL, json!(protocol.as_str())),
            (DIM_SELECTION, json!(selection)),
        ],
    );
}

pub fn emit_simulation_status(status: SimulationStatus) {
    emit_metric(
        METRIC_SIMULATION_STATUS,
        "Count",
        json!(1),
        &[(DIM_STATUS, json!(status.as_str()))],
    );
}

fn emit_metric(metric_name: &str, unit: &str, value: Value, dimensions: &[(&str, Value)]) {
    // CloudWatch Embedded Metric Format as a raw JSON line on stdout; a tracing JSON
    // wrapper would prevent EMF extraction.
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0);

    let event = build_event(timestamp_ms, metric_name, unit, value, dimensions);
    match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(err) => warn!(error = %err, metric = metric_name, "Failed to serialize EMF metric"),
    }
}

fn build_event(
    timestamp_ms: i64,
    metric_name: &str,
    unit: &str,
    value: Value,
    dimensions: &[(&str, Value)],
) -> Value {
    let dimension_names: Vec<&str> = dimensions.iter().map(|(name, _)| *name).collect();
    let aws = json!({
        "Timestamp": timestamp_ms,
        "CloudWatchMetrics": [{
            "Namespace": METRIC_NAMESPACE,
            "Dimensions": [dimension_names],
            "Metrics": [{
                "Name": metric_name,
                "Unit": unit,
            }],
        }],
    });

    let mut event = Map::new();
    event.insert("_aws".to_string(), aws);
    event.insert(metric_name.to_string(), value);
    for (name, value) in dimensions {
        event.insert((*name).to_string(), value.clone());
    }
    Value::Object(event)
}
