use crate::error::RouterError;
use crate::models::protocol::Protocol;

/// Bucket sizes for candidate pool selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolSelection {
    pub top_n: usize,
    pub top_n_direct_swaps: usize,
    pub top_n_token_in_out: usize,
    pub top_n_second_hop: usize,
    pub top_n_with_each_base_token: usize,
    pub top_n_with_base_token: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingConfig {
    pub block_number: Option<u64>,
    pub v2_pool_selection: PoolSelection,
    pub v3_pool_selection: PoolSelection,
    pub max_swaps_per_path: usize,
    pub min_splits: usize,
    pub max_splits: usize,
    /// Split granularity in percent; must divide 100.
    pub distribution_percent: u32,
    /// Empty means every protocol the chain supports.
    pub protocols: Vec<Protocol>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            block_number: None,
            v2_pool_selection: PoolSelection::default(),
            v3_pool_selection: PoolSelection::default(),
            max_swaps_per_path: 3,
            min_splits: 1,
            max_splits: 3,
            distribution_percent: 5,
            protocols: Vec::new(),
        }
    }
}

impl RoutingConfig {
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.distribution_percent == 0
            || self.distribution_percent > 100
            || 100 % self.distribution_percent != 0
        {
            return Err(RouterError::invalid(format!(
                "distribution_percent must evenly divide 100, got {}",
                self.distribution_percent
            )));
        }
        if self.min_splits == 0 || self.max_splits < self.min_splits {
            return Err(RouterError::invalid(format!(
                "split bounds must satisfy 1 <= min_splits <= max_splits, got {}..={}",
                self.min_splits, self.max_splits
            )));
        }
        if self.max_swaps_per_path == 0 {
            return Err(RouterError::invalid("max_swaps_per_path must be > 0"));
        }
        Ok(())
    }

    pub fn requests(&self, protocol: Protocol) -> bool {
        self.protocols.contains(&protocol)
    }

    pub fn protocols_unspecified(&self) -> bool {
        self.protocols.is_empty()
    }
}

/// Caller-supplied partial config; unset fields fall back to the chain default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutingConfigOverrides {
    pub block_number: Option<u64>,
    pub v2_pool_selection: Option<PoolSelection>,
    pub v3_pool_selection: Option<PoolSelection>,
    pub max_swaps_per_path: Option<usize>,
    pub min_splits: Option<usize>,
    pub max_splits: Option<usize>,
    pub distribution_percent: Option<u32>,
    pub protocols: Option<Vec<Protocol>>,
}

impl RoutingConfigOverrides {
    pub fn merge_onto(&self, defaults: &RoutingConfig) -> RoutingConfig {
        RoutingConfig {
            block_number: self.block_number.or(defaults.block_number),
            v2_pool_selection: self.v2_pool_selection.unwrap_or(defaults.v2_pool_selection),
            v3_pool_selection: self.v3_pool_selection.unwrap_or(defaults.v3_pool_selection),
            max_swaps_per_path: self
                .max_swaps_per_path
                .unwrap_or(defaults.max_swaps_per_path),
            min_splits: self.min_splits.unwrap_or(defaults.min_splits),
            max_splits: self.max_splits.unwrap_or(defaults.max_splits),
            distribution_percent: self
                .distribution_percent
                .unwrap_or(defaults.distribution_percent),
            protocols: self
                .protocols
                .clone()
                .unwrap_or_else(|| defaults.protocols.clone()),
        }
    }
}
