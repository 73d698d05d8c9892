//! Route selection and quote combination for Uniswap-style V2/V3 liquidity.
//!
//! [`AlphaRouter`] is the entry point: it discovers candidate pools, quotes every route at a
//! grid of split percents, prices gas, and picks the best combination of splits.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod providers;
pub mod services;

pub use error::{RouterError, RouterErrorKind, RouterResult};
pub use services::{AlphaRouter, RouterProviders};
