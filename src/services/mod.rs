pub mod best_swap_route;
pub mod calldata;
pub mod distribution;
pub mod gas_model;
pub mod quoters;
pub mod ratio;
pub mod retry;
pub mod route_cache;
pub mod router;
pub mod tick_math;

pub use best_swap_route::{get_best_swap_route, BestSwapRoute};
pub use router::{AlphaRouter, RouterProviders};
