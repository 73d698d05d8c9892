pub mod cache;
pub mod fraction;
pub mod pool;
pub mod protocol;
pub mod quote;
pub mod route;
pub mod swap;
pub mod token;
