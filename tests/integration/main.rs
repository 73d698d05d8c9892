mod route_cache;
mod route_to_ratio;
mod routing;
mod support;
mod token_validation;
