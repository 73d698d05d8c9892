use tracing::{debug, warn};

use crate::models::pool::Pool;
use crate::models::protocol::Protocol;
use crate::models::route::Route;
use crate::models::token::Token;

/// Every simple path from `input` to `output` through at most `max_hops` pools. A path
/// never reuses a pool and never revisits a token.
pub fn compute_all_routes(
    protocol: Protocol,
    input: &Token,
    output: &Token,
    pools: &[Pool],
    max_hops: usize,
) -> Vec<Route> {
    let mut routes = Vec::new();
    let mut used = vec![false; pools.len()];
    let mut path: Vec<usize> = Vec::new();
    let mut visited: Vec<Token> = vec![input.clone()];
    walk(
        pools,
        input,
        output,
        max_hops,
        &mut used,
        &mut path,
        &mut visited,
        &mut |indices| {
            let route_pools = indices.iter().map(|index| pools[*index].clone()).collect();
            match Route::new(protocol, route_pools, input.clone(), output.clone()) {
                Ok(route) => routes.push(route),
                Err(err) => warn!(error = %err, "Skipping malformed route"),
            }
        },
    );
    debug!(
        protocol = %protocol,
        pools = pools.len(),
        routes = routes.len(),
        max_hops,
        "Enumerated routes"
    );
    routes
}

#[allow(clippy::too_many_arguments)]
fn walk<F>(
    pools: &[Pool],
    current: &Token,
    output: &Token,
    max_hops: usize,
    used: &mut [bool],
    path: &mut Vec<usize>,
    visited: &mut Vec<Token>,
    emit: &mut F,
) where
    F: FnMut(&[usize]),
{
    if path.len() >= max_hops {
        return;
    }
    for index in 0..pools.len() {
        if used[index] {
            continue;
        }
        let Some(next) = pools[index].other_token(current) else {
            continue;
        };
        if visited.contains(next) {
            continue;
        }
        let next = next.clone();
        used[index] = true;
        path.push(index);
        if next == *output {
            emit(path.as_slice());
        } else {
            visited.push(next.clone());
            walk(pools, &next, output, max_hops, used, path, visited, emit);
            visited.pop();
        }
        path.pop();
        used[index] = false;
    }
}

/// Routes over V3 and V2 pools that touch both protocols.
pub fn compute_all_mixed_routes(
    input: &Token,
    output: &Token,
    pools: &[Pool],
    max_hops: usize,
) -> Vec<Route> {
    compute_all_routes(Protocol::Mixed, input, output, pools, max_hops)
        .into_iter()
        .filter(|route| {
            let has_v3 = route.pools().iter().any(|pool| pool.protocol() == Protocol::V3);
            let has_v2 = route.pools().iter().any(|pool| pool.protocol() == Protocol::V2);
            has_v3 && has_v2
        })
        .collect()
}
