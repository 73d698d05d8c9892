use alloy_primitives::{address, Address, Bytes, Keccak256, U256};
use alloy_sol_types::SolValue;
use num_bigint::BigUint;
use num_traits::Zero;

use crate::config::ChainTuning;
use crate::error::RouterError;
use crate::models::pool::Pool;
use crate::models::protocol::Protocol;
use crate::models::quote::RouteWithValidQuote;
use crate::models::route::Route;
use crate::models::swap::{MethodParameters, SwapOptions, SwapType};
use crate::models::token::{Token, TradeType};

const BPS_DENOMINATOR: u32 = 10_000;

/// SwapRouter02 recipient sentinels.
pub const MSG_SENDER: Address = address!("0000000000000000000000000000000000000001");
pub const ADDRESS_THIS: Address = address!("0000000000000000000000000000000000000002");

const MULTICALL_SIGNATURE: &str = "multicall(uint256,bytes[])";
const EXACT_INPUT_SIGNATURE: &str = "exactInput((bytes,address,uint256,uint256))";
const EXACT_OUTPUT_SIGNATURE: &str = "exactOutput((bytes,address,uint256,uint256))";
const V2_EXACT_IN_SIGNATURE: &str = "swapExactTokensForTokens(uint256,uint256,address[],address)";
const V2_EXACT_OUT_SIGNATURE: &str = "swapTokensForExactTokens(uint256,uint256,address[],address)";
const UNWRAP_WETH9_SIGNATURE: &str = "unwrapWETH9(uint256,address)";
const REFUND_ETH_SIGNATURE: &str = "refundETH()";

/// Which legs of the trade are the chain's native currency rather than an ERC-20.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NativeLegs {
    pub input: bool,
    pub output: bool,
}

/// Encodes the selected routes as one SwapRouter02 `multicall`.
pub fn build_method_parameters(
    chain: &ChainTuning,
    routes: &[RouteWithValidQuote],
    trade_type: TradeType,
    native: NativeLegs,
    options: &SwapOptions,
) -> Result<MethodParameters, RouterError> {
    if options.swap_type == SwapType::UniversalRouter {
        return Err(RouterError::unsupported(
            "UniversalRouter calldata is not supported",
        ));
    }
    if options.slippage_tolerance_bps > BPS_DENOMINATOR {
        return Err(RouterError::invalid(format!(
            "slippage tolerance must be <= {} bps, got {}",
            BPS_DENOMINATOR, options.slippage_tolerance_bps
        )));
    }
    if routes.is_empty() {
        return Err(RouterError::invalid("no routes to encode"));
    }

    let swap_recipient = if native.output {
        ADDRESS_THIS
    } else {
        options.recipient
    };

    let mut calls = Vec::with_capacity(routes.len() + 1);
    let mut total_amount = BigUint::zero();
    let mut total_limit = BigUint::zero();
    for record in routes {
        let limit = match trade_type {
            TradeType::ExactInput => {
                min_amount_out(&record.quote().raw, options.slippage_tolerance_bps)
            }
            TradeType::ExactOutput => {
                max_amount_in(&record.quote().raw, options.slippage_tolerance_bps)
            }
        };
        calls.extend(encode_route(
            record.route(),
            trade_type,
            &record.amount().raw,
            &limit,
            swap_recipient,
        )?);
        total_amount += &record.amount().raw;
        total_limit += limit;
    }

    if native.output {
        let minimum = match trade_type {
            TradeType::ExactInput => total_limit.clone(),
            TradeType::ExactOutput => total_amount.clone(),
        };
        calls.push(encode_function_call(
            UNWRAP_WETH9_SIGNATURE,
            (
                biguint_to_u256_checked(&minimum, "amountMinimum")?,
                options.recipient,
            )
                .abi_encode_params(),
        )?);
    }

    let mut value = BigUint::zero();
    if native.input {
        value = match trade_type {
            TradeType::ExactInput => total_amount,
            TradeType::ExactOutput => total_limit,
        };
        if trade_type == TradeType::ExactOutput {
            calls.push(encode_function_call(REFUND_ETH_SIGNATURE, Vec::new())?);
        }
    }

    let calldata = encode_function_call(
        MULTICALL_SIGNATURE,
        (
            U256::from(options.deadline),
            calls.into_iter().map(Bytes::from).collect::<Vec<_>>(),
        )
            .abi_encode_params(),
    )?;

    Ok(MethodParameters {
        to: chain.swap_router,
        calldata,
        value,
    })
}

/// Calldata for sizing L1 data fees before the caller's swap options are known.
pub fn estimate_calldata(
    chain: &ChainTuning,
    routes: &[RouteWithValidQuote],
    trade_type: TradeType,
) -> Result<Vec<u8>, RouterError> {
    let options = SwapOptions {
        swap_type: SwapType::SwapRouter02,
        recipient: MSG_SENDER,
        slippage_tolerance_bps: 50,
        deadline: u64::from(u32::MAX),
        simulate: None,
    };
    build_method_parameters(chain, routes, trade_type, NativeLegs::default(), &options)
        .map(|params| params.calldata)
}

pub fn min_amount_out(quote: &BigUint, slippage_bps: u32) -> BigUint {
    let keep = BPS_DENOMINATOR.saturating_sub(slippage_bps);
    quote * BigUint::from(keep) / BigUint::from(BPS_DENOMINATOR)
}

pub fn max_amount_in(quote: &BigUint, slippage_bps: u32) -> BigUint {
    quote * BigUint::from(BPS_DENOMINATOR + slippage_bps) / BigUint::from(BPS_DENOMINATOR)
}

fn encode_route(
    route: &Route,
    trade_type: TradeType,
    amount: &BigUint,
    limit: &BigUint,
    recipient: Address,
) -> Result<Vec<Vec<u8>>, RouterError> {
    let tokens = route.token_path();
    match route.protocol() {
        Protocol::V3 => Ok(vec![encode_v3_swap(
            route.pools(),
            tokens,
            trade_type,
            amount,
            limit,
            recipient,
        )?]),
        Protocol::V2 => Ok(vec![encode_v2_swap(
            tokens, trade_type, amount, limit, recipient,
        )?]),
        Protocol::Mixed => {
            if trade_type == TradeType::ExactOutput {
                return Err(RouterError::unsupported(
                    "Mixed routes cannot be encoded for EXACT_OUTPUT",
                ));
            }
            encode_mixed_exact_in(route, amount, limit, recipient)
        }
    }
}

/// Each section after the first spends the router's balance, which SwapRouter02 reads
/// when the amount is zero.
fn encode_mixed_exact_in(
    route: &Route,
    amount: &BigUint,
    min_out: &BigUint,
    recipient: Address,
) -> Result<Vec<Vec<u8>>, RouterError> {
    let sections = route.sections();
    let last = sections.len().saturating_sub(1);
    let tokens = route.token_path();
    let zero = BigUint::zero();

    let mut calls = Vec::with_capacity(sections.len());
    let mut offset = 0;
    for (index, (protocol, pools)) in sections.into_iter().enumerate() {
        let section_tokens = &tokens[offset..=offset + pools.len()];
        offset += pools.len();

        let amount_in = if index == 0 { amount } else { &zero };
        let (section_recipient, section_min) = if index == last {
            (recipient, min_out)
        } else {
            (ADDRESS_THIS, &zero)
        };
        let call = match protocol {
            Protocol::V3 => encode_v3_swap(
                pools,
                section_tokens,
                TradeType::ExactInput,
                amount_in,
                section_min,
                section_recipient,
            )?,
            Protocol::V2 => encode_v2_swap(
                section_tokens,
                TradeType::ExactInput,
                amount_in,
                section_min,
                section_recipient,
            )?,
            Protocol::Mixed => {
                return Err(RouterError::internal("mixed route section has no protocol"))
            }
        };
        calls.push(call);
    }
    Ok(calls)
}

fn encode_v3_swap(
    pools: &[Pool],
    tokens: &[Token],
    trade_type: TradeType,
    amount: &BigUint,
    limit: &BigUint,
    recipient: Address,
) -> Result<Vec<u8>, RouterError> {
    let path = Bytes::from(encode_v3_path(
        pools,
        tokens,
        trade_type == TradeType::ExactOutput,
    )?);
    let amount = biguint_to_u256_checked(amount, "amount")?;
    let limit = biguint_to_u256_checked(limit, "amount limit")?;
    let signature = match trade_type {
        TradeType::ExactInput => EXACT_INPUT_SIGNATURE,
        TradeType::ExactOutput => EXACT_OUTPUT_SIGNATURE,
    };
    encode_function_call(
        signature,
        ((path, recipient, amount, limit),).abi_encode_params(),
    )
}

fn encode_v2_swap(
    tokens: &[Token],
    trade_type: TradeType,
    amount: &BigUint,
    limit: &BigUint,
    recipient: Address,
) -> Result<Vec<u8>, RouterError> {
    let path: Vec<Address> = tokens.iter().map(|token| token.address).collect();
    let amount = biguint_to_u256_checked(amount, "amount")?;
    let limit = biguint_to_u256_checked(limit, "amount limit")?;
    let signature = match trade_type {
        TradeType::ExactInput => V2_EXACT_IN_SIGNATURE,
        TradeType::ExactOutput => V2_EXACT_OUT_SIGNATURE,
    };
    encode_function_call(signature, (amount, limit, path, recipient).abi_encode_params())
}

/// Packed `token (20) | fee (3) | token ...`; exact-output paths run from the output token.
pub fn encode_v3_path(
    pools: &[Pool],
    tokens: &[Token],
    reverse: bool,
) -> Result<Vec<u8>, RouterError> {
    if tokens.len() != pools.len() + 1 {
        return Err(RouterError::encoding("token path does not match pools"));
    }
    let fees = pools
        .iter()
        .map(|pool| {
            pool.as_v3()
                .map(|pool| pool.fee)
                .ok_or_else(|| RouterError::encoding("V3 path contains a non-V3 pool"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut ordered_tokens: Vec<&Token> = tokens.iter().collect();
    let mut ordered_fees = fees;
    if reverse {
        ordered_tokens.reverse();
        ordered_fees.reverse();
    }

    let mut path = Vec::with_capacity(20 + 23 * ordered_fees.len());
    path.extend_from_slice(ordered_tokens[0].address.as_slice());
    for (fee, token) in ordered_fees.iter().zip(ordered_tokens.iter().skip(1)) {
        path.extend_from_slice(&fee.to_be_bytes()[1..]);
        path.extend_from_slice(token.address.as_slice());
    }
    Ok(path)
}

fn biguint_to_u256_checked(value: &BigUint, label: &str) -> Result<U256, RouterError> {
    let bytes = value.to_bytes_be();
    if bytes.len() > 32 {
        return Err(RouterError::encoding(format!("{} must fit uint256", label)));
    }
    Ok(U256::from_be_slice(&bytes))
}

fn encode_function_call(signature: &str, encoded_args: Vec<u8>) -> Result<Vec<u8>, RouterError> {
    let selector = function_selector(signature)?;
    let mut call_data = Vec::with_capacity(4 + encoded_args.len());
    call_data.extend_from_slice(&selector);
    call_data.extend(encoded_args);
    Ok(call_data)
}

pub(crate) fn function_selector(signature: &str) -> Result<[u8; 4], RouterError> {
    let normalized = signature.trim();
    if !normalized.contains('(') {
        return Err(RouterError::encoding(format!(
            "Invalid function signature: {}",
            signature
        )));
    }
    let mut hasher = Keccak256::new();
    hasher.update(normalized.as_bytes());
    let hash = hasher.finalize();
    Ok([hash[0], hash[1], hash[2], hash[3]])
}
