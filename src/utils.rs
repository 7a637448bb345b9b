//! Utility functions and type conversions for relayer operations.
//!
//! Chain lookups, well-known Balancer deployment addresses, address parsing
//! and the signed-integer conversion used to turn vault deltas into amounts.

use crate::errors::{Result, UtilityError};
use alloy::primitives::{address, Address, U256};
use num_bigint::BigInt;
use num_traits::Signed;
use std::str::FromStr;

/// Balancer V2 vault, deployed at the same address on every supported chain.
pub const VAULT_ADDRESS: Address = address!("ba12222222228d8ba445958a75a0704d566bf2c8");

/// Balancer relayer on Ethereum mainnet.
pub const MAINNET_RELAYER_ADDRESS: Address = address!("35cea9e57a393ac66aaa7e25c391d52c74b5648f");

/// Parse a string representation of an Ethereum address.
///
/// Accepts addresses with or without the "0x" prefix. Checksums are not enforced.
///
/// # Errors
///
/// Returns `UtilityError::AddressParsingFailed` if the string is not 20 hex-encoded bytes.
pub fn string_to_address(s: &str) -> Result<Address> {
    Address::from_str(s.trim_start_matches("0x")).map_err(|source| {
        UtilityError::AddressParsingFailed {
            input: s.to_string(),
            source: alloy::primitives::AddressError::Hex(source),
        }
        .into()
    })
}

/// Convert a non-negative BigInt to a U256 value.
///
/// # Errors
///
/// - `UtilityError::NegativeValue` if the value is below zero
/// - `UtilityError::ValueTooLarge` if the value does not fit in 256 bits
pub fn bigint_to_u256(val: &BigInt) -> Result<U256> {
    if val.is_negative() {
        return Err(UtilityError::NegativeValue { value: val.to_string() }.into());
    }
    let (_, bytes) = val.to_bytes_be();
    if bytes.len() > 32 {
        return Err(UtilityError::ValueTooLarge.into());
    }
    let mut u256_bytes = [0u8; 32];
    u256_bytes[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(U256::from_be_bytes(u256_bytes))
}

/// Get the chain ID for a given blockchain name.
///
/// # Errors
///
/// Returns `UtilityError::UnsupportedChain` for unknown names.
pub fn chain_id(chain: &str) -> Result<u64> {
    match chain {
        "ethereum" => Ok(1),
        "polygon" => Ok(137),
        "arbitrum" => Ok(42161),
        "gnosis" => Ok(100),
        _ => Err(UtilityError::UnsupportedChain {
            chain: chain.to_string(),
        }
        .into()),
    }
}

/// Get the chain name for a given chain ID. Reverse of `chain_id()`.
pub fn chain_name(chain_id: u64) -> Result<&'static str> {
    match chain_id {
        1 => Ok("ethereum"),
        137 => Ok("polygon"),
        42161 => Ok("arbitrum"),
        100 => Ok("gnosis"),
        _ => Err(UtilityError::UnsupportedChain {
            chain: chain_id.to_string(),
        }
        .into()),
    }
}

/// Default relayer deployment for a chain.
///
/// # Errors
///
/// - `UtilityError::UnsupportedChain` for unknown chains
/// - `UtilityError::UnknownRelayer` for supported chains without a built-in
///   deployment; those need an explicit `RELAYER_ADDRESS`
pub fn relayer_address(chain: &str) -> Result<Address> {
    chain_id(chain)?;
    match chain {
        "ethereum" => Ok(MAINNET_RELAYER_ADDRESS),
        _ => Err(UtilityError::UnknownRelayer {
            chain: chain.to_string(),
        }
        .into()),
    }
}
