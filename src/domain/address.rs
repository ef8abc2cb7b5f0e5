//! Address format checks per chain family.
//!
//! These are syntactic checks only: no checksum verification and no network
//! access. They exist to reject obviously malformed input before any
//! outbound request is made.

use std::ops::RangeInclusive;

use super::types::Chain;

const BECH32_PREFIXES: [&str; 3] = ["bcrt1", "bc1", "tb1"];
const BECH32_CHARSET: &str = "0123456789acdefghjklmnpqrstuvwxyz";

/// `0x` followed by exactly 40 hex characters.
#[must_use]
pub fn is_evm_address(addr: &str) -> bool {
    match addr.strip_prefix("0x") {
        Some(hex) => hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

/// `T` followed by exactly 33 ASCII alphanumeric characters.
#[must_use]
pub fn is_tron_address(addr: &str) -> bool {
    match addr.strip_prefix('T') {
        Some(rest) => rest.len() == 33 && rest.chars().all(|c| c.is_ascii_alphanumeric()),
        None => false,
    }
}

/// Bech32-style (`bc1`, `tb1`, `bcrt1`) or base58 with 26..=62 characters.
#[must_use]
pub fn is_btc_address(addr: &str) -> bool {
    if addr.is_empty() {
        return false;
    }
    is_bech32_like(addr) || is_base58_within(addr, 26..=62)
}

/// Base58 with 32..=44 characters.
#[must_use]
pub fn is_solana_address(addr: &str) -> bool {
    is_base58_within(addr, 32..=44)
}

/// Dispatches to the validator for `chain`.
#[must_use]
pub fn is_valid_address(chain: Chain, addr: &str) -> bool {
    match chain {
        Chain::Eth | Chain::Bsc => is_evm_address(addr),
        Chain::Tron => is_tron_address(addr),
        Chain::Btc => is_btc_address(addr),
        Chain::Sol => is_solana_address(addr),
    }
}

/// Message returned for addresses that fail [`is_valid_address`].
#[must_use]
pub fn invalid_address_message(chain: Chain) -> String {
    format!("Invalid {} address", chain.display_name())
}

fn is_bech32_like(addr: &str) -> bool {
    BECH32_PREFIXES.iter().any(|prefix| {
        addr.strip_prefix(prefix).is_some_and(|data| {
            !data.is_empty() && data.chars().all(|c| BECH32_CHARSET.contains(c))
        })
    })
}

// Length is checked first: decoding is quadratic in the input length.
fn is_base58_within(addr: &str, len: RangeInclusive<usize>) -> bool {
    len.contains(&addr.len()) && bs58::decode(addr).into_vec().is_ok()
}
