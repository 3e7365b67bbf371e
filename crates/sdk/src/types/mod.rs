mod currency;
mod token;

use std::{collections::HashMap, str::FromStr};

use alloy::primitives::Address;
pub use currency::{Currency, NativeCurrency};
pub use token::*;

/// EIP-155 chain ID.
pub type ChainId = u64;

/// Tokens keyed by chain, then by address.
pub type TokenAddressMap = HashMap<ChainId, HashMap<Address, Token>>;

/// Raw text typed into a token search box.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchInput {
    Address(Address),
    Text(String),
}

impl SearchInput {
    /// Interprets `s` as an address if it is one, as search text otherwise.
    pub fn new(s: &str) -> Self {
        match parse_address(s) {
            Some(address) => SearchInput::Address(address),
            None => SearchInput::Text(s.to_string()),
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            SearchInput::Address(address) => Some(*address),
            SearchInput::Text(_) => None,
        }
    }
}

/// Parses `s` as an account/contract address.
///
/// All-lowercase and all-uppercase hex is accepted as is, mixed case must
/// carry a valid EIP-55 checksum.
pub fn parse_address(s: &str) -> Option<Address> {
    let s = s.trim();
    let address = Address::from_str(s).ok()?;
    let hex = s.strip_prefix("0x").unwrap_or(s);
    let has_lower = hex.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = hex.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper {
        let checksummed = address.to_checksum(None);
        if checksummed.strip_prefix("0x") != Some(hex) {
            return None;
        }
    }
    Some(address)
}

impl FromStr for SearchInput {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(SearchInput::new(s)) }
}

impl std::fmt::Display for SearchInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Checksummed form
            SearchInput::Address(address) => write!(f, "{}", address),
            SearchInput::Text(text) => write!(f, "{}", text),
        }
    }
}
