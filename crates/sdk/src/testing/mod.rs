//! In-memory token source and record builders for tests.

mod source;

pub use source::*;

use crate::types::{RemoteCapital, RemoteCreation, RemoteCurve, RemoteToken};

/// Address of the `n`-th test token, all lowercase.
pub fn token_address(n: u8) -> String { format!("0x{:040x}", n) }

/// Well-formed indexer record of the `n`-th test token, with a bonding
/// curve and creation info.
pub fn remote_token(n: u8, symbol: &str, name: &str, decimals: &str) -> RemoteToken {
    RemoteToken {
        id: token_address(n),
        name: name.to_string(),
        symbol: symbol.to_string(),
        decimals: decimals.to_string(),
        total_supply: "1000000000000000000000000000".to_string(),
        curve: Some(RemoteCurve {
            id: format!("0x{:040x}", 0x1000 + n as u32),
            price_in_capital: "0.000000012345".to_string(),
            token_supply: "800000000000000000000000000".to_string(),
            capital: RemoteCapital {
                id: "0x4200000000000000000000000000000000000006".to_string(),
                symbol: "WETH".to_string(),
                decimals: "18".to_string(),
            },
        }),
        creation: Some(RemoteCreation {
            block_number: (21_000_000 + n as u64).to_string(),
            block_timestamp: (1_735_689_600 + n as u64 * 12).to_string(),
            creator: "0x00000000000000000000000000000000000000c0".to_string(),
        }),
    }
}

/// Indexer record without curve and creation info.
pub fn bare_remote_token(n: u8, symbol: &str, name: &str) -> RemoteToken {
    RemoteToken { curve: None, creation: None, ..remote_token(n, symbol, name, "18") }
}
