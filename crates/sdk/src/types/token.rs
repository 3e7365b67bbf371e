use std::hash::{Hash, Hasher};

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use fastnum::UD256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ChainId, parse_address};

/// Token record exactly as served by the indexer.
///
/// Numbers are string-encoded and addresses come in whatever casing the
/// indexer stores, see [`IndexedToken`] for the validated form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteToken {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub decimals: String,
    pub total_supply: String,
    #[serde(default)]
    pub curve: Option<RemoteCurve>,
    #[serde(default)]
    pub creation: Option<RemoteCreation>,
}

/// Bonding curve the token is traded on.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCurve {
    pub id: String,
    pub price_in_capital: String,
    pub token_supply: String,
    pub capital: RemoteCapital,
}

/// Token the curve is priced in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCapital {
    pub id: String,
    pub symbol: String,
    pub decimals: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCreation {
    pub block_number: String,
    pub block_timestamp: String,
    pub creator: String,
}

/// Error validating a [`RemoteToken`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenParseError {
    #[error("invalid token address: {0:?}")]
    Address(String),

    #[error("invalid decimals of token {id}: {value:?}")]
    Decimals { id: String, value: String },

    #[error("invalid total supply of token {id}: {value:?}")]
    TotalSupply { id: String, value: String },

    #[error("invalid curve {field} of token {id}: {value:?}")]
    Curve { id: String, field: &'static str, value: String },

    #[error("invalid creation {field} of token {id}: {value:?}")]
    Creation { id: String, field: &'static str, value: String },
}

/// Token record that passed validation.
#[derive(Clone, derive_more::Debug, PartialEq, Eq)]
pub struct IndexedToken {
    address: Address,
    name: String,
    symbol: String,
    decimals: u8,
    #[debug("{total_supply}")]
    total_supply: U256,
    curve: Option<Curve>,
    creation: Option<Creation>,
}

#[derive(Clone, derive_more::Debug, PartialEq, Eq)]
pub struct Curve {
    address: Address,
    #[debug("{price_in_capital}")]
    price_in_capital: UD256,
    #[debug("{token_supply}")]
    token_supply: U256,
    capital: CapitalToken,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapitalToken {
    address: Address,
    symbol: String,
    decimals: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Creation {
    block_number: u64,
    block_timestamp: DateTime<Utc>,
    creator: Address,
}

impl IndexedToken {
    pub fn address(&self) -> Address { self.address }

    pub fn name(&self) -> &str { &self.name }

    pub fn symbol(&self) -> &str { &self.symbol }

    pub fn decimals(&self) -> u8 { self.decimals }

    /// Total supply in the smallest token units.
    pub fn total_supply(&self) -> U256 { self.total_supply }

    pub fn curve(&self) -> Option<&Curve> { self.curve.as_ref() }

    pub fn creation(&self) -> Option<&Creation> { self.creation.as_ref() }

    /// Projects the record into a [`Token`] on `chain_id`.
    pub fn to_token(&self, chain_id: ChainId) -> Token {
        Token::new(chain_id, self.address, self.decimals, self.symbol.clone(), self.name.clone())
    }
}

impl Curve {
    pub fn address(&self) -> Address { self.address }

    /// Current price of one token, denominated in [`Self::capital`].
    pub fn price_in_capital(&self) -> UD256 { self.price_in_capital }

    /// Tokens left on the curve, in the smallest token units.
    pub fn token_supply(&self) -> U256 { self.token_supply }

    pub fn capital(&self) -> &CapitalToken { &self.capital }
}

impl CapitalToken {
    pub fn address(&self) -> Address { self.address }

    pub fn symbol(&self) -> &str { &self.symbol }

    pub fn decimals(&self) -> u8 { self.decimals }
}

impl Creation {
    pub fn block_number(&self) -> u64 { self.block_number }

    pub fn block_timestamp(&self) -> DateTime<Utc> { self.block_timestamp }

    pub fn creator(&self) -> Address { self.creator }
}

impl TryFrom<&RemoteToken> for IndexedToken {
    type Error = TokenParseError;

    fn try_from(remote: &RemoteToken) -> Result<Self, Self::Error> {
        let id = &remote.id;
        let address = parse_address(id).ok_or_else(|| TokenParseError::Address(id.clone()))?;
        let decimals = remote.decimals.trim().parse::<u8>().map_err(|_| {
            TokenParseError::Decimals { id: id.clone(), value: remote.decimals.clone() }
        })?;
        let total_supply = remote.total_supply.trim().parse::<U256>().map_err(|_| {
            TokenParseError::TotalSupply { id: id.clone(), value: remote.total_supply.clone() }
        })?;
        let curve = remote.curve.as_ref().map(|c| Curve::parse(id, c)).transpose()?;
        let creation = remote.creation.as_ref().map(|c| Creation::parse(id, c)).transpose()?;

        Ok(Self {
            address,
            name: remote.name.clone(),
            symbol: remote.symbol.clone(),
            decimals,
            total_supply,
            curve,
            creation,
        })
    }
}

impl Curve {
    fn parse(id: &str, curve: &RemoteCurve) -> Result<Self, TokenParseError> {
        let err = |field, value: &str| TokenParseError::Curve {
            id: id.to_string(),
            field,
            value: value.to_string(),
        };
        Ok(Self {
            address: parse_address(&curve.id).ok_or_else(|| err("id", &curve.id))?,
            price_in_capital: curve
                .price_in_capital
                .trim()
                .parse::<UD256>()
                .map_err(|_| err("priceInCapital", &curve.price_in_capital))?,
            token_supply: curve
                .token_supply
                .trim()
                .parse::<U256>()
                .map_err(|_| err("tokenSupply", &curve.token_supply))?,
            capital: CapitalToken {
                address: parse_address(&curve.capital.id)
                    .ok_or_else(|| err("capital.id", &curve.capital.id))?,
                symbol: curve.capital.symbol.clone(),
                decimals: curve
                    .capital
                    .decimals
                    .trim()
                    .parse::<u8>()
                    .map_err(|_| err("capital.decimals", &curve.capital.decimals))?,
            },
        })
    }
}

impl Creation {
    fn parse(id: &str, creation: &RemoteCreation) -> Result<Self, TokenParseError> {
        let err = |field, value: &str| TokenParseError::Creation {
            id: id.to_string(),
            field,
            value: value.to_string(),
        };
        let block_timestamp = creation
            .block_timestamp
            .trim()
            .parse::<i64>()
            .ok()
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .ok_or_else(|| err("blockTimestamp", &creation.block_timestamp))?;
        Ok(Self {
            block_number: creation
                .block_number
                .trim()
                .parse::<u64>()
                .map_err(|_| err("blockNumber", &creation.block_number))?,
            block_timestamp,
            creator: parse_address(&creation.creator)
                .ok_or_else(|| err("creator", &creation.creator))?,
        })
    }
}

/// Record the indexer returned that failed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedToken {
    pub id: String,
    pub error: TokenParseError,
}

/// Result of validating a batch of [`RemoteToken`]s.
///
/// Order of accepted tokens follows the order the indexer returned them in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ingested {
    pub tokens: Vec<IndexedToken>,
    pub rejected: Vec<RejectedToken>,
}

impl Ingested {
    pub fn from_remote(remote: &[RemoteToken]) -> Self {
        let mut ingested = Self::default();
        for token in remote {
            match IndexedToken::try_from(token) {
                Ok(token) => ingested.tokens.push(token),
                Err(error) => {
                    tracing::warn!(id = %token.id, %error, "quarantined malformed token record");
                    ingested.rejected.push(RejectedToken { id: token.id.clone(), error });
                },
            }
        }
        ingested
    }
}

/// ERC-20 token on a particular chain.
///
/// Two tokens are equal when they share chain and address, regardless of
/// metadata.
#[derive(Clone, Debug, Eq)]
pub struct Token {
    chain_id: ChainId,
    address: Address,
    decimals: u8,
    symbol: String,
    name: String,
}

impl Token {
    pub fn new(
        chain_id: ChainId,
        address: Address,
        decimals: u8,
        symbol: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self { chain_id, address, decimals, symbol: symbol.into(), name: name.into() }
    }

    pub fn chain_id(&self) -> ChainId { self.chain_id }

    pub fn address(&self) -> Address { self.address }

    pub fn decimals(&self) -> u8 { self.decimals }

    pub fn symbol(&self) -> &str { &self.symbol }

    pub fn name(&self) -> &str { &self.name }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.chain_id == other.chain_id && self.address == other.address
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.chain_id.hash(state);
        self.address.hash(state);
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if f.alternate() {
            write!(f, "{}", self.symbol)
        } else {
            write!(f, "{} ({}) {}", self.symbol, self.name, self.address)
        }
    }
}

#[cfg(feature = "display")]
impl tabled::Tabled for Token {
    const LENGTH: usize = 4;

    fn fields(&self) -> Vec<std::borrow::Cow<'_, str>> {
        use colored::Colorize;

        vec![
            self.symbol.bold().to_string().into(),
            self.name.as_str().into(),
            self.address.to_string().into(),
            self.decimals.to_string().into(),
        ]
    }

    fn headers() -> Vec<std::borrow::Cow<'static, str>> {
        vec!["Symbol".into(), "Name".into(), "Address".into(), "Decimals".into()]
    }
}

#[cfg(feature = "display")]
impl tabled::Tabled for IndexedToken {
    const LENGTH: usize = 7;

    fn fields(&self) -> Vec<std::borrow::Cow<'_, str>> {
        use colored::Colorize;

        vec![
            self.symbol.bold().to_string().into(),
            self.name.as_str().into(),
            self.address.to_string().into(),
            self.decimals.to_string().into(),
            self.total_supply.to_string().into(),
            match &self.curve {
                Some(curve) => {
                    format!("{} {}", curve.price_in_capital, curve.capital.symbol).green().to_string().into()
                },
                None => "-".into(),
            },
            match &self.creation {
                Some(creation) => format!(
                    "#{} @ {}",
                    creation.block_number,
                    creation.block_timestamp.format("%Y-%m-%d %H:%M:%S")
                )
                .into(),
                None => "-".into(),
            },
        ]
    }

    fn headers() -> Vec<std::borrow::Cow<'static, str>> {
        vec![
            "Symbol".into(),
            "Name".into(),
            "Address".into(),
            "Decimals".into(),
            "Total Supply".into(),
            "Price".into(),
            "Created".into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    fn remote(id: &str, decimals: &str) -> RemoteToken {
        RemoteToken {
            id: id.to_string(),
            name: "Fox Token".to_string(),
            symbol: "FOX".to_string(),
            decimals: decimals.to_string(),
            total_supply: "1000000000000000000000000000".to_string(),
            curve: Some(RemoteCurve {
                id: "0x00000000000000000000000000000000000000c1".to_string(),
                price_in_capital: "0.000000012".to_string(),
                token_supply: "800000000000000000000000000".to_string(),
                capital: RemoteCapital {
                    id: "0x4200000000000000000000000000000000000006".to_string(),
                    symbol: "WETH".to_string(),
                    decimals: "18".to_string(),
                },
            }),
            creation: Some(RemoteCreation {
                block_number: "21000000".to_string(),
                block_timestamp: "1735689600".to_string(),
                creator: "0x00000000000000000000000000000000000000aa".to_string(),
            }),
        }
    }

    #[test]
    fn test_deserialize_indexer_record() {
        let json = r#"{
            "id": "0x00000000000000000000000000000000000000f0",
            "name": "Fox Token",
            "symbol": "FOX",
            "decimals": "18",
            "curve": {
                "id": "0x00000000000000000000000000000000000000c1",
                "priceInCapital": "0.5",
                "capital": {
                    "id": "0x4200000000000000000000000000000000000006",
                    "symbol": "WETH",
                    "decimals": "18",
                    "__typename": "Token"
                },
                "tokenSupply": "100",
                "__typename": "Curve"
            },
            "totalSupply": "1000",
            "creation": {
                "blockTimestamp": "1735689600",
                "creator": "0x00000000000000000000000000000000000000aa",
                "blockNumber": "42",
                "__typename": "Creation"
            },
            "__typename": "Token"
        }"#;
        let token: RemoteToken = serde_json::from_str(json).unwrap();
        assert_eq!(token.symbol, "FOX");
        assert_eq!(token.curve.as_ref().unwrap().capital.symbol, "WETH");

        let indexed = IndexedToken::try_from(&token).unwrap();
        assert_eq!(indexed.address(), address!("0x00000000000000000000000000000000000000f0"));
        assert_eq!(indexed.decimals(), 18);
        assert_eq!(indexed.total_supply(), U256::from(1000));
        assert_eq!(indexed.curve().unwrap().price_in_capital(), "0.5".parse::<UD256>().unwrap());
        assert_eq!(indexed.creation().unwrap().block_number(), 42);
        assert_eq!(indexed.creation().unwrap().block_timestamp().timestamp(), 1735689600);
    }

    #[test]
    fn test_missing_relations() {
        let json = r#"{
            "id": "0x00000000000000000000000000000000000000f0",
            "name": "Fox Token",
            "symbol": "FOX",
            "decimals": "6",
            "totalSupply": "1000",
            "curve": null
        }"#;
        let token: RemoteToken = serde_json::from_str(json).unwrap();
        let indexed = IndexedToken::try_from(&token).unwrap();
        assert!(indexed.curve().is_none());
        assert!(indexed.creation().is_none());
        assert_eq!(indexed.decimals(), 6);
    }

    #[test]
    fn test_malformed_decimals_rejected() {
        let token = remote("0x00000000000000000000000000000000000000f0", "eighteen");
        assert_eq!(
            IndexedToken::try_from(&token),
            Err(TokenParseError::Decimals {
                id: token.id.clone(),
                value: "eighteen".to_string()
            })
        );

        // Does not fit into u8
        let token = remote("0x00000000000000000000000000000000000000f0", "256");
        assert!(matches!(IndexedToken::try_from(&token), Err(TokenParseError::Decimals { .. })));
    }

    #[test]
    fn test_malformed_address_rejected() {
        let token = remote("not-an-address", "18");
        assert_eq!(
            IndexedToken::try_from(&token),
            Err(TokenParseError::Address("not-an-address".to_string()))
        );
    }

    #[test]
    fn test_malformed_curve_rejected() {
        let mut token = remote("0x00000000000000000000000000000000000000f0", "18");
        token.curve.as_mut().unwrap().price_in_capital = "NaN?".to_string();
        assert!(matches!(
            IndexedToken::try_from(&token),
            Err(TokenParseError::Curve { field: "priceInCapital", .. })
        ));
    }

    #[test]
    fn test_ingest_quarantines() {
        let batch = vec![
            remote("0x00000000000000000000000000000000000000f0", "18"),
            remote("0x00000000000000000000000000000000000000f1", "x"),
            remote("0x00000000000000000000000000000000000000f2", "9"),
        ];
        let ingested = Ingested::from_remote(&batch);
        assert_eq!(ingested.tokens.len(), 2);
        assert_eq!(ingested.tokens[1].decimals(), 9);
        assert_eq!(ingested.rejected.len(), 1);
        assert_eq!(ingested.rejected[0].id, "0x00000000000000000000000000000000000000f1");
    }

    #[test]
    fn test_token_equality_by_address() {
        let addr = address!("0x00000000000000000000000000000000000000f0");
        let a = Token::new(84532, addr, 18, "FOX", "Fox Token");
        let b = Token::new(84532, addr, 6, "FOX2", "Other");
        let c = Token::new(1, addr, 18, "FOX", "Fox Token");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
