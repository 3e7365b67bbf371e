use super::Token;

/// Native currency of a chain (not an ERC-20 token).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NativeCurrency {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
}

impl NativeCurrency {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>, decimals: u8) -> Self {
        Self { symbol: symbol.into(), name: name.into(), decimals }
    }

    pub fn ether() -> Self { Self::new("ETH", "Ether", 18) }
}

/// Anything the token picker can select.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Currency {
    Native(NativeCurrency),
    Token(Token),
}

impl Currency {
    pub fn symbol(&self) -> &str {
        match self {
            Currency::Native(native) => &native.symbol,
            Currency::Token(token) => token.symbol(),
        }
    }

    pub fn decimals(&self) -> u8 {
        match self {
            Currency::Native(native) => native.decimals,
            Currency::Token(token) => token.decimals(),
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Currency::Native(_) => None,
            Currency::Token(token) => Some(token),
        }
    }
}

impl From<Token> for Currency {
    fn from(token: Token) -> Self { Currency::Token(token) }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Native(native) => write!(f, "{} ({})", native.symbol, native.name),
            Currency::Token(token) => write!(f, "{}", token),
        }
    }
}
