//! Token picker search.
//!
//! [`CurrencySearch`] combines a statically configured [`StaticTokenList`]
//! with indexer search results into the ordered candidate list shown to the
//! user, and decides what the Enter key selects.
//!
//! Filtering of the static list is synchronous and runs on every input
//! change, only the remote search is debounced (see
//! [`crate::stream::debounce`]).

use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
    path::Path,
};

use alloy::primitives::{Address, U256};
use itertools::Itertools;
use serde::Deserialize;

use crate::{
    error::IndexerError,
    types::{
        ChainId, Currency, NativeCurrency, SearchInput, Token, TokenAddressMap, parse_address,
    },
};

/// Address lookup of a known token.
pub trait TokenLookup {
    fn token(&self, address: Address) -> Option<Token>;
}

impl TokenLookup for TokenAddressMap {
    fn token(&self, address: Address) -> Option<Token> {
        self.values().find_map(|by_address| by_address.get(&address).cloned())
    }
}

impl<T: TokenLookup + ?Sized> TokenLookup for &T {
    fn token(&self, address: Address) -> Option<Token> { (**self).token(address) }
}

/// First lookup that knows the address wins.
impl<A: TokenLookup, B: TokenLookup> TokenLookup for (A, B) {
    fn token(&self, address: Address) -> Option<Token> {
        self.0.token(address).or_else(|| self.1.token(address))
    }
}

/// Statically configured tokens of one chain, in configuration order.
#[derive(Clone, Debug, Default)]
pub struct StaticTokenList {
    chain_id: ChainId,
    tokens: Vec<Token>,
}

/// Token list file entry.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenListEntry {
    chain_id: ChainId,
    address: String,
    decimals: u8,
    symbol: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TokenListFile {
    tokens: Vec<TokenListEntry>,
}

impl StaticTokenList {
    /// Builds the list from `tokens` of `chain_id`, ignoring tokens of other
    /// chains and repeated addresses.
    pub fn new(chain_id: ChainId, tokens: impl IntoIterator<Item = Token>) -> Self {
        let mut seen = HashSet::new();
        let tokens = tokens
            .into_iter()
            .filter(|t| t.chain_id() == chain_id && seen.insert(t.address()))
            .collect();
        Self { chain_id, tokens }
    }

    /// Parses a token list in the common `{"tokens": [...]}` JSON format.
    pub fn from_json(chain_id: ChainId, json: &str) -> Result<Self, IndexerError> {
        let file: TokenListFile = serde_json::from_str(json)?;
        let mut tokens = Vec::with_capacity(file.tokens.len());
        for entry in file.tokens {
            let address = parse_address(&entry.address).ok_or_else(|| {
                IndexerError::InvalidArgument(format!(
                    "invalid address of {} in token list: {}",
                    entry.symbol, entry.address
                ))
            })?;
            tokens.push(Token::new(entry.chain_id, address, entry.decimals, entry.symbol, entry.name));
        }
        Ok(Self::new(chain_id, tokens))
    }

    pub fn from_file(chain_id: ChainId, path: impl AsRef<Path>) -> Result<Self, IndexerError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            IndexerError::InvalidArgument(format!("reading {}: {}", path.display(), err))
        })?;
        Self::from_json(chain_id, &json)
    }

    pub fn chain_id(&self) -> ChainId { self.chain_id }

    pub fn tokens(&self) -> &[Token] { &self.tokens }

    pub fn is_empty(&self) -> bool { self.tokens.is_empty() }
}

impl TokenLookup for StaticTokenList {
    fn token(&self, address: Address) -> Option<Token> {
        self.tokens.iter().find(|t| t.address() == address).cloned()
    }
}

/// Tokens of `tokens` matching `query`.
///
/// Empty query matches everything, an address matches the token with that
/// address. Otherwise every whitespace-separated part of the query must be a
/// prefix or suffix of some word of the token symbol or name, ignoring case.
pub fn filter_tokens<'a>(tokens: impl IntoIterator<Item = &'a Token>, query: &str) -> Vec<Token> {
    let tokens = tokens.into_iter();
    if query.is_empty() {
        return tokens.cloned().collect();
    }

    if let Some(address) = parse_address(query) {
        return tokens.filter(|t| t.address() == address).cloned().collect();
    }

    let query = query.to_lowercase();
    let query_parts: Vec<_> = query.split_whitespace().collect();
    if query_parts.is_empty() {
        return tokens.cloned().collect();
    }

    let matches = |s: &str| {
        let s = s.to_lowercase();
        let words: Vec<_> = s.split_whitespace().collect();
        query_parts
            .iter()
            .all(|p| words.iter().any(|w| w.starts_with(*p) || w.ends_with(*p)))
    };

    tokens
        .filter(|t| matches(t.symbol()) || matches(t.name()))
        .cloned()
        .collect()
}

/// Candidate ordering of the token picker.
///
/// Tokens with a larger balance go first, tokens without a known balance
/// last, ties are broken by symbol ignoring case. `inverted` reverses the
/// whole order.
#[derive(Clone, Debug, Default)]
pub struct TokenComparator {
    inverted: bool,
    balances: HashMap<Address, U256>,
}

impl TokenComparator {
    pub fn new(inverted: bool) -> Self { Self { inverted, balances: HashMap::new() } }

    pub fn with_balances(mut self, balances: HashMap<Address, U256>) -> Self {
        self.balances = balances;
        self
    }

    pub fn inverted(&self) -> bool { self.inverted }

    pub fn compare(&self, a: &Token, b: &Token) -> Ordering {
        let ordering = self.compare_ascending(a, b);
        if self.inverted { ordering.reverse() } else { ordering }
    }

    fn compare_ascending(&self, a: &Token, b: &Token) -> Ordering {
        let balance = |t: &Token| self.balances.get(&t.address()).copied().filter(|b| !b.is_zero());
        match (balance(a), balance(b)) {
            (Some(a), Some(b)) if a != b => return b.cmp(&a),
            (Some(_), None) => return Ordering::Less,
            (None, Some(_)) => return Ordering::Greater,
            _ => {},
        }
        a.symbol().to_lowercase().cmp(&b.symbol().to_lowercase())
    }
}

/// Search state of a token picker.
#[derive(Clone, Debug)]
pub struct CurrencySearch {
    chain_id: ChainId,
    graphql_chain_id: ChainId,
    input: SearchInput,
    comparator: TokenComparator,
}

impl CurrencySearch {
    /// Picker for tokens of `chain_id`, using indexer search results when
    /// `chain_id` equals `graphql_chain_id`.
    pub fn new(chain_id: ChainId, graphql_chain_id: ChainId) -> Self {
        Self {
            chain_id,
            graphql_chain_id,
            input: SearchInput::Text(String::new()),
            comparator: TokenComparator::default(),
        }
    }

    pub fn with_comparator(mut self, comparator: TokenComparator) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn chain_id(&self) -> ChainId { self.chain_id }

    /// Switches to another active chain.
    pub fn set_chain_id(&mut self, chain_id: ChainId) { self.chain_id = chain_id; }

    /// Updates the raw query, valid addresses are kept checksummed.
    pub fn set_query(&mut self, input: &str) {
        self.input = SearchInput::new(input);
    }

    /// Resets the query, as done when the picker opens.
    pub fn reset(&mut self) { self.input = SearchInput::Text(String::new()); }

    /// Current query as shown in the input.
    pub fn query(&self) -> String { self.input.to_string() }

    pub fn toggle_sort_order(&mut self) {
        self.comparator.inverted = !self.comparator.inverted;
    }

    pub fn comparator(&self) -> &TokenComparator { &self.comparator }

    pub fn is_address_search(&self) -> bool { self.input.as_address().is_some() }

    /// Whether the native currency is offered above the token list.
    pub fn show_native(&self) -> bool {
        matches!(self.normalized_query().as_str(), "" | "e" | "et" | "eth")
    }

    /// Whether the active chain sources tokens from the indexer.
    pub fn is_graphql_chain(&self) -> bool { self.chain_id == self.graphql_chain_id }

    /// Whether a remote search should be issued for the settled query
    /// `debounced`.
    pub fn uses_graphql(&self, debounced: &str) -> bool {
        self.is_graphql_chain() && !debounced.trim().is_empty()
    }

    fn normalized_query(&self) -> String { self.query().trim().to_lowercase() }

    /// Candidates before sorting.
    ///
    /// Address queries resolve through `lookup` alone. On the indexer-backed
    /// chain with a non-empty query, `graphql_results` are appended to the
    /// filtered static list, skipping addresses already present.
    pub fn filtered_tokens(
        &self,
        static_list: &StaticTokenList,
        graphql_results: &[Token],
        lookup: impl TokenLookup,
    ) -> Vec<Token> {
        if let Some(address) = self.input.as_address() {
            return lookup.token(address).into_iter().collect();
        }

        let query = self.query();
        let static_filtered = filter_tokens(static_list.tokens(), &query);
        if self.is_graphql_chain() && !query.trim().is_empty() {
            // Static entries win on address conflicts
            return static_filtered
                .into_iter()
                .chain(graphql_results.iter().cloned())
                .unique_by(|t| t.address())
                .collect();
        }

        static_filtered
    }

    /// Candidates in display order.
    ///
    /// Sorted by the comparator, then exact symbol matches of a single-word
    /// query are moved to the front.
    pub fn filtered_sorted_tokens(
        &self,
        static_list: &StaticTokenList,
        graphql_results: &[Token],
        lookup: impl TokenLookup,
    ) -> Vec<Token> {
        if let Some(address) = self.input.as_address() {
            return lookup.token(address).into_iter().collect();
        }

        let mut sorted = self.filtered_tokens(static_list, graphql_results, lookup);
        sorted.sort_by(|a, b| self.comparator.compare(a, b));

        let query = self.query().to_lowercase();
        let words: Vec<_> = query.split_whitespace().collect();
        match words.as_slice() {
            [word] => {
                let (exact, rest): (Vec<_>, Vec<_>) =
                    sorted.into_iter().partition(|t| t.symbol().to_lowercase() == *word);
                exact.into_iter().chain(rest).collect()
            },
            _ => sorted,
        }
    }

    /// What pressing Enter selects, given the displayed `candidates`.
    ///
    /// "eth" selects the native currency. Otherwise the top candidate is
    /// selected when it is the only one or its symbol equals the query.
    pub fn select_on_enter(&self, candidates: &[Token], native: &NativeCurrency) -> Option<Currency> {
        let query = self.normalized_query();
        if query == "eth" {
            return Some(Currency::Native(native.clone()));
        }
        let top = candidates.first()?;
        if candidates.len() == 1 || top.symbol().to_lowercase() == query {
            return Some(Currency::Token(top.clone()));
        }
        None
    }
}
