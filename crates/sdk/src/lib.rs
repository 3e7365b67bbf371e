//! Token index SDK.
//!
//! # Overview
//!
//! Convenient in-memory cache of token metadata served by a GraphQL indexer
//! (subgraph), plus the search/merge logic a token picker needs on top of it.
//!
//! Use [`client::GraphClient`] (or any other [`client::TokenSource`]) with
//! [`tokens::TokenService`] to fill a [`state::Store`], then project the
//! cached records into [`types::Token`]s with [`tokens::Projector`] and
//! combine them with a static token list via [`search::CurrencySearch`].
//!
//! [`updater::Updater`] keeps the store populated in the background and turns
//! a stream of raw search input into debounced remote searches.
//!
//! See `./tests` for examples.
//!
//! # Limitations/follow-ups
//!
//! * Both indexer queries are capped at a fixed page size (10 results per
//!   search, 100 tokens total) with no pagination.
//!
//! * Static token lists are loaded from local JSON files only, remote list
//!   URLs are not resolved.
//!
//! # Features
//!
//! | Feature | Default | Description |
//! | --- | --- | --- |
//! | `display` | yes | Enables [`std::fmt::Display`] implementation for state types. |
//! | `testing` | yes | Enables [`testing`] module. |
//!
//! # Testing
//!
//! [`testing`] module provides an in-memory token source with scripted
//! responses and an optional simulated latency.

pub mod client;
pub mod error;
pub mod search;
pub mod state;
pub mod stream;
#[cfg(feature = "testing")]
pub mod testing;
pub mod tokens;
pub mod types;
pub mod updater;

use alloy::primitives::{Address, address};

#[derive(Clone, Debug)]
/// Chain the token index is serving.
pub struct Chain {
    chain_id: types::ChainId,
    graphql_endpoint: String,
    api_key: Option<String>,
    native: types::NativeCurrency,
    wrapped_native: Address,
}

impl Chain {
    /// Base Sepolia with the launchpad subgraph deployed on The Graph studio.
    pub fn base_sepolia() -> Self {
        Self {
            chain_id: 84532,
            graphql_endpoint: "https://api.studio.thegraph.com/query/107271/ift-test-sepolia/v0.8.1"
                .to_string(),
            api_key: Some("88d984a69147e7229d9a3dcb02519db0".to_string()),
            native: types::NativeCurrency::ether(),
            wrapped_native: address!("0x4200000000000000000000000000000000000006"),
        }
    }

    pub fn custom(
        chain_id: types::ChainId,
        graphql_endpoint: impl Into<String>,
        api_key: Option<String>,
        native: types::NativeCurrency,
        wrapped_native: Address,
    ) -> Self {
        Self {
            chain_id,
            graphql_endpoint: graphql_endpoint.into(),
            api_key,
            native,
            wrapped_native,
        }
    }

    pub fn chain_id(&self) -> types::ChainId { self.chain_id }

    pub fn graphql_endpoint(&self) -> &str { &self.graphql_endpoint }

    pub fn api_key(&self) -> Option<&str> { self.api_key.as_deref() }

    pub fn native_currency(&self) -> &types::NativeCurrency { &self.native }

    pub fn wrapped_native(&self) -> Address { self.wrapped_native }

    /// Whether token metadata for `chain_id` comes from this chain's indexer
    /// rather than from static token lists.
    pub fn is_graphql_backed(&self, chain_id: types::ChainId) -> bool { self.chain_id == chain_id }
}
