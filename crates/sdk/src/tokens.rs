//! Token cache operations and projections.
//!
//! [`TokenService`] drives the [`Store`] through its transitions while
//! talking to a [`TokenSource`]. Projections turn cached
//! [`IndexedToken`]s into [`Token`]s for a particular chain.

use std::{collections::HashMap, sync::Arc};

use crate::{
    client::TokenSource,
    error::IndexerError,
    state::{Action, Store, TokensState},
    types::{ChainId, IndexedToken, Ingested, Token, TokenAddressMap},
};

/// Result of a committed or discarded search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Results were stored, with number of accepted tokens.
    Committed(usize),
    /// A newer search or a clear happened while this one was in flight,
    /// the results were dropped.
    Stale,
}

/// Fetches tokens from a [`TokenSource`] into a [`Store`].
///
/// Every operation both records its outcome in the store (including the
/// error text on failure) and returns it to the caller.
#[derive(Debug)]
pub struct TokenService<S> {
    store: Store,
    source: S,
}

impl<S: TokenSource> TokenService<S> {
    pub fn new(store: Store, source: S) -> Self { Self { store, source } }

    pub fn store(&self) -> &Store { &self.store }

    pub fn source(&self) -> &S { &self.source }

    /// Loads all tokens, replacing the cached collection.
    ///
    /// Returns number of accepted tokens.
    pub async fn fetch_all(&self) -> Result<usize, IndexerError> {
        self.store.dispatch(Action::FetchStart);
        self.load_all().await
    }

    /// Loads all tokens if none are loaded and no load is in progress.
    ///
    /// Returns `None` if the load was not needed.
    pub async fn auto_fetch(&self) -> Option<Result<usize, IndexerError>> {
        if !self.store.try_start_fetch() {
            return None;
        }
        Some(self.load_all().await)
    }

    /// Reloads all tokens unless a load is already in progress.
    pub async fn refresh(&self) -> Option<Result<usize, IndexerError>> {
        if !self.store.try_start_refresh() {
            return None;
        }
        Some(self.load_all().await)
    }

    async fn load_all(&self) -> Result<usize, IndexerError> {
        let pending =
            Pending::new(&self.store, Action::FetchError { error: CANCELLED.to_string() });
        match self.source.all_tokens().await {
            Ok(remote) => {
                let tokens = Ingested::from_remote(&remote);
                let accepted = tokens.tokens.len();
                pending.settle(Action::FetchSuccess { tokens });
                Ok(accepted)
            },
            Err(err) => {
                pending.settle(Action::FetchError { error: err.to_string() });
                Err(err)
            },
        }
    }

    /// Searches tokens by name.
    ///
    /// A search superseded by a newer one or by [`Self::clear`] returns
    /// [`SearchOutcome::Stale`] whether it succeeded or failed.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome, IndexerError> {
        let generation = self.store.next_search_generation();
        self.store.dispatch(Action::SearchStart { query: query.to_string(), generation });

        let pending = Pending::new(
            &self.store,
            Action::SearchError {
                query: query.to_string(),
                generation,
                error: CANCELLED.to_string(),
            },
        );
        match self.source.search_tokens(query).await {
            Ok(remote) => {
                let tokens = Ingested::from_remote(&remote);
                let accepted = tokens.tokens.len();
                let committed = pending.settle(Action::SearchSuccess {
                    query: query.to_string(),
                    generation,
                    tokens,
                });
                Ok(if committed { SearchOutcome::Committed(accepted) } else { SearchOutcome::Stale })
            },
            Err(err) => {
                let committed = pending.settle(Action::SearchError {
                    query: query.to_string(),
                    generation,
                    error: err.to_string(),
                });
                if committed { Err(err) } else { Ok(SearchOutcome::Stale) }
            },
        }
    }

    /// Clears search results, discarding any search still in flight.
    pub fn clear(&self) { self.store.dispatch(Action::ClearSearch); }
}

/// Error recorded for a load or search abandoned before completion.
pub const CANCELLED: &str = "request cancelled";

/// In-flight request started in the store.
///
/// Dropped without [`Pending::settle`], e.g. when the request future is
/// cancelled, it dispatches its fallback so the store does not stay loading.
struct Pending<'a> {
    store: &'a Store,
    fallback: Option<Action>,
}

impl<'a> Pending<'a> {
    fn new(store: &'a Store, fallback: Action) -> Self { Self { store, fallback: Some(fallback) } }

    /// Dispatches the final `action`, returns whether it was applied.
    fn settle(mut self, action: Action) -> bool {
        self.fallback = None;
        self.store.dispatch(action)
    }
}

impl Drop for Pending<'_> {
    fn drop(&mut self) {
        if let Some(action) = self.fallback.take() {
            tracing::debug!(?action, "request dropped before completion");
            self.store.dispatch(action);
        }
    }
}

/// Cached tokens projected onto `chain_id`, in cache order.
pub fn all_tokens(state: &TokensState, chain_id: ChainId) -> Vec<Token> {
    project(state.all_tokens().data(), chain_id)
}

/// Search results projected onto `chain_id`, in indexer order.
pub fn search_results(state: &TokensState, chain_id: ChainId) -> Vec<Token> {
    project(state.search_results().data(), chain_id)
}

fn project(tokens: &[IndexedToken], chain_id: ChainId) -> Vec<Token> {
    tokens.iter().map(|t| t.to_token(chain_id)).collect()
}

/// Single-chain address map of `tokens`.
///
/// Later duplicates of an address replace earlier ones. Addresses are
/// compared as values, so differently cased spellings of one address are
/// the same key.
pub fn address_map(tokens: &[Token], chain_id: ChainId) -> TokenAddressMap {
    let mut by_address = HashMap::with_capacity(tokens.len());
    for token in tokens {
        by_address.insert(token.address(), token.clone());
    }
    HashMap::from([(chain_id, by_address)])
}

/// Memoized projections of a [`TokensState`].
///
/// Each projection is recomputed only when the underlying collection was
/// replaced or the target chain changed.
#[derive(Debug, Default)]
pub struct Projector {
    all_tokens: Option<Memo<Arc<[Token]>>>,
    search_results: Option<Memo<Arc<[Token]>>>,
    address_map: Option<Memo<Arc<TokenAddressMap>>>,
}

#[derive(Debug)]
struct Memo<T> {
    revision: u64,
    chain_id: ChainId,
    value: T,
}

impl<T: Clone> Memo<T> {
    fn get_or_update(
        slot: &mut Option<Self>,
        revision: u64,
        chain_id: ChainId,
        compute: impl FnOnce() -> T,
    ) -> T {
        match slot {
            Some(memo) if memo.revision == revision && memo.chain_id == chain_id => {
                memo.value.clone()
            },
            _ => {
                let value = compute();
                *slot = Some(Self { revision, chain_id, value: value.clone() });
                value
            },
        }
    }
}

impl Projector {
    pub fn new() -> Self { Self::default() }

    pub fn all_tokens(&mut self, state: &TokensState, chain_id: ChainId) -> Arc<[Token]> {
        Memo::get_or_update(
            &mut self.all_tokens,
            state.all_tokens().revision(),
            chain_id,
            || all_tokens(state, chain_id).into(),
        )
    }

    pub fn search_results(&mut self, state: &TokensState, chain_id: ChainId) -> Arc<[Token]> {
        Memo::get_or_update(
            &mut self.search_results,
            state.search_results().revision(),
            chain_id,
            || search_results(state, chain_id).into(),
        )
    }

    pub fn address_map(&mut self, state: &TokensState, chain_id: ChainId) -> Arc<TokenAddressMap> {
        let tokens = self.all_tokens(state, chain_id);
        Memo::get_or_update(
            &mut self.address_map,
            state.all_tokens().revision(),
            chain_id,
            || Arc::new(address_map(&tokens, chain_id)),
        )
    }
}
