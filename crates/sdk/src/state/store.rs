use std::sync::Arc;

use tokio::sync::watch;

use super::{Action, SearchGeneration, TokensState};

/// Shared container of [`TokensState`].
///
/// All mutations go through [`Store::dispatch`] and are applied one at a time
/// in dispatch order. Subscribers are woken only by transitions that
/// actually changed the state.
///
/// Cloning the store yields another handle to the same state.
#[derive(Clone, Debug)]
pub struct Store {
    tx: Arc<watch::Sender<TokensState>>,
}

impl Default for Store {
    fn default() -> Self { Self::new(TokensState::default()) }
}

impl Store {
    pub fn new(initial: TokensState) -> Self { Self { tx: Arc::new(watch::Sender::new(initial)) } }

    /// Applies `action` to the state, returns `false` if it had no effect.
    pub fn dispatch(&self, action: Action) -> bool {
        self.tx.send_if_modified(|state| state.reduce(action))
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> TokensState { self.tx.borrow().clone() }

    /// Runs `f` against the current state without cloning it.
    ///
    /// The store is locked for the duration of `f`, dispatches block until
    /// it returns.
    pub fn with_state<R>(&self, f: impl FnOnce(&TokensState) -> R) -> R { f(&self.tx.borrow()) }

    /// Receiver notified about each effective transition.
    pub fn subscribe(&self) -> watch::Receiver<TokensState> { self.tx.subscribe() }

    /// Allocates the generation for a new search request.
    ///
    /// Generations increase monotonically, a response is applied only if no
    /// search was started and no clear happened since its generation was
    /// allocated.
    pub fn next_search_generation(&self) -> SearchGeneration {
        let mut generation = 0;
        self.tx.send_if_modified(|state| {
            generation = state.next_search_generation();
            false
        });
        generation
    }

    /// Starts loading all tokens if none are loaded and no load is in
    /// progress, returns whether the load was started.
    ///
    /// The check and [`Action::FetchStart`] are applied atomically, so of
    /// several concurrent callers only one gets `true`.
    pub fn try_start_fetch(&self) -> bool {
        self.tx.send_if_modified(|state| {
            let all_tokens = state.all_tokens();
            if all_tokens.data().is_empty() && !all_tokens.loading() {
                state.reduce(Action::FetchStart)
            } else {
                false
            }
        })
    }

    /// Starts reloading all tokens unless a load is already in progress.
    pub fn try_start_refresh(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.all_tokens().loading() {
                false
            } else {
                state.reduce(Action::FetchStart)
            }
        })
    }
}
