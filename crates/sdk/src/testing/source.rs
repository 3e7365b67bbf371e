use std::{
    collections::HashMap,
    sync::{Mutex, RwLock},
    time::Duration,
};

use crate::{client::TokenSource, error::IndexerError, types::RemoteToken};

/// Request received by [`MockSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    AllTokens,
    Search(String),
}

type Response = Result<Vec<RemoteToken>, String>;

/// [`TokenSource`] answering from scripted responses.
///
/// Unscripted searches and an unscripted all-tokens query return no tokens.
/// Scripted errors are reported as [`IndexerError::GraphQl`].
/// Responses are looked up after the simulated latency elapses, so a
/// response replaced while a call is in flight is the one returned.
#[derive(Debug, Default)]
pub struct MockSource {
    all_tokens: RwLock<Option<Response>>,
    searches: RwLock<HashMap<String, Response>>,
    latency: Duration,
    search_latency: RwLock<HashMap<String, Duration>>,
    calls: Mutex<Vec<Call>>,
}

impl MockSource {
    pub fn new() -> Self { Self::default() }

    pub fn with_all_tokens(self, tokens: Vec<RemoteToken>) -> Self {
        self.set_all_tokens(Ok(tokens));
        self
    }

    pub fn with_search(self, query: &str, tokens: Vec<RemoteToken>) -> Self {
        self.set_search(query, Ok(tokens));
        self
    }

    pub fn with_search_error(self, query: &str, error: &str) -> Self {
        self.set_search(query, Err(error.to_string()));
        self
    }

    /// Delay of every call without a more specific one.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Delay of searches for `query`.
    pub fn with_search_latency(self, query: &str, latency: Duration) -> Self {
        self.search_latency.write().unwrap().insert(query.to_string(), latency);
        self
    }

    pub fn set_all_tokens(&self, response: Result<Vec<RemoteToken>, String>) {
        *self.all_tokens.write().unwrap() = Some(response);
    }

    pub fn set_search(&self, query: &str, response: Result<Vec<RemoteToken>, String>) {
        self.searches.write().unwrap().insert(query.to_string(), response);
    }

    /// All calls received so far, in arrival order.
    pub fn calls(&self) -> Vec<Call> { self.calls.lock().unwrap().clone() }

    /// Queries of the searches received so far, in arrival order.
    pub fn search_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Search(query) => Some(query.clone()),
                Call::AllTokens => None,
            })
            .collect()
    }

    pub fn all_tokens_calls(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == Call::AllTokens).count()
    }

    async fn simulate_latency(&self, latency: Duration) {
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

impl TokenSource for MockSource {
    async fn search_tokens(&self, name: &str) -> Result<Vec<RemoteToken>, IndexerError> {
        self.calls.lock().unwrap().push(Call::Search(name.to_string()));
        let latency = self
            .search_latency
            .read()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(self.latency);
        self.simulate_latency(latency).await;

        let response = self.searches.read().unwrap().get(name).cloned();
        response.unwrap_or_else(|| Ok(Vec::new())).map_err(IndexerError::GraphQl)
    }

    async fn all_tokens(&self) -> Result<Vec<RemoteToken>, IndexerError> {
        self.calls.lock().unwrap().push(Call::AllTokens);
        self.simulate_latency(self.latency).await;

        let response = self.all_tokens.read().unwrap().clone();
        response.unwrap_or_else(|| Ok(Vec::new())).map_err(IndexerError::GraphQl)
    }
}
