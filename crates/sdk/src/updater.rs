//! Background maintenance of the token cache.
//!
//! [`Updater::run`] populates the cache on start and keeps it fresh,
//! [`Updater::run_search`] turns a stream of typed queries into remote
//! searches.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::{
    Chain,
    client::TokenSource,
    stream::{SEARCH_DEBOUNCE, debounce},
    tokens::{SearchOutcome, TokenService},
    types::ChainId,
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug)]
pub struct Updater<S> {
    service: TokenService<S>,
    graphql_chain_id: ChainId,
    refresh_interval: Option<Duration>,
    debounce: Duration,
}

impl<S: TokenSource> Updater<S> {
    pub fn new(chain: &Chain, service: TokenService<S>) -> Self {
        Self {
            service,
            graphql_chain_id: chain.chain_id(),
            refresh_interval: Some(DEFAULT_REFRESH_INTERVAL),
            debounce: SEARCH_DEBOUNCE,
        }
    }

    /// Sets period of all-tokens reloads, `None` disables them.
    pub fn with_refresh_interval(mut self, interval: Option<Duration>) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_debounce(mut self, delay: Duration) -> Self {
        self.debounce = delay;
        self
    }

    pub fn service(&self) -> &TokenService<S> { &self.service }

    pub fn refresh_interval(&self) -> Option<Duration> { self.refresh_interval }

    /// Loads all tokens unless already loaded, then reloads them every
    /// refresh interval until `cancel` is triggered.
    ///
    /// Failures are recorded in the store and logged, the next period
    /// retries.
    pub async fn run<Sl, SFut>(&self, sleep: Sl, cancel: CancellationToken)
    where
        Sl: Fn(Duration) -> SFut + Copy,
        SFut: Future<Output = ()>,
    {
        match cancel.run_until_cancelled(self.service.auto_fetch()).await {
            Some(Some(Ok(count))) => tracing::debug!(count, "tokens loaded"),
            Some(Some(Err(err))) => tracing::warn!(%err, "error loading tokens"),
            Some(None) => (),
            None => return,
        }

        let Some(interval) = self.refresh_interval else {
            return;
        };
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(interval) => {},
            }
            match cancel.run_until_cancelled(self.service.refresh()).await {
                Some(Some(Ok(count))) => tracing::debug!(count, "tokens refreshed"),
                Some(Some(Err(err))) => tracing::warn!(%err, "error refreshing tokens"),
                Some(None) => tracing::debug!("refresh skipped, load in progress"),
                None => break,
            }
        }
    }

    /// Searches the settled values of `queries` until the stream ends or
    /// `cancel` is triggered.
    ///
    /// Nothing is searched unless `chain_id` is the GraphQL-backed chain.
    /// A settled blank query clears search results. A settled query equal
    /// to the latest search is skipped unless that search failed. Searches
    /// may overlap, only the most recently started one is committed.
    pub async fn run_search<Q, Sl, SFut>(
        &self,
        queries: Q,
        chain_id: ChainId,
        sleep: Sl,
        cancel: CancellationToken,
    ) where
        Q: Stream<Item = String>,
        Sl: Fn(Duration) -> SFut + Copy,
        SFut: Future<Output = ()>,
    {
        if chain_id != self.graphql_chain_id {
            tracing::debug!(chain_id, "chain is not indexed, remote search disabled");
            return;
        }

        let searches = debounce(queries, self.debounce, sleep).for_each_concurrent(None, |query| {
            async move {
                if query.trim().is_empty() {
                    self.service.clear();
                    return;
                }
                let repeated = self.service.store().with_state(|state| {
                    let results = state.search_results();
                    results.query() == query && results.error().is_none()
                });
                if repeated {
                    tracing::debug!(%query, "search already done");
                    return;
                }
                match self.service.search(&query).await {
                    Ok(SearchOutcome::Committed(count)) => {
                        tracing::debug!(%query, count, "search committed")
                    },
                    Ok(SearchOutcome::Stale) => tracing::debug!(%query, "search superseded"),
                    Err(err) => tracing::warn!(%err, %query, "error searching tokens"),
                }
            }
        });
        cancel.run_until_cancelled(searches).await;
    }
}

#[cfg(test)]
mod tests {
    use futures::channel::mpsc;

    use super::*;
    use crate::{
        state::Store,
        testing::{MockSource, remote_token},
    };

    fn updater(source: MockSource) -> Updater<MockSource> {
        Updater::new(&Chain::base_sepolia(), TokenService::new(Store::default(), source))
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_refreshes_periodically() {
        let source = MockSource::new().with_all_tokens(vec![remote_token(1, "FOX", "Fox", "18")]);
        let updater = updater(source).with_refresh_interval(Some(Duration::from_secs(60)));
        let cancel = CancellationToken::new();

        tokio::join!(updater.run(tokio::time::sleep, cancel.clone()), async {
            tokio::time::sleep(Duration::from_secs(150)).await;
            cancel.cancel();
        });

        // Initial load, then at 60s and 120s
        assert_eq!(updater.service().source().all_tokens_calls(), 3);
        let state = updater.service().store().state();
        assert_eq!(state.all_tokens().data().len(), 1);
        assert!(!state.all_tokens().loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_refresh() {
        let updater = updater(MockSource::new()).with_refresh_interval(None);
        updater.run(tokio::time::sleep, CancellationToken::new()).await;
        assert_eq!(updater.service().source().all_tokens_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_records_failure() {
        let source = MockSource::new();
        source.set_all_tokens(Err("indexer down".to_string()));
        let updater = updater(source).with_refresh_interval(None);

        updater.run(tokio::time::sleep, CancellationToken::new()).await;
        let state = updater.service().store().state();
        assert!(state.all_tokens().error().unwrap().contains("indexer down"));
        assert!(!state.all_tokens().loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_search_settled_only() {
        let source = MockSource::new().with_search("fox", vec![remote_token(1, "FOX", "Fox", "18")]);
        let updater = updater(source);
        let (tx, rx) = mpsc::unbounded();

        for q in ["f", "fo", "fox"] {
            tx.unbounded_send(q.to_string()).unwrap();
        }
        drop(tx);
        updater.run_search(rx, 84532, tokio::time::sleep, CancellationToken::new()).await;

        assert_eq!(updater.service().source().search_calls(), vec!["fox".to_string()]);
        let state = updater.service().store().state();
        assert_eq!(state.search_results().query(), "fox");
        assert_eq!(state.search_results().data().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_search_blank_clears() {
        let source = MockSource::new().with_search("fox", vec![remote_token(1, "FOX", "Fox", "18")]);
        let updater = updater(source);
        let (tx, rx) = mpsc::unbounded();

        tx.unbounded_send("fox".to_string()).unwrap();
        let feed = async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            tx.unbounded_send("  ".to_string()).unwrap();
            drop(tx);
        };
        tokio::join!(updater.run_search(rx, 84532, tokio::time::sleep, CancellationToken::new()), feed);

        assert_eq!(updater.service().source().search_calls().len(), 1);
        let state = updater.service().store().state();
        assert_eq!(state.search_results().query(), "");
        assert!(state.search_results().data().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_search_retries_failed_query_only() {
        let source = MockSource::new().with_search_error("fox", "rate limited");
        let updater = updater(source);
        let (tx, rx) = mpsc::unbounded();

        let feed = async {
            tx.unbounded_send("fox".to_string()).unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            assert!(updater.service().store().state().search_results().error().is_some());

            // Edited back to the failed query
            updater
                .service()
                .source()
                .set_search("fox", Ok(vec![remote_token(1, "FOX", "Fox", "18")]));
            tx.unbounded_send("foxe".to_string()).unwrap();
            tx.unbounded_send("fox".to_string()).unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;

            // Edited back to the committed query
            tx.unbounded_send("foxe".to_string()).unwrap();
            tx.unbounded_send("fox".to_string()).unwrap();
            tokio::time::sleep(Duration::from_secs(1)).await;
            drop(tx);
        };
        tokio::join!(updater.run_search(rx, 84532, tokio::time::sleep, CancellationToken::new()), feed);

        assert_eq!(updater.service().source().search_calls(), vec!["fox".to_string(), "fox".to_string()]);
        let state = updater.service().store().state();
        assert_eq!(state.search_results().data().len(), 1);
        assert_eq!(state.search_results().error(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_search_other_chain() {
        let updater = updater(MockSource::new());
        let queries = futures::stream::iter(vec!["fox".to_string()]);
        updater.run_search(queries, 1, tokio::time::sleep, CancellationToken::new()).await;
        assert!(updater.service().source().calls().is_empty());
    }
}
