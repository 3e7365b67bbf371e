use crate::types::{IndexedToken, Ingested, RejectedToken};

/// Generation of a search request, see [`super::Store::next_search_generation`].
pub type SearchGeneration = u64;

/// Asynchronously loaded token collection.
///
/// `loading` and `error` are never set at the same time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Collection {
    data: Vec<IndexedToken>,
    rejected: Vec<RejectedToken>,
    loading: bool,
    error: Option<String>,
    revision: u64,
}

impl Collection {
    /// Tokens from the last successful load, in indexer order.
    pub fn data(&self) -> &[IndexedToken] { &self.data }

    /// Records of the last successful load that failed validation.
    pub fn rejected(&self) -> &[RejectedToken] { &self.rejected }

    pub fn loading(&self) -> bool { self.loading }

    /// Error of the last failed load, cleared when a new load starts.
    pub fn error(&self) -> Option<&str> { self.error.as_deref() }

    /// Incremented every time [`Self::data`] is replaced.
    pub fn revision(&self) -> u64 { self.revision }

    fn start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    fn succeed(&mut self, ingested: Ingested) {
        self.loading = false;
        self.error = None;
        self.data = ingested.tokens;
        self.rejected = ingested.rejected;
        self.revision += 1;
    }

    fn fail(&mut self, error: String) {
        self.loading = false;
        self.error = Some(error);
    }
}

/// Results of the most recent token search.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchResults {
    query: String,
    generation: SearchGeneration,
    issued: SearchGeneration,
    results: Collection,
}

impl SearchResults {
    /// Last issued search term, empty when cleared.
    pub fn query(&self) -> &str { &self.query }

    /// Generation of the latest issued search, responses of any other
    /// generation are discarded.
    pub fn generation(&self) -> SearchGeneration { self.generation }

    pub fn data(&self) -> &[IndexedToken] { self.results.data() }

    pub fn rejected(&self) -> &[RejectedToken] { self.results.rejected() }

    pub fn loading(&self) -> bool { self.results.loading() }

    pub fn error(&self) -> Option<&str> { self.results.error() }

    pub fn revision(&self) -> u64 { self.results.revision() }
}

/// State of the token cache.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokensState {
    all_tokens: Collection,
    search_results: SearchResults,
}

/// Transition of [`TokensState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    FetchStart,
    FetchSuccess { tokens: Ingested },
    FetchError { error: String },
    SearchStart { query: String, generation: SearchGeneration },
    SearchSuccess { query: String, generation: SearchGeneration, tokens: Ingested },
    SearchError { query: String, generation: SearchGeneration, error: String },
    ClearSearch,
}

impl TokensState {
    pub fn all_tokens(&self) -> &Collection { &self.all_tokens }

    pub fn search_results(&self) -> &SearchResults { &self.search_results }

    /// Applies `action`, returns `false` if the state did not change.
    ///
    /// Search responses carrying a generation other than the one of the
    /// latest [`Action::SearchStart`] are stale and get discarded.
    pub fn reduce(&mut self, action: Action) -> bool {
        match action {
            Action::FetchStart => {
                self.all_tokens.start();
                true
            },
            Action::FetchSuccess { tokens } => {
                self.all_tokens.succeed(tokens);
                true
            },
            Action::FetchError { error } => {
                self.all_tokens.fail(error);
                true
            },
            Action::SearchStart { query, generation } => {
                if generation < self.search_results.generation {
                    // Started after a newer search or a clear
                    return false;
                }
                self.search_results.query = query;
                self.search_results.generation = generation;
                self.search_results.results.start();
                true
            },
            Action::SearchSuccess { query, generation, tokens } => {
                if !self.is_current_search(generation, &query) {
                    return false;
                }
                self.search_results.query = query;
                self.search_results.results.succeed(tokens);
                true
            },
            Action::SearchError { query, generation, error } => {
                if !self.is_current_search(generation, &query) {
                    return false;
                }
                self.search_results.query = query;
                self.search_results.results.fail(error);
                true
            },
            Action::ClearSearch => {
                let results = &mut self.search_results.results;
                results.data.clear();
                results.rejected.clear();
                results.loading = false;
                results.error = None;
                results.revision += 1;
                self.search_results.query.clear();
                // Invalidate any search in flight
                self.search_results.generation = self.next_search_generation();
                true
            },
        }
    }

    /// Allocates a search generation newer than any issued or applied so far.
    pub(crate) fn next_search_generation(&mut self) -> SearchGeneration {
        let search = &mut self.search_results;
        search.issued = search.issued.max(search.generation) + 1;
        search.issued
    }

    fn is_current_search(&self, generation: SearchGeneration, query: &str) -> bool {
        if generation != self.search_results.generation {
            tracing::debug!(
                query,
                generation,
                current = self.search_results.generation,
                "discarding stale search response"
            );
            return false;
        }
        true
    }
}

#[cfg(feature = "display")]
impl std::fmt::Display for TokensState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use colored::Colorize;

        let status = |c: &Collection| {
            if c.loading() {
                "loading".yellow().to_string()
            } else if let Some(err) = c.error() {
                err.red().to_string()
            } else {
                "ok".green().to_string()
            }
        };

        writeln!(
            f,
            "{} {} tokens ({} rejected) | {}",
            "All tokens:".blue(),
            self.all_tokens.data().len(),
            self.all_tokens.rejected().len(),
            status(&self.all_tokens),
        )?;
        write!(
            f,
            "{} {:?} -> {} tokens ({} rejected) | {}",
            "Search:".blue(),
            self.search_results.query(),
            self.search_results.data().len(),
            self.search_results.rejected().len(),
            status(&self.search_results.results),
        )
    }
}
