use colored::Colorize;
use futures::stream;
use token_index_sdk::{
    Chain,
    client::TokenSource,
    search::{CurrencySearch, StaticTokenList},
    state::TokensState,
    tokens::{Projector, TokenService},
    types::ChainId,
    updater::Updater,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

pub(crate) async fn render<S: TokenSource>(
    chain: &Chain,
    service: TokenService<S>,
    static_list: &StaticTokenList,
    chain_id: ChainId,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    if !chain.is_graphql_backed(chain_id) {
        return Err(anyhow::anyhow!(
            "remote search is only available on chain {}, see `--chain-id`",
            chain.chain_id()
        ));
    }

    let updater = Updater::new(chain, service);
    let mut rx = updater.service().store().subscribe();
    let session = cancellation_token.child_token();

    let lines = BufReader::new(tokio::io::stdin()).lines();
    let queries = stream::unfold(lines, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(err) => {
                tracing::error!(%err, "error reading stdin");
                None
            },
        }
    });

    let search = async {
        updater.run_search(queries, chain_id, tokio::time::sleep, session.clone()).await;
        // Input exhausted
        session.cancel();
    };

    let print = async {
        let mut printer = Printer::new(chain, static_list, chain_id);
        loop {
            let stop = tokio::select! {
                _ = session.cancelled() => true,
                changed = rx.changed() => changed.is_err(),
            };
            printer.render(&rx.borrow_and_update());
            if stop {
                break;
            }
        }
    };

    tokio::join!(updater.run(tokio::time::sleep, session.clone()), search, print);
    Ok(())
}

struct Printer<'a> {
    chain: &'a Chain,
    static_list: &'a StaticTokenList,
    search: CurrencySearch,
    projector: Projector,
    revision: u64,
    error: Option<String>,
}

impl<'a> Printer<'a> {
    fn new(chain: &'a Chain, static_list: &'a StaticTokenList, chain_id: ChainId) -> Self {
        Self {
            chain,
            static_list,
            search: CurrencySearch::new(chain_id, chain.chain_id()),
            projector: Projector::new(),
            revision: 0,
            error: None,
        }
    }

    fn render(&mut self, state: &TokensState) {
        let results = state.search_results();
        if let Some(err) = results.error()
            && self.error.as_deref() != Some(err)
        {
            eprintln!("{} {}", "Search failed:".red().bold(), err);
        }
        self.error = results.error().map(str::to_string);

        if results.revision() == self.revision || results.loading() {
            return;
        }
        self.revision = results.revision();

        self.search.set_query(results.query());
        let chain_id = self.search.chain_id();
        let graphql_results = self.projector.search_results(state, chain_id);
        let address_map = self.projector.address_map(state, chain_id);
        let candidates = self.search.filtered_sorted_tokens(
            self.static_list,
            &graphql_results,
            (self.static_list, &*address_map),
        );
        crate::select::render_candidates(&self.search, self.chain, &candidates);
    }
}
