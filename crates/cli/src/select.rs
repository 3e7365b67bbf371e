use anyhow::Context;
use colored::Colorize;
use tabled::{Table, settings::Style};
use token_index_sdk::{
    Chain,
    client::TokenSource,
    search::{CurrencySearch, StaticTokenList, TokenComparator},
    tokens::{Projector, TokenService},
    types::{ChainId, Currency, Token},
};

pub(crate) async fn render<S: TokenSource>(
    chain: &Chain,
    service: &TokenService<S>,
    static_list: &StaticTokenList,
    query: &str,
    inverted: bool,
    chain_id: ChainId,
) -> anyhow::Result<()> {
    let mut search = CurrencySearch::new(chain_id, chain.chain_id())
        .with_comparator(TokenComparator::new(inverted));
    search.set_query(query);

    // Address lookups also consult indexed tokens
    if search.is_address_search() && search.is_graphql_chain() {
        service.auto_fetch().await.transpose().context("fetching all tokens")?;
    }
    let settled = search.query();
    if search.uses_graphql(&settled) {
        service
            .search(&settled)
            .await
            .with_context(|| format!("searching tokens named {:?}", settled))?;
    }

    let state = service.store().state();
    let mut projector = Projector::new();
    let graphql_results = projector.search_results(&state, chain_id);
    let address_map = projector.address_map(&state, chain_id);
    let candidates =
        search.filtered_sorted_tokens(static_list, &graphql_results, (static_list, &*address_map));

    render_candidates(&search, chain, &candidates);
    match search.select_on_enter(&candidates, chain.native_currency()) {
        Some(currency) => println!("{} {}", "Enter selects".bold(), describe(&currency)),
        None => println!("{}", "Enter selects nothing".dimmed()),
    }
    Ok(())
}

pub(crate) fn render_candidates(search: &CurrencySearch, chain: &Chain, candidates: &[Token]) {
    println!(
        "{}",
        format!("{} candidate(s) for {:?}", candidates.len(), search.query()).bold().purple()
    );
    if search.show_native() {
        let native = chain.native_currency();
        println!("  {} {} (native)", native.symbol.bold(), native.name);
    }
    if !candidates.is_empty() {
        let mut table = Table::new(candidates);
        table.with(Style::sharp());
        println!("{}", table);
    }
}

fn describe(currency: &Currency) -> String {
    match currency {
        Currency::Native(native) => format!("{} (native)", native.symbol),
        Currency::Token(token) => format!("{} at {}", token.symbol(), token.address()),
    }
}
