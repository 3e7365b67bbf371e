use anyhow::Context;
use colored::Colorize;
use tabled::{Table, settings::Style};
use token_index_sdk::{
    client::TokenSource,
    tokens::{self, SearchOutcome, TokenService},
    types::{ChainId, RejectedToken},
};

pub(crate) async fn render<S: TokenSource>(
    service: &TokenService<S>,
    name: &str,
    chain_id: ChainId,
) -> anyhow::Result<()> {
    let outcome = service
        .search(name)
        .await
        .with_context(|| format!("searching tokens named {:?}", name))?;
    if outcome == SearchOutcome::Stale {
        return Err(anyhow::anyhow!("search for {:?} was superseded", name));
    }

    let state = service.store().state();
    let results = tokens::search_results(&state, chain_id);
    println!("{}", format!("{} token(s) matching {:?}", results.len(), name).bold().purple());
    if !results.is_empty() {
        let mut table = Table::new(&results);
        table.with(Style::sharp());
        println!("{}", table);
    }

    render_rejected(state.search_results().rejected());
    Ok(())
}

pub(crate) fn render_rejected(rejected: &[RejectedToken]) {
    for token in rejected {
        eprintln!("{} {}: {}", "Skipped".yellow(), token.id, token.error);
    }
}
