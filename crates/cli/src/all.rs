use anyhow::Context;
use colored::Colorize;
use tabled::{Table, settings::Style};
use token_index_sdk::{client::TokenSource, tokens::TokenService};

pub(crate) async fn render<S: TokenSource>(service: &TokenService<S>) -> anyhow::Result<()> {
    let count = service.fetch_all().await.context("fetching all tokens")?;
    let state = service.store().state();

    println!("{}", format!("{} indexed token(s)", count).bold().purple());
    let mut table = Table::new(state.all_tokens().data());
    table.with(Style::sharp());
    println!("{}", table);

    crate::search::render_rejected(state.all_tokens().rejected());
    Ok(())
}
