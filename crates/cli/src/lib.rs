mod all;
pub mod args;
mod search;
mod select;
mod watch;

use std::{path::Path, time::Duration};

use anyhow::Context;
use args::Cli;
use token_index_sdk::{
    Chain,
    client::GraphClient,
    search::StaticTokenList,
    state::Store,
    tokens::TokenService,
    types::{ChainId, Token},
};
use tokio_util::sync::CancellationToken;

use crate::args::Commands;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let chain = chain(&cli);
    tracing::debug!(endpoint = chain.graphql_endpoint(), chain_id = cli.chain_id, "using indexer");

    let mut client = GraphClient::new(&chain);
    if let Some(secs) = cli.timeout_secs {
        client = client.with_timeout(Duration::from_secs(secs));
    }
    let service = TokenService::new(Store::default(), client);

    let cancellation_signal = CancellationToken::new();
    let cancellation_token = cancellation_signal.child_token();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to install CTRL+C signal handler");
            return;
        }
        cancellation_signal.cancel();
    });

    match &cli.command {
        Commands::All => all::render(&service).await?,
        Commands::Search { name } => search::render(&service, name, cli.chain_id).await?,
        Commands::Select { query, static_list, inverted } => {
            let static_list = load_static_list(&chain, cli.chain_id, static_list.as_deref())?;
            select::render(&chain, &service, &static_list, query, *inverted, cli.chain_id).await?
        },
        Commands::Watch { static_list } => {
            let static_list = load_static_list(&chain, cli.chain_id, static_list.as_deref())?;
            watch::render(&chain, service, &static_list, cli.chain_id, cancellation_token).await?
        },
    }

    Ok(())
}

fn chain(cli: &Cli) -> Chain {
    let preset = Chain::base_sepolia();
    match &cli.endpoint {
        Some(endpoint) => Chain::custom(
            preset.chain_id(),
            endpoint.clone(),
            cli.api_key.clone(),
            preset.native_currency().clone(),
            preset.wrapped_native(),
        ),
        None if cli.api_key.is_some() => Chain::custom(
            preset.chain_id(),
            preset.graphql_endpoint(),
            cli.api_key.clone(),
            preset.native_currency().clone(),
            preset.wrapped_native(),
        ),
        None => preset,
    }
}

fn load_static_list(
    chain: &Chain,
    chain_id: ChainId,
    path: Option<&Path>,
) -> anyhow::Result<StaticTokenList> {
    match path {
        Some(path) => StaticTokenList::from_file(chain_id, path)
            .with_context(|| format!("loading token list {}", path.display())),
        None if chain.is_graphql_backed(chain_id) => {
            let native = chain.native_currency();
            Ok(StaticTokenList::new(
                chain_id,
                [Token::new(
                    chain_id,
                    chain.wrapped_native(),
                    native.decimals,
                    format!("W{}", native.symbol),
                    format!("Wrapped {}", native.name),
                )],
            ))
        },
        None => Ok(StaticTokenList::new(chain_id, Vec::<Token>::new())),
    }
}
