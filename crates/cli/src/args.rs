use std::path::PathBuf;

use clap::{Parser, Subcommand};
use token_index_sdk::types::ChainId;

pub(crate) const DEFAULT_CHAIN_ID: ChainId = 84532;

#[derive(Parser, Debug)]
#[command(name = "token-index-cli", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// GraphQL endpoint of the token indexer [default: Base Sepolia
    /// launchpad subgraph]
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Bearer key sent to the indexer [default: key of the default endpoint,
    /// none for a custom one]
    #[arg(long, global = true, env = "TOKEN_INDEX_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chain the token picker is on; remote search only runs on the indexed
    /// chain
    #[arg(long, global = true, default_value_t = DEFAULT_CHAIN_ID)]
    pub chain_id: ChainId,

    /// Request timeout in seconds [default: none]
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch the first page of all indexed tokens
    All,
    /// Search indexed tokens by name
    Search {
        /// Part of the token name, case-insensitive
        name: String,
    },
    /// Resolve a token picker query to its candidates and the token Enter
    /// would select
    Select {
        /// Search text or token address
        query: String,

        /// Token list JSON file to use as the static list [default: wrapped
        /// native token only]
        #[arg(long)]
        static_list: Option<PathBuf>,

        /// Reverse the candidate order
        #[arg(long, default_value_t = false)]
        inverted: bool,
    },
    /// Read queries from stdin, one per line, and print candidates after
    /// each search until EOF (or Ctrl+C)
    Watch {
        /// Token list JSON file to use as the static list [default: wrapped
        /// native token only]
        #[arg(long)]
        static_list: Option<PathBuf>,
    },
}
