use thiserror::Error;

use crate::types::TokenParseError;

/// Error talking to the token indexer or interpreting its data.
#[derive(Debug, Error)]
pub enum IndexerError {
    /// Request could not be sent or the response could not be read.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Indexer answered with a non-success HTTP status.
    #[error("GraphQL request failed: {status} {body}")]
    Status { status: u16, body: String },

    /// Indexer reported errors in the GraphQL envelope.
    #[error("GraphQL errors: {0}")]
    GraphQl(String),

    /// Envelope carried neither `data` nor `errors`.
    #[error("GraphQL response has no data")]
    MissingData,

    /// Response body is not a valid GraphQL envelope.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Token record failed validation.
    #[error(transparent)]
    InvalidToken(#[from] TokenParseError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
