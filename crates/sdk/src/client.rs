//! GraphQL client of the token indexer.
//!
//! Two operations are supported, both capped at a fixed page size with no
//! continuation:
//!
//! * [`TOKEN_SEARCH_QUERY`] - up to [`SEARCH_PAGE_SIZE`] tokens whose name
//!   contains the search term, case-insensitively.
//! * [`ALL_TOKENS_QUERY`] - up to [`ALL_TOKENS_PAGE_SIZE`] tokens.
//!
//! Failures are reported through [`IndexerError`]. Callers preferring to
//! treat an unavailable indexer as "no results" can use
//! [`TokenSourceExt`].

use std::time::Duration;

use reqwest::{
    Client,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{Chain, error::IndexerError, types::RemoteToken};

pub const SEARCH_PAGE_SIZE: usize = 10;
pub const ALL_TOKENS_PAGE_SIZE: usize = 100;

pub const TOKEN_SEARCH_QUERY: &str = r#"
  query TokenSearch($tokenName: String!) {
    tokens(first: 10, where: {name_contains_nocase: $tokenName}) {
      id
      name
      symbol
      decimals
      curve {
        id
        priceInCapital
        capital {
          id
          symbol
          decimals
        }
        tokenSupply
      }
      totalSupply
      creation {
        blockTimestamp
        creator
        blockNumber
      }
    }
  }
"#;

pub const ALL_TOKENS_QUERY: &str = r#"
  query AllTokens {
    tokens(first: 100) {
      id
      name
      symbol
      decimals
      curve {
        id
        priceInCapital
        capital {
          id
          symbol
          decimals
        }
        tokenSupply
      }
      totalSupply
      creation {
        blockTimestamp
        creator
        blockNumber
      }
    }
  }
"#;

/// Source of indexed token records.
///
/// [`GraphClient`] is the production implementation, see
/// [`crate::testing::MockSource`] for tests.
pub trait TokenSource: Send + Sync {
    /// Tokens whose name contains `name`, case-insensitively.
    fn search_tokens(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<RemoteToken>, IndexerError>> + Send;

    /// First page of all indexed tokens.
    fn all_tokens(&self) -> impl Future<Output = Result<Vec<RemoteToken>, IndexerError>> + Send;
}

/// Lenient variants of [`TokenSource`] methods that log failures and
/// degrade to an empty result.
///
/// An empty result is then indistinguishable from "no matches", use the
/// plain [`TokenSource`] methods when the difference matters.
pub trait TokenSourceExt: TokenSource {
    fn search_tokens_or_empty(&self, name: &str) -> impl Future<Output = Vec<RemoteToken>> + Send {
        async move {
            self.search_tokens(name).await.unwrap_or_else(|err| {
                tracing::error!(%err, name, "error searching tokens");
                Vec::new()
            })
        }
    }

    fn all_tokens_or_empty(&self) -> impl Future<Output = Vec<RemoteToken>> + Send {
        async move {
            self.all_tokens().await.unwrap_or_else(|err| {
                tracing::error!(%err, "error fetching all tokens");
                Vec::new()
            })
        }
    }
}

impl<T: TokenSource + ?Sized> TokenSourceExt for T {}

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: Value,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<TokensData>,
    errors: Option<Vec<GraphQlErrorMessage>>,
}

#[derive(Debug, Deserialize)]
struct TokensData {
    tokens: Option<Vec<RemoteToken>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorMessage {
    message: String,
}

/// HTTP client of the indexer GraphQL endpoint.
#[derive(Clone, Debug)]
pub struct GraphClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    timeout: Option<Duration>,
}

impl GraphClient {
    pub fn new(chain: &Chain) -> Self {
        Self {
            client: Client::new(),
            endpoint: chain.graphql_endpoint().to_string(),
            api_key: chain.api_key().map(str::to_string),
            timeout: None,
        }
    }

    /// Reuses an existing [`reqwest::Client`] connection pool.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Limits the duration of each request. No limit by default, a hung
    /// request then keeps the corresponding state loading.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn endpoint(&self) -> &str { &self.endpoint }

    async fn request(
        &self,
        operation: &str,
        query: &str,
        variables: Value,
    ) -> Result<Vec<RemoteToken>, IndexerError> {
        tracing::debug!(endpoint = %self.endpoint, operation, %variables, "GraphQL request");

        let mut request = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "*/*")
            .json(&GraphQlRequest { query, variables });
        if let Some(api_key) = &self.api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {api_key}"));
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        let result = decode_response(status.as_u16(), &body);
        if let Err(err) = &result {
            tracing::error!(%err, operation, "GraphQL request error");
        }
        result
    }
}

impl TokenSource for GraphClient {
    async fn search_tokens(&self, name: &str) -> Result<Vec<RemoteToken>, IndexerError> {
        self.request("TokenSearch", TOKEN_SEARCH_QUERY, json!({ "tokenName": name }))
            .await
    }

    async fn all_tokens(&self) -> Result<Vec<RemoteToken>, IndexerError> {
        self.request("AllTokens", ALL_TOKENS_QUERY, json!({})).await
    }
}

/// Interprets a raw indexer response.
///
/// Errors reported in the GraphQL envelope take precedence over any partial
/// `data`. A `null` token list is treated as empty.
pub fn decode_response(status: u16, body: &str) -> Result<Vec<RemoteToken>, IndexerError> {
    if !(200..300).contains(&status) {
        return Err(IndexerError::Status { status, body: body.trim().to_string() });
    }

    let response: GraphQlResponse = serde_json::from_str(body)?;
    if let Some(errors) = response.errors
        && !errors.is_empty()
    {
        return Err(IndexerError::GraphQl(
            errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join(", "),
        ));
    }

    let data = response.data.ok_or(IndexerError::MissingData)?;
    Ok(data.tokens.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOX: &str = r#"{
        "id": "0x00000000000000000000000000000000000000f0",
        "name": "Fox Token",
        "symbol": "FOX",
        "decimals": "18",
        "totalSupply": "1000",
        "curve": null,
        "creation": null,
        "__typename": "Token"
    }"#;

    #[test]
    fn test_decode_tokens() {
        let body = format!(r#"{{"data": {{"tokens": [{FOX}]}}}}"#);
        let tokens = decode_response(200, &body).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "FOX");
        assert_eq!(tokens[0].decimals, "18");
    }

    #[test]
    fn test_decode_null_tokens() {
        let tokens = decode_response(200, r#"{"data": {"tokens": null}}"#).unwrap();
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_decode_status_error() {
        let err = decode_response(401, "auth error: missing authorization header\n").unwrap_err();
        assert!(matches!(err, IndexerError::Status { status: 401, .. }));
        assert_eq!(
            err.to_string(),
            "GraphQL request failed: 401 auth error: missing authorization header"
        );
    }

    #[test]
    fn test_decode_graphql_errors() {
        let body = r#"{
            "data": null,
            "errors": [
                {"message": "Type `Query` has no field `tokenz`"},
                {"message": "indexing error"}
            ]
        }"#;
        let err = decode_response(200, body).unwrap_err();
        assert_eq!(
            err.to_string(),
            "GraphQL errors: Type `Query` has no field `tokenz`, indexing error"
        );
    }

    #[test]
    fn test_decode_missing_data() {
        assert!(matches!(decode_response(200, "{}"), Err(IndexerError::MissingData)));
        assert!(matches!(decode_response(200, "<html>"), Err(IndexerError::Decode(_))));
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(GraphQlRequest {
            query: TOKEN_SEARCH_QUERY,
            variables: json!({ "tokenName": "fox" }),
        })
        .unwrap();
        assert_eq!(body["variables"]["tokenName"], "fox");
        assert!(body["query"].as_str().unwrap().contains("query TokenSearch($tokenName: String!)"));
        assert!(TOKEN_SEARCH_QUERY.contains(&format!("first: {SEARCH_PAGE_SIZE}")));
        assert!(ALL_TOKENS_QUERY.contains(&format!("first: {ALL_TOKENS_PAGE_SIZE}")));
    }

    /// Serves one request with `body`, returns the endpoint and the raw
    /// request received.
    async fn serve_once(body: String) -> (String, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .filter_map(|line| line.split_once(':'))
                        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8(request).unwrap()
        });
        (format!("http://{addr}/subgraph"), server)
    }

    fn local_chain(endpoint: String, api_key: Option<&str>) -> Chain {
        Chain::custom(
            84532,
            endpoint,
            api_key.map(str::to_string),
            crate::types::NativeCurrency::ether(),
            alloy::primitives::Address::ZERO,
        )
    }

    #[tokio::test]
    async fn test_search_request_sent() {
        let (endpoint, server) = serve_once(format!(r#"{{"data": {{"tokens": [{FOX}]}}}}"#)).await;
        let client = GraphClient::new(&local_chain(endpoint, Some("secret")))
            .with_timeout(Duration::from_secs(5));

        let tokens = client.search_tokens("fox").await.unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "FOX");

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        let head = head.to_lowercase();
        assert!(head.starts_with("post /subgraph http/1.1"));
        assert!(head.contains("authorization: bearer secret"));
        assert!(head.contains("accept: */*"));
        assert!(head.contains("content-type: application/json"));

        let body: Value = serde_json::from_str(body).unwrap();
        assert!(body["query"].as_str().unwrap().contains("query TokenSearch"));
        assert_eq!(body["variables"]["tokenName"], "fox");
    }

    #[tokio::test]
    async fn test_all_tokens_request_without_key() {
        let (endpoint, server) = serve_once(r#"{"data": {"tokens": []}}"#.to_string()).await;
        let client = GraphClient::new(&local_chain(endpoint, None));

        assert!(client.all_tokens().await.unwrap().is_empty());

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        assert!(!head.to_lowercase().contains("authorization"));

        let body: Value = serde_json::from_str(body).unwrap();
        assert!(body["query"].as_str().unwrap().contains("query AllTokens"));
        assert_eq!(body["variables"], json!({}));
    }

    #[cfg(feature = "testing")]
    #[tokio::test]
    async fn test_lenient_helpers_degrade_to_empty() {
        use crate::testing::{Call, MockSource};

        let source = MockSource::new().with_search_error("fox", "indexer down");
        source.set_all_tokens(Err("indexer down".to_string()));

        assert!(source.search_tokens_or_empty("fox").await.is_empty());
        assert!(source.all_tokens_or_empty().await.is_empty());
        assert_eq!(source.calls(), vec![Call::Search("fox".to_string()), Call::AllTokens]);

        // Failures stay visible through the plain methods
        assert!(matches!(source.search_tokens("fox").await, Err(IndexerError::GraphQl(_))));
    }
}
