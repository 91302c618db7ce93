//! Bizdesk HTTP Client
//!
//! A type-safe HTTP client for the Bizdesk accounting API.
//!
//! Every authenticated call carries the current access token as a bearer
//! header. When the API answers 401 the client refreshes the token once and
//! retries; if that fails too, the stored tokens are dropped and the call
//! returns [`ClientError::SessionInvalid`].
//!
//! # Example
//!
//! ```no_run
//! use bizdesk_client::BooksClient;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = BooksClient::new("http://localhost:8000");
//!     client.login("sam", "secret").await?;
//!
//!     for account in client.list_accounts().await? {
//!         println!("{} {}", account.id, account.name);
//!     }
//!     Ok(())
//! }
//! ```

mod accounts;
mod auth;
mod banking;
mod bills;
pub mod error;
mod items;
mod pagination;
pub mod session;
mod vendors;

// Re-export commonly used types
pub use auth::TokenRefresher;
pub use bizdesk_core::dto::auth::TokenPair;
pub use error::{ClientError, Result};
pub use session::{SessionCommand, SessionHandle, SessionWatcher};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// HTTP client for the Bizdesk API
///
/// Cloning is cheap; clones share the same token state, so a refresh done
/// through one clone is seen by all of them.
#[derive(Debug, Clone)]
pub struct BooksClient {
    /// Base URL of the API (e.g., "http://localhost:8000")
    base_url: String,
    /// HTTP client instance
    client: Client,
    tokens: Arc<RwLock<Option<TokenPair>>>,
    /// Serializes token refreshes
    refresh_lock: Arc<Mutex<()>>,
}

impl BooksClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API (e.g., "http://localhost:8000")
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the API
    /// * `client` - A configured reqwest Client
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            tokens: Arc::new(RwLock::new(None)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Start from tokens saved by an earlier session
    pub fn with_tokens(self, tokens: TokenPair) -> Self {
        Self {
            tokens: Arc::new(RwLock::new(Some(tokens))),
            ..self
        }
    }

    /// Get the base URL of the API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current token pair, if signed in
    pub async fn tokens(&self) -> Option<TokenPair> {
        self.tokens.read().await.clone()
    }

    pub async fn set_tokens(&self, tokens: TokenPair) {
        *self.tokens.write().await = Some(tokens);
    }

    pub async fn clear_tokens(&self) {
        *self.tokens.write().await = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // =============================================================================
    // Authorized Requests
    // =============================================================================

    /// Send a request with the current access token
    ///
    /// `build` is called again for the retry after a refresh, since a
    /// request builder cannot be reused once sent.
    async fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let access = self
            .tokens()
            .await
            .map(|t| t.access)
            .ok_or_else(|| ClientError::Unauthorized("not signed in".to_string()))?;

        let response = build(&self.client).bearer_auth(&access).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("Access token rejected, refreshing");
        let fresh = self.refresh_after(&access).await?;

        let retry = build(&self.client).bearer_auth(&fresh.access).send().await?;
        if retry.status() == StatusCode::UNAUTHORIZED {
            return Err(self
                .invalidate("request still unauthorized after token refresh")
                .await);
        }
        Ok(retry)
    }

    async fn invalidate(&self, reason: impl Into<String>) -> ClientError {
        let reason = reason.into();
        tracing::warn!("Session invalidated: {}", reason);
        self.clear_tokens().await;
        ClientError::SessionInvalid(reason)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// This method checks the status code and returns an appropriate error if
    /// the request failed, or deserializes the response body if successful.
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> TokenPair {
        TokenPair {
            access: "a1".to_string(),
            refresh: "r1".to_string(),
        }
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = BooksClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
        assert_eq!(client.url("/api/items/"), "http://localhost:8000/api/items/");
    }

    #[tokio::test]
    async fn test_token_state_is_shared_between_clones() {
        let client = BooksClient::new("http://localhost:8000").with_tokens(pair());
        let clone = client.clone();

        clone.clear_tokens().await;
        assert_eq!(client.tokens().await, None);

        client.set_tokens(pair()).await;
        assert_eq!(clone.tokens().await, Some(pair()));
    }

    #[tokio::test]
    async fn test_unauthenticated_call_fails_without_request() {
        // Nothing listens on this port; the call must fail before connecting.
        let client = BooksClient::new("http://127.0.0.1:9");
        let err = client.list_vendors().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized(_)));
    }
}
