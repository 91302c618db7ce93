//! Authentication endpoints

use async_trait::async_trait;
use bizdesk_core::dto::auth::{LoginRequest, RefreshRequest, RefreshResponse, TokenPair};
use reqwest::StatusCode;
use std::sync::Arc;

use crate::BooksClient;
use crate::error::{ClientError, Result};

/// Something that can extend the current session
///
/// The session watcher only needs this one call, so tests can drive it
/// without an HTTP server.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Obtain a fresh access token
    async fn refresh_session(&self) -> Result<()>;
}

impl BooksClient {
    // =============================================================================
    // Token Issuance
    // =============================================================================

    /// Sign in and keep the issued tokens
    ///
    /// # Arguments
    /// * `username` - Account user name
    /// * `password` - Account password
    ///
    /// # Returns
    /// The issued token pair
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair> {
        let url = self.url("/api/token/");
        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized(
                "invalid username or password".to_string(),
            ));
        }

        let tokens: TokenPair = self.handle_response(response).await?;
        self.set_tokens(tokens.clone()).await;
        tracing::info!("Signed in as {}", username);
        Ok(tokens)
    }

    /// Exchange the refresh token for a new access token
    ///
    /// Any failure ends the session, including server errors and network
    /// failures: the stored tokens are dropped and
    /// [`ClientError::SessionInvalid`] is returned.
    ///
    /// # Returns
    /// The updated token pair
    pub async fn refresh(&self) -> Result<TokenPair> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Forget the tokens held by this client
    pub async fn logout(&self) {
        self.clear_tokens().await;
        tracing::info!("Signed out");
    }

    /// Refresh unless another caller already replaced `stale`
    ///
    /// Concurrent requests that all hit a 401 with the same token end up
    /// doing a single refresh; the others reuse its result.
    pub(crate) async fn refresh_after(&self, stale: &str) -> Result<TokenPair> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.tokens().await {
            if current.access != stale {
                tracing::debug!("Token already refreshed by another request");
                return Ok(current);
            }
        }

        self.refresh_locked().await
    }

    async fn refresh_locked(&self) -> Result<TokenPair> {
        let previous = self
            .tokens()
            .await
            .ok_or_else(|| ClientError::Unauthorized("not signed in".to_string()))?;

        match self.exchange(&previous).await {
            Ok(tokens) => {
                self.set_tokens(tokens.clone()).await;
                tracing::debug!("Access token refreshed");
                Ok(tokens)
            }
            Err(e) => Err(self.invalidate(format!("token refresh failed: {e}")).await),
        }
    }

    async fn exchange(&self, previous: &TokenPair) -> Result<TokenPair> {
        let url = self.url("/api/token/refresh/");
        let response = self
            .client
            .post(&url)
            .json(&RefreshRequest {
                refresh: previous.refresh.clone(),
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            return Err(ClientError::Unauthorized(
                "refresh token rejected".to_string(),
            ));
        }

        let refreshed: RefreshResponse = self.handle_response(response).await?;
        Ok(refreshed.into_pair(previous))
    }
}

#[async_trait]
impl TokenRefresher for BooksClient {
    async fn refresh_session(&self) -> Result<()> {
        self.refresh().await.map(|_| ())
    }
}

#[async_trait]
impl<T: TokenRefresher + ?Sized> TokenRefresher for Arc<T> {
    async fn refresh_session(&self) -> Result<()> {
        (**self).refresh_session().await
    }
}
