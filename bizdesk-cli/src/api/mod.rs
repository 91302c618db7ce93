//! API session bridge
//!
//! Builds a [`BooksClient`] from the tokens saved in the local store and
//! writes the client's token state back after each command, so a refresh
//! (or an invalidated session) outlives the process.

use anyhow::{Result, bail};
use bizdesk_client::{BooksClient, TokenPair};
use bizdesk_core::store::{KeyValueStore, clear_session, keys, read_json, write_json};

use crate::config::Config;

/// Client for `config.api_url`, signed in with the stored tokens if any
pub fn connect(config: &Config, store: &impl KeyValueStore) -> BooksClient {
    let client = BooksClient::new(&config.api_url);
    match stored_tokens(store) {
        Some(tokens) => client.with_tokens(tokens),
        None => client,
    }
}

/// Like [`connect`], but fails when nobody is signed in
pub fn connect_signed_in(config: &Config, store: &impl KeyValueStore) -> Result<BooksClient> {
    if stored_tokens(store).is_none() {
        bail!("Not signed in. Run `bizdesk auth login` first.");
    }
    Ok(connect(config, store))
}

pub fn stored_tokens(store: &impl KeyValueStore) -> Option<TokenPair> {
    read_json(store, keys::AUTH_TOKENS, None)
}

/// Persists the client's current tokens, or clears the session when the
/// client no longer holds any
pub async fn save_session(client: &BooksClient, store: &impl KeyValueStore) -> Result<()> {
    match client.tokens().await {
        Some(tokens) => write_json(store, keys::AUTH_TOKENS, &tokens)?,
        None => clear_session(store)?,
    }
    Ok(())
}
