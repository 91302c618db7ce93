//! CLI configuration
//!
//! Settings come from command-line flags with environment fallbacks (see
//! `Cli` in `main.rs`). The acting user is taken from the environment when
//! set, otherwise from the identity stored at sign-in.

use anyhow::{Context, Result, bail};
use bizdesk_core::domain::log::Actor;
use bizdesk_core::session::{IdleTimerConfig, MAX_TOKEN_LIFETIME};
use bizdesk_core::store::{FileStore, KeyValueStore, keys, read_json};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Name of the store file inside the data directory
const STORE_FILE: &str = "store.json";

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the accounting API
    pub api_url: String,

    /// Directory holding the local store
    pub data_dir: PathBuf,

    /// Lifetime of an access token issued by the API
    pub token_lifetime: Duration,

    /// How long before expiry an idle user is asked to stay signed in
    pub prompt_before_expiry: Duration,

    /// Identity override for activity logs
    pub user_id: Option<String>,
    pub user_name: Option<String>,
}

impl Config {
    /// Checks the settings before any command runs
    pub fn validate(&self) -> Result<()> {
        if self.api_url.is_empty() {
            bail!("api_url cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!("api_url must start with http:// or https://");
        }

        if self.data_dir.as_os_str().is_empty() {
            bail!("data_dir cannot be empty");
        }

        if self.token_lifetime.is_zero() {
            bail!("token_lifetime must be greater than 0");
        }

        if self.token_lifetime > MAX_TOKEN_LIFETIME {
            bail!(
                "token_lifetime must be at most {} seconds",
                MAX_TOKEN_LIFETIME.as_secs()
            );
        }

        if self.prompt_before_expiry >= self.token_lifetime {
            bail!("prompt_before_expiry must be shorter than token_lifetime");
        }

        Ok(())
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(STORE_FILE)
    }

    /// Opens the local store
    pub fn open_store(&self) -> Result<Arc<FileStore>> {
        let path = self.store_path();
        let store = FileStore::open(&path)
            .with_context(|| format!("Failed to open local store at {}", path.display()))?;
        Ok(Arc::new(store))
    }

    pub fn idle_timer(&self) -> IdleTimerConfig {
        IdleTimerConfig {
            token_lifetime: self.token_lifetime,
            prompt_before_expiry: self.prompt_before_expiry,
        }
    }

    /// The user recorded in activity logs
    ///
    /// Environment overrides win, then the signed-in user, then a generic
    /// local identity.
    pub fn actor(&self, store: &impl KeyValueStore) -> Actor {
        let signed_in: Option<Actor> = read_json(store, keys::CURRENT_USER, None);

        let user_id = self
            .user_id
            .clone()
            .or_else(|| signed_in.as_ref().map(|a| a.user_id.clone()))
            .unwrap_or_else(|| "local".to_string());
        let user_name = self
            .user_name
            .clone()
            .or_else(|| signed_in.map(|a| a.user_name))
            .unwrap_or_else(|| user_id.clone());

        Actor::new(user_id, user_name)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            data_dir: PathBuf::from(".bizdesk"),
            token_lifetime: Duration::from_secs(900),
            prompt_before_expiry: Duration::from_secs(60),
            user_id: None,
            user_name: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bizdesk_core::store::{MemoryStore, write_json};

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store_path(), PathBuf::from(".bizdesk/store.json"));
        assert_eq!(config.idle_timer().idle_threshold(), Duration::from_secs(840));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.api_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());
        config.api_url = "https://books.example.com".to_string();
        assert!(config.validate().is_ok());

        config.prompt_before_expiry = Duration::from_secs(900);
        assert!(config.validate().is_err());

        config.prompt_before_expiry = Duration::from_secs(60);
        config.token_lifetime = Duration::ZERO;
        assert!(config.validate().is_err());

        config.token_lifetime = Duration::from_secs(u64::MAX);
        assert!(config.validate().is_err());
        config.token_lifetime = MAX_TOKEN_LIFETIME;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_actor_resolution() {
        let store = MemoryStore::new();
        let mut config = Config::default();
        assert_eq!(config.actor(&store), Actor::new("local", "local"));

        write_json(&store, keys::CURRENT_USER, &Actor::new("sam", "Sam Rai")).unwrap();
        assert_eq!(config.actor(&store), Actor::new("sam", "Sam Rai"));

        config.user_name = Some("Ops".to_string());
        assert_eq!(config.actor(&store), Actor::new("sam", "Ops"));
    }

    #[test]
    fn test_open_store_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().join("data"),
            ..Config::default()
        };

        let store = config.open_store().unwrap();
        store.set("k", "1".to_string()).unwrap();
        assert!(config.store_path().exists());
    }
}
