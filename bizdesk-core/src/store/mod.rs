//! Local key-value store
//!
//! The client persists everything under string keys holding JSON-encoded
//! strings. Access goes through [`KeyValueStore`] so the backing store can
//! be a file on disk in the CLI and a plain map in tests.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use thiserror::Error;

/// Fixed keys used by the application
pub mod keys {
    /// Flat pipeline list
    pub const PIPELINES: &str = "pipelines";
    /// Access/refresh token pair of the signed-in user
    pub const AUTH_TOKENS: &str = "authTokens";
    /// Identity of the signed-in user
    pub const CURRENT_USER: &str = "currentUser";

    /// Keys wiped when a session ends
    pub const SESSION: [&str; 2] = [AUTH_TOKENS, CURRENT_USER];
}

/// Store error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode value for '{key}': {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Store file {path} is corrupt: {message}")]
    Corrupt { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// String-keyed persistent store
///
/// Implementations use interior mutability so a single store can be shared
/// behind an `Arc` by repositories and the session watcher.
pub trait KeyValueStore: Send + Sync {
    /// Returns the raw value under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: String) -> Result<()>;

    /// Removes `key`; removing a missing key is not an error
    fn remove(&self, key: &str) -> Result<()>;

    /// Atomic read-modify-write of one key
    ///
    /// `f` is called exactly once with the current value and returns the
    /// value to store, or `None` to leave the key as it is. No other write
    /// to the store can land between the read and the write.
    fn update(&self, key: &str, f: &mut dyn FnMut(Option<String>) -> Option<String>)
    -> Result<()>;

    /// All keys currently present, sorted
    fn keys(&self) -> Result<Vec<String>>;

    /// Removes every key
    fn clear(&self) -> Result<()>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<()> {
        (**self).update(key, f)
    }

    fn keys(&self) -> Result<Vec<String>> {
        (**self).keys()
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }
}

/// Reads and decodes the JSON value under `key`
///
/// A missing key, an unreadable store or a value that fails to decode all
/// yield `fallback`. Decode failures are logged, never returned.
pub fn read_json<T, S>(store: &S, key: &str, fallback: T) -> T
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key) {
        Ok(raw) => decode(key, raw.as_deref(), fallback),
        Err(e) => {
            tracing::warn!("Failed to read '{}' from store: {}", key, e);
            fallback
        }
    }
}

/// Decodes the value under `key`, lets `f` change it and writes it back,
/// all as one [`KeyValueStore::update`]
///
/// A missing or malformed value starts out as `fallback`. When `f` fails
/// nothing is written and its error is returned.
pub fn update_json<T, R, E, S>(
    store: &S,
    key: &str,
    fallback: T,
    f: impl FnOnce(&mut T) -> std::result::Result<R, E>,
) -> std::result::Result<R, E>
where
    T: Serialize + DeserializeOwned,
    E: From<StoreError>,
    S: KeyValueStore + ?Sized,
{
    let mut f = Some(f);
    let mut fallback = Some(fallback);
    let mut outcome = None;

    store.update(key, &mut |raw: Option<String>| {
        let (f, fallback) = (f.take()?, fallback.take()?);
        let mut value = decode(key, raw.as_deref(), fallback);
        match f(&mut value).map(|r| (r, encode(key, &value))) {
            Ok((r, Ok(encoded))) => {
                outcome = Some(Ok(r));
                Some(encoded)
            }
            Ok((_, Err(e))) => {
                outcome = Some(Err(E::from(e)));
                None
            }
            Err(e) => {
                outcome = Some(Err(e));
                None
            }
        }
    })?;

    outcome.unwrap_or_else(|| {
        let message = format!("update of '{}' never ran", key);
        Err(E::from(StoreError::Io(std::io::Error::other(message))))
    })
}

fn decode<T: DeserializeOwned>(key: &str, raw: Option<&str>, fallback: T) -> T {
    let Some(raw) = raw else {
        return fallback;
    };
    match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Ignoring malformed value under '{}': {}", key, e);
            fallback
        }
    }
}

fn encode<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.to_string(),
        source,
    })
}

/// Encodes `value` as JSON and stores it under `key`
pub fn write_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    store.set(key, encode(key, value)?)
}

/// Removes every session key, leaving business data in place
pub fn clear_session<S: KeyValueStore + ?Sized>(store: &S) -> Result<()> {
    for key in keys::SESSION {
        store.remove(key)?;
    }
    tracing::info!("Local session state cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_json_falls_back_on_invalid_json() {
        let store = MemoryStore::new();
        store.set("rfqData", "not valid json".to_string()).unwrap();

        let value: Vec<String> = read_json(&store, "rfqData", vec!["fallback".to_string()]);

        assert_eq!(value, vec!["fallback".to_string()]);
    }

    #[test]
    fn test_read_json_falls_back_on_missing_key() {
        let store = MemoryStore::new();
        let value: Vec<u32> = read_json(&store, "nothing", Vec::new());
        assert!(value.is_empty());
    }

    #[test]
    fn test_read_json_falls_back_on_wrong_shape() {
        let store = MemoryStore::new();
        store.set("count", "{\"a\": 1}".to_string()).unwrap();
        let value: u32 = read_json(&store, "count", 7);
        assert_eq!(value, 7);
    }

    #[test]
    fn test_write_then_read_json() {
        let store = MemoryStore::new();
        write_json(&store, "numbers", &vec![1, 2, 3]).unwrap();
        let value: Vec<i32> = read_json(&store, "numbers", Vec::new());
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn test_update_json_applies_and_returns() {
        let store = MemoryStore::new();
        write_json(&store, "numbers", &vec![1, 2]).unwrap();

        let len = update_json(&store, "numbers", Vec::new(), |v: &mut Vec<i32>| {
            v.push(3);
            Ok::<_, StoreError>(v.len())
        })
        .unwrap();

        assert_eq!(len, 3);
        let value: Vec<i32> = read_json(&store, "numbers", Vec::new());
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn test_update_json_failure_writes_nothing() {
        let store = MemoryStore::new();
        store.set("numbers", "not valid json".to_string()).unwrap();

        let result: std::result::Result<(), StoreError> =
            update_json(&store, "numbers", Vec::<i32>::new(), |v| {
                v.push(1);
                Err(StoreError::Io(std::io::Error::other("refused")))
            });

        assert!(result.is_err());
        assert_eq!(store.get("numbers").unwrap().as_deref(), Some("not valid json"));
    }

    #[test]
    fn test_clear_session_keeps_pipelines() {
        let store = Arc::new(MemoryStore::new());
        store.set(keys::PIPELINES, "[]".to_string()).unwrap();
        store.set(keys::AUTH_TOKENS, "{}".to_string()).unwrap();
        store.set(keys::CURRENT_USER, "{}".to_string()).unwrap();

        clear_session(&store).unwrap();

        assert_eq!(store.keys().unwrap(), vec![keys::PIPELINES.to_string()]);
    }
}
