//! File-backed store
//!
//! All keys live in one JSON object on disk. Nothing is cached: every read
//! loads the file, and every change reloads it, applies the change and
//! rewrites it through a temporary file and a rename. Several processes
//! can share one store; they take an advisory lock on a sidecar
//! `.lock` file around each access, so a change made by one is never
//! overwritten by another's stale copy.

use fd_lock::RwLock;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use super::{KeyValueStore, Result, StoreError};

type Entries = BTreeMap<String, String>;

/// Store persisted as a single JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Opens the store at `path`, creating parent directories as needed
    ///
    /// A missing file is an empty store. A file that is not a JSON object of
    /// strings is reported as [`StoreError::Corrupt`] rather than silently
    /// replaced.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let store = Self {
            lock_path: path.with_extension("json.lock"),
            path,
        };
        let count = store.read(|entries| entries.len())?;
        tracing::debug!("Opened store {} with {} key(s)", store.path.display(), count);

        Ok(store)
    }

    /// Location of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_file(&self) -> Result<RwLock<File>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        Ok(RwLock::new(file))
    }

    fn read<R>(&self, f: impl FnOnce(&Entries) -> R) -> Result<R> {
        let lock = self.lock_file()?;
        let _guard = lock.read()?;
        Ok(f(&self.load()?))
    }

    fn mutate<R>(&self, f: impl FnOnce(&mut Entries) -> R) -> Result<R> {
        let mut lock = self.lock_file()?;
        let _guard = lock.write()?;
        let mut entries = self.load()?;
        let result = f(&mut entries);
        self.persist(&entries)?;
        Ok(result)
    }

    fn load(&self) -> Result<Entries> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Entries::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| StoreError::Corrupt {
                path: self.path.display().to_string(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn persist(&self, entries: &Entries) -> Result<()> {
        let encoded = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Encode {
            key: "*".to_string(),
            source,
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.read(|e| e.get(key).cloned())
    }

    fn set(&self, key: &str, value: String) -> Result<()> {
        self.mutate(|e| {
            e.insert(key.to_string(), value);
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.mutate(|e| {
            e.remove(key);
        })
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<()> {
        self.mutate(|e| {
            if let Some(value) = f(e.get(key).cloned()) {
                e.insert(key.to_string(), value);
            }
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.read(|e| e.keys().cloned().collect())
    }

    fn clear(&self) -> Result<()> {
        self.mutate(Entries::clear)
    }
}
