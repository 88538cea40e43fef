//! Local key-value storage for the form's markers.
//!
//! This plays the role of browser local storage: two fixed keys, string
//! values, no reconciliation with the server.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use super::state::{FormState, LocalSubmission};

/// Key holding the JSON-encoded `LocalSubmission`.
pub const SUBMITTED_KEY: &str = "formSubmitted";

/// Key set to `"true"` once the withdrawal has been used.
pub const WITHDRAWN_KEY: &str = "formWithdrawn";

#[derive(Debug, Error)]
pub enum KeyValueError {
    #[error("failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode value for {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyValueError>;
    fn remove(&mut self, key: &str) -> Result<(), KeyValueError>;
}

/// Volatile store, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyValueStore {
    entries: HashMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyValueError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyValueError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole object is rewritten on every mutation.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    /// The file on disk does not hold `entries` and must be rewritten.
    stale: bool,
}

impl FileKeyValueStore {
    /// Open the store at `path`.
    ///
    /// A missing file is an empty store. So is a file that is not a JSON
    /// object of strings: it is overwritten by the next `set` or `remove`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, KeyValueError> {
        let path = path.as_ref().to_path_buf();
        let (entries, stale) = match fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => (BTreeMap::new(), false),
            Ok(content) => match serde_json::from_str(&content) {
                Ok(entries) => (entries, false),
                Err(e) => {
                    warn!("Ignoring unreadable state file {}: {}", path.display(), e);
                    (BTreeMap::new(), true)
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (BTreeMap::new(), false),
            Err(source) => {
                return Err(KeyValueError::Io {
                    action: "read",
                    path,
                    source,
                })
            }
        };
        Ok(Self {
            path,
            entries,
            stale,
        })
    }

    fn flush(&mut self) -> Result<(), KeyValueError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| KeyValueError::Io {
                    action: "create directory for",
                    path: self.path.clone(),
                    source,
                })?;
            }
        }
        let content =
            serde_json::to_string_pretty(&self.entries).map_err(|source| KeyValueError::Encode {
                key: self.path.display().to_string(),
                source,
            })?;
        fs::write(&self.path, content).map_err(|source| KeyValueError::Io {
            action: "write",
            path: self.path.clone(),
            source,
        })?;
        self.stale = false;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, KeyValueError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), KeyValueError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), KeyValueError> {
        if self.entries.remove(key).is_some() || self.stale {
            self.flush()?;
        }
        Ok(())
    }
}

/// Rebuild the form state from the two markers.
///
/// An unreadable submission marker is deleted and treated as absent.
pub fn load_form_state(store: &mut impl KeyValueStore) -> Result<FormState, KeyValueError> {
    let withdrawal_used = store.get(WITHDRAWN_KEY)?.is_some();

    let submission = match store.get(SUBMITTED_KEY)? {
        Some(raw) => match serde_json::from_str::<LocalSubmission>(&raw) {
            Ok(submission) => Some(submission),
            Err(e) => {
                warn!("Discarding unreadable {} marker: {}", SUBMITTED_KEY, e);
                store.remove(SUBMITTED_KEY)?;
                None
            }
        },
        None => None,
    };

    Ok(match submission {
        Some(submission) if submission.submitted => FormState::Submitted {
            submission,
            withdrawal_used,
        },
        _ if withdrawal_used => FormState::Withdrawn,
        _ => FormState::Idle,
    })
}

pub fn save_submission(
    store: &mut impl KeyValueStore,
    submission: &LocalSubmission,
) -> Result<(), KeyValueError> {
    let encoded = serde_json::to_string(submission).map_err(|source| KeyValueError::Encode {
        key: SUBMITTED_KEY.to_string(),
        source,
    })?;
    store.set(SUBMITTED_KEY, &encoded)
}
