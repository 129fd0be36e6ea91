// Saved drafts, stored as JSON under `library:<name>` keys.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use riftdraft_core::store::{KeyValueStore, StoreError};
use riftdraft_draft::{DraftError, DraftMode, DraftSession, Side, Snapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

const KEY_PREFIX: &str = "library:";
const MAX_NAME_LEN: usize = 64;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("draft name must be 1-64 characters, got {0:?}")]
    InvalidName(String),

    #[error("saved draft {name:?} is corrupt: {source}")]
    Corrupt {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("saved draft {name:?} cannot be resumed: {source}")]
    Unrestorable {
        name: String,
        #[source]
        source: DraftError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDraft {
    pub name: String,
    pub mode: DraftMode,
    pub user_side: Side,
    pub snapshot: Snapshot,
    pub saved_at: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SavedDraft {
    /// A fresh session positioned where the draft was saved. Fails when the
    /// stored board and cursor disagree.
    pub fn restore(&self) -> Result<DraftSession, LibraryError> {
        DraftSession::restore(self.mode, self.user_side, self.snapshot.clone()).map_err(|source| {
            LibraryError::Unrestorable {
                name: self.name.clone(),
                source,
            }
        })
    }
}

pub struct DraftLibrary {
    store: Arc<dyn KeyValueStore>,
}

impl DraftLibrary {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(name: &str) -> String {
        format!("{KEY_PREFIX}{name}")
    }

    fn check_name(name: &str) -> Result<&str, LibraryError> {
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
            return Err(LibraryError::InvalidName(name.to_string()));
        }
        Ok(trimmed)
    }

    /// Save `session` under `name`, replacing any draft with that name.
    pub fn save(
        &self,
        name: &str,
        session: &DraftSession,
        notes: Option<String>,
    ) -> Result<SavedDraft, LibraryError> {
        let name = Self::check_name(name)?;
        let saved = SavedDraft {
            name: name.to_string(),
            mode: session.mode(),
            user_side: session.user_side(),
            snapshot: session.snapshot(),
            saved_at: Utc::now(),
            notes,
        };
        let json = serde_json::to_string(&saved).map_err(|source| StoreError::Encode {
            key: Self::key(name),
            source,
        })?;
        self.store.set(&Self::key(name), &json)?;
        info!(name, "draft saved");
        Ok(saved)
    }

    pub fn load(&self, name: &str) -> Result<Option<SavedDraft>, LibraryError> {
        let name = Self::check_name(name)?;
        let Some(raw) = self.store.get(&Self::key(name))? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| LibraryError::Corrupt {
                name: name.to_string(),
                source,
            })
    }

    /// All saved drafts, newest first. Corrupt entries are skipped.
    pub fn list(&self) -> Result<Vec<SavedDraft>, LibraryError> {
        let mut drafts = Vec::new();
        for key in self.store.keys_with_prefix(KEY_PREFIX)? {
            let Some(raw) = self.store.get(&key)? else {
                continue;
            };
            match serde_json::from_str::<SavedDraft>(&raw) {
                Ok(draft) => drafts.push(draft),
                Err(e) => warn!(%key, error = %e, "skipping corrupt saved draft"),
            }
        }
        drafts.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(drafts)
    }

    /// Returns whether a draft with that name existed.
    pub fn delete(&self, name: &str) -> Result<bool, LibraryError> {
        let name = Self::check_name(name)?;
        let key = Self::key(name);
        let existed = self.store.get(&key)?.is_some();
        self.store.remove(&key)?;
        if existed {
            info!(name, "draft deleted");
        }
        Ok(existed)
    }
}
