//! Persisted instance state.
//!
//! The state is a JSON array `[user_choices, previous_model_ids, history]`.
//! A missing or damaged file never prevents an instance from starting: it
//! is logged and replaced by the empty state `[{}, [], []]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use crate::types::{HistoryEntry, ModelId, UserChoiceSet};

/// Error raised when persisted state cannot be read.
#[derive(Debug, thiserror::Error)]
pub enum StateLoadError {
    /// The file could not be read.
    #[error("cannot read state: {0}")]
    Io(#[from] io::Error),
    /// The content is not a valid state.
    #[error("invalid state: {0}")]
    Json(#[from] serde_json::Error),
}

/// `(user choices, ids of the last visible models, history)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState(
    /// Recorded choices.
    pub UserChoiceSet,
    /// Ids of the models visible when the state was taken.
    pub BTreeSet<ModelId>,
    /// History, oldest first.
    pub Vec<HistoryEntry>,
);

impl PersistedState {
    /// Parse a state, reporting errors.
    pub fn parse(json: &str) -> Result<Self, StateLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a state; malformed input yields the empty state.
    pub fn from_json_str(json: &str) -> Self {
        Self::parse(json).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding malformed persisted state");
            Self::default()
        })
    }

    /// Read a state file, reporting errors.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, StateLoadError> {
        Self::parse(&fs::read_to_string(path)?)
    }

    /// Read a state file; a missing, unreadable or malformed file yields
    /// the empty state.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::try_load(path) {
            Ok(state) => state,
            Err(StateLoadError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "no persisted state, starting empty");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "discarding persisted state");
                Self::default()
            }
        }
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Write the state, replacing the file atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec(self)?)?;
        fs::rename(&tmp, path)
    }

    /// Recorded choices.
    pub fn choices(&self) -> &UserChoiceSet {
        &self.0
    }

    /// Ids of the models visible when the state was taken.
    pub fn model_ids(&self) -> &BTreeSet<ModelId> {
        &self.1
    }

    /// History, oldest first.
    pub fn history(&self) -> &[HistoryEntry] {
        &self.2
    }
}
