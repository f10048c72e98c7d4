//! Per-user selections across choice groups.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Selected item ids of one user in one choice group.
pub type Selection = BTreeSet<String>;

/// `user id → one selection per choice group`.
///
/// Users and selections are kept sorted so that iteration (and therefore
/// the encoded program) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserChoiceSet(BTreeMap<String, Vec<Selection>>);

impl UserChoiceSet {
    /// Create an empty choice set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection of `user` in `group`, if recorded.
    pub fn selection(&self, user: &str, group: usize) -> Option<&Selection> {
        self.0.get(user).and_then(|groups| groups.get(group))
    }

    /// Store a selection, padding missing groups of that user with `fill`.
    pub fn set(
        &mut self,
        user: &str,
        group: usize,
        selection: Selection,
        fill: impl Fn(usize) -> Selection,
    ) {
        let groups = self.0.entry(user.to_string()).or_default();
        while groups.len() <= group {
            groups.push(fill(groups.len()));
        }
        groups[group] = selection;
    }

    /// Replace every group of a user.
    pub fn set_all(&mut self, user: &str, selections: Vec<Selection>) {
        self.0.insert(user.to_string(), selections);
    }

    /// Users with recorded choices, sorted.
    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate `(user, selections per group)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Selection])> {
        self.0.iter().map(|(u, s)| (u.as_str(), s.as_slice()))
    }

    /// Whether a user has recorded choices.
    pub fn contains_user(&self, user: &str) -> bool {
        self.0.contains_key(user)
    }

    /// Number of users with choices.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no user has choices.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
