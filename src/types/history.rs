//! Compilation history: an append-only audit trail of model changes.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::model::ModelId;

/// One compilation's effect on the visible set of models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the compilation finished.
    pub timestamp: DateTime<Utc>,
    /// Users whose choices changed since the previous compilation, sorted.
    pub changed_users: Vec<String>,
    /// Whether the compilation was forced rather than triggered by changes.
    #[serde(default)]
    pub forced: bool,
    /// Ids that appeared, sorted.
    pub new_models: Vec<ModelId>,
    /// Ids that disappeared, sorted.
    pub lost_models: Vec<ModelId>,
}

impl HistoryEntry {
    /// Build an entry from the id sets before and after a compilation.
    pub fn from_diff(
        timestamp: DateTime<Utc>,
        changed_users: impl IntoIterator<Item = String>,
        forced: bool,
        previous: &BTreeSet<ModelId>,
        current: &BTreeSet<ModelId>,
    ) -> Self {
        let changed: BTreeSet<String> = changed_users.into_iter().collect();
        Self {
            timestamp,
            changed_users: changed.into_iter().collect(),
            forced,
            new_models: current.difference(previous).cloned().collect(),
            lost_models: previous.difference(current).cloned().collect(),
        }
    }

    /// Whether the entry records any change of the model set.
    pub fn has_model_changes(&self) -> bool {
        !self.new_models.is_empty() || !self.lost_models.is_empty()
    }

    /// Format the timestamp in local time with a `strftime`-style pattern.
    pub fn format_timestamp(&self, pattern: &str) -> String {
        self.timestamp.with_timezone(&Local).format(pattern).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> BTreeSet<ModelId> {
        names.iter().map(|n| ModelId::new(*n)).collect()
    }

    #[test]
    fn test_diff_is_disjoint_and_sorted() {
        let previous = ids(&["Blue Cat", "Red Dog", "Cold Sun"]);
        let current = ids(&["Red Dog", "Tiny Owl", "Amber Fox"]);
        let entry = HistoryEntry::from_diff(
            Utc::now(),
            vec!["bob".to_string(), "alice".to_string()],
            false,
            &previous,
            &current,
        );

        assert_eq!(entry.changed_users, vec!["alice", "bob"]);
        assert_eq!(entry.new_models, vec![ModelId::new("Amber Fox"), ModelId::new("Tiny Owl")]);
        assert_eq!(entry.lost_models, vec![ModelId::new("Blue Cat"), ModelId::new("Cold Sun")]);

        let new: BTreeSet<_> = entry.new_models.iter().cloned().collect();
        let lost: BTreeSet<_> = entry.lost_models.iter().cloned().collect();
        assert!(new.is_disjoint(&lost));
        let rebuilt: BTreeSet<_> = previous.union(&new).cloned().collect::<BTreeSet<_>>()
            .difference(&lost).cloned().collect();
        assert_eq!(rebuilt, current);
    }

    #[test]
    fn test_unchanged_sets() {
        let same = ids(&["Blue Cat"]);
        let entry = HistoryEntry::from_diff(Utc::now(), Vec::new(), true, &same, &same);
        assert!(!entry.has_model_changes());
        assert!(entry.forced);
    }

    #[test]
    fn test_serde_round_trip_defaults_forced() {
        let json = r#"{"timestamp":"2024-01-01T10:00:00Z","changed_users":["a"],"new_models":["Blue Cat"],"lost_models":[]}"#;
        let entry: HistoryEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.forced);
        assert_eq!(entry.new_models, vec![ModelId::new("Blue Cat")]);
    }
}
