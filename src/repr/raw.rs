//! Raw atom dump, grouped by predicate.
//!
//! The filter helpers here are shared with the clipboard plugin.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{escape_html, ModelView, RenderContext, Representation};
use crate::types::{Atom, CanonicalModel};

/// Per-predicate dump of a model's atoms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawPlugin {
    /// Predicates (`p` or `p/2`) to show; all when empty.
    pub predicates: Vec<String>,
    /// HTML appended after the dump.
    pub footer: String,
}

impl Default for RawPlugin {
    fn default() -> Self {
        Self {
            predicates: Vec::new(),
            footer: "<br/>".to_string(),
        }
    }
}

/// Whether `atom` is selected by a `p` / `p/2` filter list (empty selects all).
pub(crate) fn selected(filter: &[String], atom: &Atom) -> bool {
    filter.is_empty()
        || filter
            .iter()
            .any(|f| *f == atom.predicate || *f == atom.signature())
}

/// Selected atoms of a model in solver syntax.
pub(crate) fn facts(model: &CanonicalModel, filter: &[String]) -> String {
    model
        .atoms()
        .iter()
        .filter(|a| selected(filter, a))
        .map(|a| format!("{}.", a))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Representation for RawPlugin {
    fn on_model(&self, view: &ModelView<'_>, _ctx: &RenderContext<'_>) -> String {
        let mut by_predicate: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for atom in view.model.atoms().iter().filter(|a| selected(&self.predicates, a)) {
            by_predicate
                .entry(atom.predicate.as_str())
                .or_default()
                .push(format!("{}.", atom));
        }
        let mut html = String::new();
        for (predicate, listed) in &by_predicate {
            html.push_str(&format!(
                "{} <code>{}</code> atoms found: <code>{}</code><br/>",
                listed.len(),
                escape_html(predicate),
                escape_html(&listed.join(" "))
            ));
        }
        html.push_str(&self.footer);
        html
    }
}
