//! Copy-to-clipboard button.

use serde::{Deserialize, Serialize};

use super::raw::facts;
use super::{escape_html, ModelView, RenderContext, Representation};

/// Button copying the model's atoms to the clipboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardPlugin {
    /// Button text.
    pub label: String,
    /// Predicates (`p` or `p/2`) to copy; all when empty.
    pub predicates: Vec<String>,
}

impl Default for ClipboardPlugin {
    fn default() -> Self {
        Self {
            label: "Copy atoms".to_string(),
            predicates: Vec::new(),
        }
    }
}

impl Representation for ClipboardPlugin {
    fn on_model(&self, view: &ModelView<'_>, _ctx: &RenderContext<'_>) -> String {
        format!(
            "<button type=\"button\" class=\"clipboard\" data-atoms=\"{}\" \
             onclick=\"navigator.clipboard.writeText(this.dataset.atoms)\">{}</button>",
            escape_html(&facts(view.model, &self.predicates)),
            escape_html(&self.label)
        )
    }
}
