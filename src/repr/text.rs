//! Template text plugin.

use serde::{Deserialize, Serialize};

use super::{escape_html, ModelView, RenderContext, Representation};
use crate::template::Template;

/// Placeholders available to text plugins.
///
/// `idx`, `uid` and `atom_count` are only filled in model chains.
pub const TEXT_PLACEHOLDERS: &[&str] = &[
    "idx",
    "uid",
    "atom_count",
    "nb_models",
    "runtime",
    "runtime_repr",
    "compilation_runtime",
    "compilation_runtime_repr",
    "common_atoms",
];

/// Template text rendered on every hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextPlugin {
    /// HTML text with `{placeholder}` substitutions.
    pub text: Template,
}

impl TextPlugin {
    pub(crate) fn validate(&self) -> Result<(), String> {
        self.text.check_placeholders(TEXT_PLACEHOLDERS).map_err(|name| {
            format!(
                "unknown placeholder {{{}}} in {:?}; available: {}",
                name,
                self.text.as_str(),
                TEXT_PLACEHOLDERS.join(", ")
            )
        })
    }

    fn render(&self, view: Option<&ModelView<'_>>, ctx: &RenderContext<'_>) -> String {
        self.text.render(|name| {
            let value = match name {
                "idx" => view.map(|v| v.index.to_string()),
                "uid" => view.map(|v| v.id().to_string()),
                "atom_count" => view.map(|v| v.model.atoms().len().to_string()),
                "nb_models" => Some(ctx.stats.nb_models.to_string()),
                "runtime" | "compilation_runtime" => Some(format!("{:.3}", ctx.stats.runtime.as_secs_f64())),
                "runtime_repr" | "compilation_runtime_repr" => Some(ctx.stats.runtime_repr()),
                "common_atoms" => Some(ctx.stats.common_facts()),
                _ => None,
            };
            value.map(|v| escape_html(&v))
        })
    }
}

impl Representation for TextPlugin {
    fn on_header(&self, ctx: &RenderContext<'_>) -> String {
        self.render(None, ctx)
    }

    fn on_footer(&self, ctx: &RenderContext<'_>) -> String {
        self.render(None, ctx)
    }

    fn on_model(&self, view: &ModelView<'_>, ctx: &RenderContext<'_>) -> String {
        self.render(Some(view), ctx)
    }
}
