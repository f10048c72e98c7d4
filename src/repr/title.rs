//! Per-model banner with the solution index and model id.

use serde::{Deserialize, Serialize};

use super::{escape_html, ModelView, RenderContext, Representation};
use crate::template::Template;

const TITLE_STYLE: &str = "<br/><h2>Solution{idx_repr}</h2>{uid_repr}<br/>";
const UID_STYLE: &str = "<b>— {uid} —</b><br/><br/>";

/// Solution banner: index and model id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TitlePlugin {
    /// Show the 1-based solution index.
    pub index: bool,
    /// Show the model id.
    pub uid: bool,
    /// Banner layout; placeholders `idx_repr` and `uid_repr`.
    #[serde(alias = "title style")]
    pub title_style: Template,
    /// Id layout; placeholder `uid`.
    #[serde(alias = "uid style")]
    pub uid_style: Template,
}

impl Default for TitlePlugin {
    fn default() -> Self {
        Self {
            index: true,
            uid: true,
            title_style: Template::parse(TITLE_STYLE).unwrap_or_default(),
            uid_style: Template::parse(UID_STYLE).unwrap_or_default(),
        }
    }
}

impl TitlePlugin {
    pub(crate) fn validate(&self) -> Result<(), String> {
        self.title_style
            .check_placeholders(&["idx_repr", "uid_repr"])
            .map_err(|name| format!("title_style: unknown placeholder {{{}}}", name))?;
        self.uid_style
            .check_placeholders(&["uid"])
            .map_err(|name| format!("uid_style: unknown placeholder {{{}}}", name))
    }
}

impl Representation for TitlePlugin {
    fn on_model(&self, view: &ModelView<'_>, _ctx: &RenderContext<'_>) -> String {
        let uid_repr = if self.uid {
            let uid = escape_html(view.id().as_str());
            self.uid_style.render(|name| (name == "uid").then(|| uid.clone()))
        } else {
            String::new()
        };
        let idx_repr = if self.index {
            format!(" {}", view.index)
        } else {
            String::new()
        };
        self.title_style.render(|name| match name {
            "idx_repr" => Some(idx_repr.clone()),
            "uid_repr" => Some(uid_repr.clone()),
            _ => None,
        })
    }
}
