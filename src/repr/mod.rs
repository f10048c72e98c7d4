//! Representation pipeline.
//!
//! Each configured plugin contributes HTML fragments through three hooks:
//! page header, page footer and one call per model. Which hook runs depends
//! on the chain a plugin is placed in:
//!
//! ```text
//! header_repr        on_header
//! footer_repr        on_footer
//! model_header_repr  on_model   ┐
//! model_repr         on_model   │ concatenated per model
//! inline_repr        on_model   │
//! model_footer_repr  on_model   ┘
//! ```
//!
//! The set of plugins is closed ([`ReprPlugin`]) so an unknown kind fails
//! when the configuration is read, never while rendering.

mod clipboard;
mod pareto;
mod raw;
mod stats;
mod svg;
mod table;
mod text;
mod title;

pub use clipboard::ClipboardPlugin;
pub use pareto::{pareto_front, Pareto3DPlugin, ParetoPlugin, Place};
pub use raw::RawPlugin;
pub use stats::StatsPlugin;
pub use table::{Axis, TablePlugin, TableSource};
pub use text::{TextPlugin, TEXT_PLACEHOLDERS};
pub use title::TitlePlugin;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::{Configuration, OutputOptions};
use crate::types::{Atom, AtomsByPredicate, CanonicalModel, ModelId};

/// The three rendering hooks. Every hook defaults to an empty fragment.
pub trait Representation {
    /// Fragment for the page header.
    fn on_header(&self, _ctx: &RenderContext<'_>) -> String {
        String::new()
    }

    /// Fragment for the page footer.
    fn on_footer(&self, _ctx: &RenderContext<'_>) -> String {
        String::new()
    }

    /// Fragment for one model.
    fn on_model(&self, _view: &ModelView<'_>, _ctx: &RenderContext<'_>) -> String {
        String::new()
    }
}

/// A configured plugin, tagged by `kind`.
///
/// In configuration a plugin is either its kind alone (`"table/2"`) or an
/// object carrying the kind and its options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ReprPlugin {
    /// Template text.
    #[serde(rename = "text")]
    Text(TextPlugin),
    /// Solution index and id banner.
    #[serde(rename = "title")]
    Title(TitlePlugin),
    /// Row/column association table.
    #[serde(rename = "table/2")]
    Table(TablePlugin),
    /// Atom dump.
    #[serde(rename = "raw")]
    Raw(RawPlugin),
    /// Aggregate statistics over all models.
    #[serde(rename = "stats")]
    Stats(StatsPlugin),
    /// Copy-to-clipboard button.
    #[serde(rename = "clipboard")]
    Clipboard(ClipboardPlugin),
    /// Pareto front over two score predicates.
    #[serde(rename = "pareto front")]
    ParetoFront(ParetoPlugin),
    /// Pareto front over three score predicates.
    #[serde(rename = "pareto front 3D")]
    ParetoFront3D(Pareto3DPlugin),
}

impl ReprPlugin {
    /// Read a plugin from its configuration form.
    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let value = match value {
            serde_json::Value::String(kind) => serde_json::json!({ "kind": kind }),
            other => other,
        };
        serde_json::from_value(value)
    }

    /// Kind string as written in configuration.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Title(_) => "title",
            Self::Table(_) => "table/2",
            Self::Raw(_) => "raw",
            Self::Stats(_) => "stats",
            Self::Clipboard(_) => "clipboard",
            Self::ParetoFront(_) => "pareto front",
            Self::ParetoFront3D(_) => "pareto front 3D",
        }
    }

    /// Check options that serde cannot (template placeholders, ranges).
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Text(p) => p.validate(),
            Self::Title(p) => p.validate(),
            Self::Table(p) => p.validate(),
            Self::ParetoFront(p) => p.validate(),
            Self::ParetoFront3D(p) => p.validate(),
            Self::Raw(_) | Self::Stats(_) | Self::Clipboard(_) => Ok(()),
        }
    }

    fn as_representation(&self) -> &dyn Representation {
        match self {
            Self::Text(p) => p,
            Self::Title(p) => p,
            Self::Table(p) => p,
            Self::Raw(p) => p,
            Self::Stats(p) => p,
            Self::Clipboard(p) => p,
            Self::ParetoFront(p) => p,
            Self::ParetoFront3D(p) => p,
        }
    }
}

impl Representation for ReprPlugin {
    fn on_header(&self, ctx: &RenderContext<'_>) -> String {
        self.as_representation().on_header(ctx)
    }

    fn on_footer(&self, ctx: &RenderContext<'_>) -> String {
        self.as_representation().on_footer(ctx)
    }

    fn on_model(&self, view: &ModelView<'_>, ctx: &RenderContext<'_>) -> String {
        self.as_representation().on_model(view, ctx)
    }
}

/// Display labels of user and item ids.
#[derive(Debug, Clone, Default)]
pub struct Labels {
    users: BTreeMap<String, String>,
    items: BTreeMap<String, String>,
}

impl Labels {
    /// Collect labels from a configuration.
    pub fn from_config(config: &Configuration) -> Self {
        let users = config
            .users
            .allowed
            .iter()
            .map(|u| (u.id.clone(), u.label.clone()))
            .collect();
        let mut items = BTreeMap::new();
        for item in config.choice_groups.iter().flat_map(|g| g.items.iter()) {
            items.entry(item.id.clone()).or_insert_with(|| item.label.clone());
        }
        Self { users, items }
    }

    /// Label of a user, or the id itself.
    pub fn user<'a>(&'a self, id: &'a str) -> &'a str {
        self.users.get(id).map_or(id, String::as_str)
    }

    /// Label of an item, or the id itself.
    pub fn item<'a>(&'a self, id: &'a str) -> &'a str {
        self.items.get(id).map_or(id, String::as_str)
    }
}

/// Figures of one compilation.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    /// Number of models.
    pub nb_models: usize,
    /// Wall-clock compilation time.
    pub runtime: Duration,
    /// Atoms shared by every model; `None` when there is no model.
    pub common_atoms: Option<AtomsByPredicate>,
}

impl Statistics {
    /// Human-readable runtime.
    pub fn runtime_repr(&self) -> String {
        runtime_repr(self.runtime)
    }

    /// Number of atoms shared by every model.
    pub fn common_atom_count(&self) -> usize {
        self.common_atoms
            .as_ref()
            .map_or(0, |common| common.values().map(|args| args.len()).sum())
    }

    /// Shared atoms in solver syntax.
    pub fn common_facts(&self) -> String {
        let Some(common) = &self.common_atoms else {
            return String::new();
        };
        common
            .iter()
            .flat_map(|(pred, argss)| argss.iter().map(move |args| Atom::new(pred.clone(), args.clone())))
            .map(|atom| format!("{}.", atom))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything a hook may read.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    /// Id labels.
    pub labels: &'a Labels,
    /// All models of the compilation, in display order.
    pub models: &'a [CanonicalModel],
    /// Compilation figures.
    pub stats: &'a Statistics,
}

/// One model being rendered.
#[derive(Debug, Clone, Copy)]
pub struct ModelView<'a> {
    /// 1-based display index.
    pub index: usize,
    /// The model.
    pub model: &'a CanonicalModel,
}

impl ModelView<'_> {
    /// Id of the model.
    pub fn id(&self) -> &ModelId {
        self.model.id()
    }
}

/// Rendered page fragments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rendering {
    /// Page header; carries the unsatisfiability message when there is no model.
    pub header: String,
    /// Page footer.
    pub footer: String,
    /// One fragment per model, aligned with the models.
    pub models: Vec<String>,
}

/// The configured chains.
#[derive(Debug, Clone)]
pub struct Pipeline {
    header: Vec<ReprPlugin>,
    footer: Vec<ReprPlugin>,
    model_header: Vec<ReprPlugin>,
    model_body: Vec<ReprPlugin>,
    inline: Vec<ReprPlugin>,
    model_footer: Vec<ReprPlugin>,
    unsat_message: String,
}

impl Pipeline {
    /// Build the pipeline from output options.
    pub fn new(output: &OutputOptions) -> Self {
        Self {
            header: output.header_repr.clone(),
            footer: output.footer_repr.clone(),
            model_header: output.model_header_repr.clone(),
            model_body: output.model_repr.clone(),
            inline: output.inline_repr.clone(),
            model_footer: output.model_footer_repr.clone(),
            unsat_message: output.unsat_message.clone(),
        }
    }

    /// Render every fragment of a compilation.
    pub fn render(&self, labels: &Labels, models: &[CanonicalModel], stats: &Statistics) -> Rendering {
        let ctx = RenderContext { labels, models, stats };

        let mut header: String = self.header.iter().map(|p| p.on_header(&ctx)).collect();
        if models.is_empty() {
            header.push_str(&self.unsat_message);
        }
        let footer: String = self.footer.iter().map(|p| p.on_footer(&ctx)).collect();

        let per_model = [&self.model_header, &self.model_body, &self.inline, &self.model_footer];
        let rendered: Vec<String> = models
            .iter()
            .enumerate()
            .map(|(i, model)| {
                let view = ModelView { index: i + 1, model };
                per_model
                    .iter()
                    .flat_map(|chain| chain.iter())
                    .map(|p| p.on_model(&view, &ctx))
                    .collect::<String>()
            })
            .collect();

        Rendering {
            header,
            footer,
            models: rendered,
        }
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// `850ms`, `2.4s`, `3m05s`.
pub fn runtime_repr(runtime: Duration) -> String {
    let secs = runtime.as_secs_f64();
    if secs < 1.0 {
        format!("{}ms", runtime.as_millis())
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let total = runtime.as_secs();
        format!("{}m{:02}s", total / 60, total % 60)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::RawSolution;

    pub(crate) fn model(texts: &[&str]) -> CanonicalModel {
        CanonicalModel::from_raw(&RawSolution::from_texts(texts).unwrap(), 3)
    }

    pub(crate) fn stats_for(models: &[CanonicalModel]) -> Statistics {
        Statistics {
            nb_models: models.len(),
            runtime: Duration::from_millis(1500),
            common_atoms: models
                .split_first()
                .map(|(first, rest)| crate::types::intersection(first, rest)),
        }
    }

    #[test]
    fn test_plugin_from_kind_string() {
        let plugin = ReprPlugin::from_json(serde_json::json!("raw")).unwrap();
        assert_eq!(plugin.kind(), "raw");
        let plugin = ReprPlugin::from_json(serde_json::json!("pareto front")).unwrap();
        assert_eq!(plugin.kind(), "pareto front");
        let plugin = ReprPlugin::from_json(serde_json::json!("pareto front 3D")).unwrap();
        assert_eq!(plugin.kind(), "pareto front 3D");
        assert_eq!(plugin, ReprPlugin::ParetoFront3D(Pareto3DPlugin::default()));
    }

    #[test]
    fn test_plugin_from_options_object() {
        let plugin =
            ReprPlugin::from_json(serde_json::json!({"kind": "table/2", "source": "pick/rows,columns"})).unwrap();
        match plugin {
            ReprPlugin::Table(table) => assert_eq!(table.source.to_string(), "pick/rows,columns"),
            other => panic!("unexpected plugin {:?}", other),
        }
    }

    #[test]
    fn test_unknown_kind_names_the_kind() {
        let err = ReprPlugin::from_json(serde_json::json!("hologram")).unwrap_err();
        assert!(err.to_string().contains("hologram"));
    }

    #[test]
    fn test_labels_fall_back_to_ids() {
        let config = Configuration::from_json_str(
            r#"{"users": {"allowed": [{"label": "Ada", "id": "ada"}]},
                "choice_groups": [{"items": [{"label": "Room one", "id": 1}]}]}"#,
        )
        .unwrap();
        let labels = Labels::from_config(&config);
        assert_eq!(labels.user("ada"), "Ada");
        assert_eq!(labels.user("bob"), "bob");
        assert_eq!(labels.item("1"), "Room one");
        assert_eq!(labels.item("2"), "2");
    }

    #[test]
    fn test_hooks_default_to_empty() {
        struct Silent;
        impl Representation for Silent {}

        let models = vec![model(&["a(1)"])];
        let stats = stats_for(&models);
        let labels = Labels::default();
        let ctx = RenderContext { labels: &labels, models: &models, stats: &stats };
        let view = ModelView { index: 1, model: &models[0] };
        assert_eq!(Silent.on_header(&ctx), "");
        assert_eq!(Silent.on_footer(&ctx), "");
        assert_eq!(Silent.on_model(&view, &ctx), "");
    }

    #[test]
    fn test_item_label_from_first_group_wins() {
        let config = Configuration::from_json_str(
            r#"{"choice_groups": [
                {"items": [{"label": "Room one", "id": 1}]},
                {"items": [{"label": "First floor", "id": 1}, "2"]}]}"#,
        )
        .unwrap();
        let labels = Labels::from_config(&config);
        assert_eq!(labels.item("1"), "Room one");
        assert_eq!(labels.item("2"), "2");
    }

    #[test]
    fn test_pipeline_concatenates_chains_in_order() {
        let output: OutputOptions = serde_json::from_str(
            r#"{
                "header_repr": [{"kind": "text", "text": "H{nb_models}"}],
                "footer_repr": {"kind": "text", "text": "F"},
                "model_header_repr": [{"kind": "text", "text": "<{idx}>"}],
                "model_repr": [{"kind": "text", "text": "body"}],
                "inline_repr": [{"kind": "text", "text": "+"}],
                "model_footer_repr": [{"kind": "text", "text": "</{idx}>"}]
            }"#,
        )
        .unwrap();
        let models = vec![model(&["a(1)"]), model(&["a(2)"])];
        let rendering = Pipeline::new(&output).render(&Labels::default(), &models, &stats_for(&models));
        assert_eq!(rendering.header, "H2");
        assert_eq!(rendering.footer, "F");
        assert_eq!(rendering.models, vec!["<1>body+</1>", "<2>body+</2>"]);
    }

    #[test]
    fn test_unsat_message_in_header() {
        let output = OutputOptions::default();
        let rendering = Pipeline::new(&output).render(&Labels::default(), &[], &Statistics::default());
        assert_eq!(rendering.header, "<i>That program is unsatisfiable.</i>");
        assert!(rendering.models.is_empty());
    }

    #[test]
    fn test_statistics_common_atoms() {
        let models = vec![model(&["a(1)", "b"]), model(&["a(1)", "c"])];
        let stats = stats_for(&models);
        assert_eq!(stats.common_atom_count(), 1);
        assert_eq!(stats.common_facts(), "a(1).");
        assert_eq!(Statistics::default().common_atom_count(), 0);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_runtime_repr() {
        assert_eq!(runtime_repr(Duration::from_millis(850)), "850ms");
        assert_eq!(runtime_repr(Duration::from_millis(2400)), "2.4s");
        assert_eq!(runtime_repr(Duration::from_secs(185)), "3m05s");
    }
}
