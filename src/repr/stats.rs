//! Statistics over all models of a compilation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{escape_html, svg, RenderContext, Representation};
use crate::types::union;

/// Aggregate figures over every model: union size, intersection size and
/// atom counts per `predicate/arity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsPlugin {
    /// Report the number of distinct atoms across models.
    pub union: bool,
    /// Report the number of atoms common to all models.
    pub intersection: bool,
    /// Report atom counts per signature.
    pub counts: bool,
    /// Draw the counts as a bar chart instead of listing them.
    #[serde(alias = "plot counts")]
    pub plot_counts: bool,
    /// Chart title.
    pub title: String,
    /// Chart width in pixels; 0 sizes it from the number of bars.
    pub width: u32,
    /// Chart height in pixels; 0 for the default.
    pub height: u32,
    /// Chart y axis label.
    pub y_label: String,
}

impl Default for StatsPlugin {
    fn default() -> Self {
        Self {
            union: true,
            intersection: true,
            counts: true,
            plot_counts: true,
            title: "barplot of atom counts".to_string(),
            width: 0,
            height: 0,
            y_label: "number of atoms across models".to_string(),
        }
    }
}

impl StatsPlugin {
    fn render(&self, ctx: &RenderContext<'_>) -> String {
        if ctx.models.is_empty() {
            return String::new();
        }
        let all = union(ctx.models);
        let mut parts = Vec::new();
        if self.union {
            parts.push(format!("A total of {} different atoms were generated.", all.len()));
        }
        if self.intersection {
            parts.push(format!(
                "All models have {} atoms in common.",
                ctx.stats.common_atom_count()
            ));
        }
        if self.counts {
            let mut counts: BTreeMap<String, usize> = BTreeMap::new();
            for atom in &all {
                *counts.entry(atom.signature()).or_default() += 1;
            }
            let counts: Vec<(String, usize)> = counts.into_iter().collect();
            if self.plot_counts {
                parts.push(svg::bar_chart(&self.title, &self.y_label, &counts, self.width, self.height));
            } else {
                let listed: Vec<String> = counts
                    .iter()
                    .map(|(signature, n)| format!("{}: {}", escape_html(signature), n))
                    .collect();
                parts.push(format!("Atom counts: {}", listed.join(", ")));
            }
        }
        parts.join("<br/>\n")
    }
}

impl Representation for StatsPlugin {
    fn on_header(&self, ctx: &RenderContext<'_>) -> String {
        self.render(ctx)
    }

    fn on_footer(&self, ctx: &RenderContext<'_>) -> String {
        self.render(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::tests::{model, stats_for};
    use crate::repr::{Labels, ModelView};

    #[test]
    fn test_text_statistics() {
        let models = vec![model(&["a(1)", "a(2)", "b"]), model(&["a(1)", "c(1,2)"])];
        let stats = stats_for(&models);
        let labels = Labels::default();
        let ctx = RenderContext { labels: &labels, models: &models, stats: &stats };
        let plugin = StatsPlugin {
            plot_counts: false,
            ..Default::default()
        };

        assert_eq!(
            plugin.on_header(&ctx),
            "A total of 4 different atoms were generated.<br/>\n\
             All models have 1 atoms in common.<br/>\n\
             Atom counts: a/1: 2, b/0: 1, c/2: 1"
        );
        assert_eq!(plugin.on_footer(&ctx), plugin.on_header(&ctx));
        assert_eq!(plugin.on_model(&ModelView { index: 1, model: &models[0] }, &ctx), "");
    }

    #[test]
    fn test_chart_statistics() {
        let models = vec![model(&["a(1)", "b"])];
        let stats = stats_for(&models);
        let labels = Labels::default();
        let ctx = RenderContext { labels: &labels, models: &models, stats: &stats };
        let plugin = StatsPlugin {
            union: false,
            intersection: false,
            ..Default::default()
        };
        let out = plugin.on_header(&ctx);
        assert!(out.starts_with("<svg"));
        assert_eq!(out.matches("<rect").count(), 2);
    }

    #[test]
    fn test_nothing_without_models() {
        let labels = Labels::default();
        let stats = Default::default();
        let ctx = RenderContext { labels: &labels, models: &[], stats: &stats };
        assert_eq!(StatsPlugin::default().on_header(&ctx), "");
    }
}
