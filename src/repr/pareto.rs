//! Pareto fronts over two or three integer scores.
//!
//! Each model is scored by the first argument of its unary score atoms
//! (0 when absent). Higher is better on every axis. A model is on the
//! front when no other model scores at least as well on every axis and
//! strictly better on one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{escape_html, svg, ModelView, RenderContext, Representation};
use crate::template::Template;
use crate::types::CanonicalModel;

const TITLE: &str = "Pareto front of solutions according to {x_label} and {y_label} among {optimal_models_count} models";
const TITLE_3D: &str =
    "Pareto front of solutions according to {x_label}, {y_label} and {z_label} among {optimal_models_count} models";
const FLAG: &str = "<u>OPTIMAL</u><br/><br/>";

/// Where the front summary is rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Place {
    /// Page header.
    #[default]
    #[serde(alias = "Header")]
    Header,
    /// Page footer.
    #[serde(alias = "Footer")]
    Footer,
}

/// Scores not dominated by any other score.
///
/// Scores of different lengths never dominate each other.
pub fn pareto_front(scores: impl IntoIterator<Item = Vec<i64>>) -> BTreeSet<Vec<i64>> {
    let all: BTreeSet<Vec<i64>> = scores.into_iter().collect();
    all.iter()
        .filter(|a| !all.iter().any(|b| dominates(b, a)))
        .cloned()
        .collect()
}

fn dominates(a: &[i64], b: &[i64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x >= y) && a != b
}

/// Front summary in the header or footer, and a flag on each front model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParetoPlugin {
    /// Unary predicate holding the first score.
    pub x: String,
    /// Unary predicate holding the second score.
    pub y: String,
    /// Summary title; placeholders `x_label`, `y_label`, `optimal_models_count`.
    pub title: Template,
    /// First axis name.
    pub x_label: String,
    /// Second axis name.
    pub y_label: String,
    /// Where the summary goes.
    pub place: Place,
    /// Chart width in pixels.
    pub width: u32,
    /// Chart height in pixels.
    pub height: u32,
    /// HTML shown on models of the front.
    #[serde(alias = "model optimality flag")]
    pub model_optimality_flag: String,
}

impl Default for ParetoPlugin {
    fn default() -> Self {
        Self {
            x: "metric_x".to_string(),
            y: "metric_y".to_string(),
            title: Template::parse(TITLE).unwrap_or_default(),
            x_label: "score X".to_string(),
            y_label: "score Y".to_string(),
            place: Place::Header,
            width: 600,
            height: 400,
            model_optimality_flag: FLAG.to_string(),
        }
    }
}

/// Three-score variant. The summary plots the first two scores and lists
/// every front model with all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pareto3DPlugin {
    /// Unary predicate holding the first score.
    pub x: String,
    /// Unary predicate holding the second score.
    pub y: String,
    /// Unary predicate holding the third score.
    pub z: String,
    /// Summary title; placeholders `x_label`, `y_label`, `z_label`, `optimal_models_count`.
    pub title: Template,
    /// First axis name.
    pub x_label: String,
    /// Second axis name.
    pub y_label: String,
    /// Third axis name.
    pub z_label: String,
    /// Where the summary goes.
    pub place: Place,
    /// Chart width in pixels.
    pub width: u32,
    /// Chart height in pixels.
    pub height: u32,
    /// HTML shown on models of the front.
    #[serde(alias = "model optimality flag")]
    pub model_optimality_flag: String,
}

impl Default for Pareto3DPlugin {
    fn default() -> Self {
        Self {
            x: "metric_x".to_string(),
            y: "metric_y".to_string(),
            z: "metric_z".to_string(),
            title: Template::parse(TITLE_3D).unwrap_or_default(),
            x_label: "score X".to_string(),
            y_label: "score Y".to_string(),
            z_label: "score Z".to_string(),
            place: Place::Header,
            width: 600,
            height: 400,
            model_optimality_flag: FLAG.to_string(),
        }
    }
}

/// Borrowed options shared by both plugins.
struct Front<'a> {
    predicates: Vec<&'a str>,
    labels: Vec<&'a str>,
    title: &'a Template,
    place: Place,
    width: u32,
    height: u32,
    flag: &'a str,
}

const LABEL_NAMES: [&str; 3] = ["x_label", "y_label", "z_label"];

impl Front<'_> {
    fn validate(&self) -> Result<(), String> {
        let mut allowed: Vec<&str> = LABEL_NAMES[..self.labels.len()].to_vec();
        allowed.push("optimal_models_count");
        self.title
            .check_placeholders(&allowed)
            .map_err(|name| format!("title: unknown placeholder {{{}}}", name))
    }

    fn score(&self, model: &CanonicalModel) -> Vec<i64> {
        self.predicates
            .iter()
            .map(|predicate| {
                model
                    .atoms_of(predicate)
                    .find(|a| a.arity() == 1)
                    .and_then(|a| a.args[0].as_int())
                    .unwrap_or(0)
            })
            .collect()
    }

    fn summary(&self, ctx: &RenderContext<'_>) -> String {
        let scored: Vec<(Vec<i64>, &CanonicalModel)> = ctx.models.iter().map(|m| (self.score(m), m)).collect();
        let front = pareto_front(scored.iter().map(|(s, _)| s.clone()));
        let optimal: Vec<&(Vec<i64>, &CanonicalModel)> = scored.iter().filter(|(s, _)| front.contains(s)).collect();
        if optimal.is_empty() {
            return "<p>no optimal models to show</p>".to_string();
        }

        let count = optimal.len().to_string();
        let title = self.title.render(|name| match name {
            "optimal_models_count" => Some(count.clone()),
            other => LABEL_NAMES
                .iter()
                .position(|n| *n == other)
                .and_then(|i| self.labels.get(i))
                .map(|l| l.to_string()),
        });
        let points: Vec<(i64, i64, String)> = optimal
            .iter()
            .map(|(s, m)| (s[0], s[1], m.id().to_string()))
            .collect();
        let chart = svg::scatter(&title, self.labels[0], self.labels[1], &points, self.width, self.height);

        if self.labels.len() == 2 {
            return format!("{}<br/><center>{}</center><br/>", chart, escape_html(&title));
        }
        let mut table = String::from("<table><tr><th>model</th>");
        for label in &self.labels {
            table.push_str(&format!("<th>{}</th>", escape_html(label)));
        }
        table.push_str("</tr>");
        for (score, model) in &optimal {
            table.push_str(&format!("<tr><td>{}</td>", escape_html(model.id().as_str())));
            for value in score {
                table.push_str(&format!("<td>{}</td>", value));
            }
            table.push_str("</tr>");
        }
        table.push_str("</table>");
        format!("{}<br/><center>{}</center><br/>{}<br/>", chart, escape_html(&title), table)
    }

    fn on_header(&self, ctx: &RenderContext<'_>) -> String {
        match self.place {
            Place::Header => self.summary(ctx),
            Place::Footer => String::new(),
        }
    }

    fn on_footer(&self, ctx: &RenderContext<'_>) -> String {
        match self.place {
            Place::Footer => self.summary(ctx),
            Place::Header => String::new(),
        }
    }

    /// Linear in the number of models: the model is optimal when no other
    /// score dominates its own.
    fn on_model(&self, view: &ModelView<'_>, ctx: &RenderContext<'_>) -> String {
        let own = self.score(view.model);
        if ctx.models.iter().any(|m| dominates(&self.score(m), &own)) {
            String::new()
        } else {
            self.flag.to_string()
        }
    }
}

impl ParetoPlugin {
    fn front(&self) -> Front<'_> {
        Front {
            predicates: vec![self.x.as_str(), self.y.as_str()],
            labels: vec![self.x_label.as_str(), self.y_label.as_str()],
            title: &self.title,
            place: self.place,
            width: self.width,
            height: self.height,
            flag: &self.model_optimality_flag,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        self.front().validate()
    }
}

impl Pareto3DPlugin {
    fn front(&self) -> Front<'_> {
        Front {
            predicates: vec![self.x.as_str(), self.y.as_str(), self.z.as_str()],
            labels: vec![self.x_label.as_str(), self.y_label.as_str(), self.z_label.as_str()],
            title: &self.title,
            place: self.place,
            width: self.width,
            height: self.height,
            flag: &self.model_optimality_flag,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        self.front().validate()
    }
}

impl Representation for ParetoPlugin {
    fn on_header(&self, ctx: &RenderContext<'_>) -> String {
        self.front().on_header(ctx)
    }

    fn on_footer(&self, ctx: &RenderContext<'_>) -> String {
        self.front().on_footer(ctx)
    }

    fn on_model(&self, view: &ModelView<'_>, ctx: &RenderContext<'_>) -> String {
        self.front().on_model(view, ctx)
    }
}

impl Representation for Pareto3DPlugin {
    fn on_header(&self, ctx: &RenderContext<'_>) -> String {
        self.front().on_header(ctx)
    }

    fn on_footer(&self, ctx: &RenderContext<'_>) -> String {
        self.front().on_footer(ctx)
    }

    fn on_model(&self, view: &ModelView<'_>, ctx: &RenderContext<'_>) -> String {
        self.front().on_model(view, ctx)
    }
}
