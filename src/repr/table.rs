//! Row/column association tables.
//!
//! The `source` option selects the atoms to show: `pred/rows,columns` takes
//! the first argument of every `pred/2` atom as a row and the second as a
//! column. Arguments may be skipped with `_`; any other word is a literal
//! the argument must equal for the atom to be kept:
//!
//! ```text
//! assign/rows,columns        assign(alice,3)
//! score/columns,_,rows,_     score(3,_,alice,_)
//! wish/rows,columns,yes      wish(alice,3,yes)    wish(alice,4,no) is skipped
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{escape_html, Labels, ModelView, RenderContext, Representation};
use crate::template::Template;
use crate::types::{CanonicalModel, Value};

const CAPTION_STYLE: &str = "<br/><small><i>{caption}</i></small><br/>";

/// Association table, or a "X has Y" list for one-to-one pairings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TablePlugin {
    /// How row values are labeled.
    pub rows: Axis,
    /// How column values are labeled.
    pub columns: Axis,
    /// Atom signature feeding the table.
    pub source: TableSource,
    /// Caption under the table; none when empty.
    pub caption: String,
    /// Caption layout; placeholder `caption`.
    #[serde(alias = "caption style")]
    pub caption_style: Template,
    /// Render strict one-to-one relations as a list.
    #[serde(alias = "enable pair repr if possible")]
    pub pair_repr: bool,
    /// Word between the two sides of a pair.
    #[serde(alias = "pair link text")]
    pub pair_link_text: String,
}

impl Default for TablePlugin {
    fn default() -> Self {
        Self {
            rows: Axis::User,
            columns: Axis::Choice,
            source: TableSource::pair("assoc"),
            caption: String::new(),
            caption_style: Template::parse(CAPTION_STYLE).unwrap_or_default(),
            pair_repr: true,
            pair_link_text: "has".to_string(),
        }
    }
}

/// Labeling of one table axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "AxisRepr", into = "AxisRepr")]
pub enum Axis {
    /// Configured user labels.
    User,
    /// Configured item labels.
    Choice,
    /// Values as written by the solver.
    Raw,
    /// Fixed labels assigned by position, cycling.
    Cycle(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum AxisRepr {
    Named(String),
    Labels(Vec<String>),
}

impl TryFrom<AxisRepr> for Axis {
    type Error = String;

    fn try_from(repr: AxisRepr) -> Result<Self, Self::Error> {
        match repr {
            AxisRepr::Named(name) => match name.as_str() {
                "user" => Ok(Self::User),
                "choice" => Ok(Self::Choice),
                "raw" => Ok(Self::Raw),
                other => Err(format!("unknown axis {:?}; expected 'user', 'choice', 'raw' or a list of labels", other)),
            },
            AxisRepr::Labels(labels) if labels.is_empty() => Err("axis label list is empty".to_string()),
            AxisRepr::Labels(labels) => Ok(Self::Cycle(labels)),
        }
    }
}

impl From<Axis> for AxisRepr {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::User => Self::Named("user".to_string()),
            Axis::Choice => Self::Named("choice".to_string()),
            Axis::Raw => Self::Named("raw".to_string()),
            Axis::Cycle(labels) => Self::Labels(labels),
        }
    }
}

impl Axis {
    /// Label of `value`, found at `position` among the axis' sorted values.
    fn label(&self, labels: &Labels, value: &Value, position: usize) -> String {
        let text = match self {
            Self::User => labels.user(&value.key()).to_string(),
            Self::Choice => labels.item(&value.key()).to_string(),
            Self::Raw => value.to_string(),
            Self::Cycle(names) => names[position % names.len()].clone(),
        };
        escape_html(&text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Field {
    Rows,
    Columns,
    Ignored,
    Literal(String),
}

/// Parsed `pred/field,...` signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableSource {
    predicate: String,
    fields: Vec<Field>,
}

impl TableSource {
    /// Parse a signature. Exactly one `rows` and one `columns` field are required.
    pub fn parse(text: &str) -> Result<Self, String> {
        let (predicate, fields) = text
            .split_once('/')
            .ok_or_else(|| format!("table source {:?} must look like 'pred/rows,columns'", text))?;
        let predicate = predicate.trim();
        if predicate.is_empty() {
            return Err(format!("table source {:?} has no predicate", text));
        }
        let fields: Vec<Field> = fields
            .split(',')
            .map(|f| match f.trim() {
                "rows" => Field::Rows,
                "columns" => Field::Columns,
                "_" => Field::Ignored,
                literal => Field::Literal(literal.to_string()),
            })
            .collect();
        for (required, name) in [(Field::Rows, "rows"), (Field::Columns, "columns")] {
            let count = fields.iter().filter(|f| **f == required).count();
            if count != 1 {
                return Err(format!(
                    "table source {:?} needs exactly one '{}' field, found {}",
                    text, name, count
                ));
            }
        }
        Ok(Self {
            predicate: predicate.to_string(),
            fields,
        })
    }

    fn pair(predicate: &str) -> Self {
        Self {
            predicate: predicate.to_string(),
            fields: vec![Field::Rows, Field::Columns],
        }
    }

    /// Rows, columns and row → columns relation found in a model.
    fn relation<'m>(&self, model: &'m CanonicalModel) -> Relation<'m> {
        let mut relation = Relation::default();
        for atom in model.atoms() {
            if atom.predicate != self.predicate || atom.args.len() != self.fields.len() {
                continue;
            }
            let mut row = None;
            let mut column = None;
            let mut matches = true;
            for (field, value) in self.fields.iter().zip(&atom.args) {
                match field {
                    Field::Rows => row = Some(value),
                    Field::Columns => column = Some(value),
                    Field::Ignored => {}
                    Field::Literal(expected) => {
                        if value.key() != *expected && value.to_string() != *expected {
                            matches = false;
                            break;
                        }
                    }
                }
            }
            if let (true, Some(row), Some(column)) = (matches, row, column) {
                relation.rows.insert(row);
                relation.columns.insert(column);
                relation.links.entry(row).or_default().insert(column);
            }
        }
        relation
    }
}

impl TryFrom<String> for TableSource {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TableSource> for String {
    fn from(source: TableSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self
            .fields
            .iter()
            .map(|field| match field {
                Field::Rows => "rows",
                Field::Columns => "columns",
                Field::Ignored => "_",
                Field::Literal(literal) => literal.as_str(),
            })
            .collect();
        write!(f, "{}/{}", self.predicate, fields.join(","))
    }
}

#[derive(Default)]
struct Relation<'m> {
    rows: BTreeSet<&'m Value>,
    columns: BTreeSet<&'m Value>,
    links: BTreeMap<&'m Value, BTreeSet<&'m Value>>,
}

impl Relation<'_> {
    fn is_one_to_one(&self) -> bool {
        !self.links.is_empty()
            && self.links.values().all(|columns| columns.len() == 1)
            && self.links.len() == self.columns.len()
    }
}

impl TablePlugin {
    pub(crate) fn validate(&self) -> Result<(), String> {
        self.caption_style
            .check_placeholders(&["caption"])
            .map_err(|name| format!("caption_style: unknown placeholder {{{}}}", name))
    }

    fn pair_list(&self, relation: &Relation<'_>, labels: &Labels) -> String {
        let link = escape_html(&self.pair_link_text);
        let items: String = relation
            .links
            .iter()
            .enumerate()
            .filter_map(|(i, (row, columns))| {
                let column = columns.iter().next()?;
                let position = relation.columns.iter().position(|c| c == column).unwrap_or(0);
                Some(format!(
                    "<li>{} {} {}</li>",
                    self.rows.label(labels, row, i),
                    link,
                    self.columns.label(labels, column, position)
                ))
            })
            .collect();
        format!(
            "<div style=\"display: inline-block\"><ul style=\"text-align: left; list-style-type:none\">{}</ul></div>",
            items
        )
    }

    fn table(&self, relation: &Relation<'_>, labels: &Labels) -> String {
        let mut html = String::from("<table> <tr>\n  <td></td>\n");
        for (i, column) in relation.columns.iter().enumerate() {
            html.push_str(&format!("   <th>{}</th>\n", self.columns.label(labels, column, i)));
        }
        html.push_str(" </tr>\n");
        for (i, row) in relation.rows.iter().enumerate() {
            html.push_str(&format!(" <tr>\n  <td>{}</td>", self.rows.label(labels, row, i)));
            let linked = relation.links.get(row);
            for column in &relation.columns {
                let mark = if linked.map_or(false, |l| l.contains(column)) { "×" } else { "" };
                html.push_str(&format!("   <td>{}</td>\n", mark));
            }
            html.push_str(" </tr>\n");
        }
        html.push_str("</table>");
        if !self.caption.is_empty() {
            let caption = escape_html(&self.caption);
            html.push_str(&self.caption_style.render(|name| (name == "caption").then(|| caption.clone())));
        }
        html
    }
}

impl Representation for TablePlugin {
    fn on_model(&self, view: &ModelView<'_>, ctx: &RenderContext<'_>) -> String {
        let relation = self.source.relation(view.model);
        if self.pair_repr && relation.is_one_to_one() {
            self.pair_list(&relation, ctx.labels)
        } else {
            self.table(&relation, ctx.labels)
        }
    }
}
