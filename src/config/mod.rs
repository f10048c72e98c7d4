//! Instance configuration.
//!
//! The configuration is a `serde` tree where every section has defaults, so
//! a minimal JSON document is enough to run an instance. Parsing goes
//! through [`Configuration::from_json_str`], which also runs
//! [`Configuration::validate`]: every problem (unknown plugin kinds,
//! malformed templates, placeholders a template may not use) is reported
//! before the first compilation.

mod validate;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::hashname;
use crate::repr::ReprPlugin;
use crate::template::Template;
use crate::types::{Selection, UserChoiceSet};

/// Placeholders allowed in produced atom templates.
pub const PRODUCED_ATOM_PLACEHOLDERS: &[&str] = &["user", "choice"];

/// Placeholders allowed in data atom templates.
pub const DATA_ATOM_PLACEHOLDERS: &[&str] = &["user", "choice", "rank", "absolute_rank", "any_rank"];

/// Error raised when a configuration is malformed or inconsistent.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// JSON syntax error, wrong types, unknown plugin kind or malformed template.
    #[error("configuration parse error: {0}")]
    Parse(#[from] serde_json::Error),
    /// No choice group configured.
    #[error("at least one choice group is required")]
    NoChoiceGroups,
    /// A choice group has no items.
    #[error("choice group {group} has no items")]
    EmptyGroup {
        /// Group index.
        group: usize,
    },
    /// Two users or two items share an id.
    #[error("duplicate id {id:?} in {scope}")]
    DuplicateId {
        /// Where the duplicate was found.
        scope: String,
        /// Duplicated id.
        id: String,
    },
    /// Cardinality bounds are inverted or unsatisfiable.
    #[error("choice group {group} has invalid cardinality: {reason}")]
    InvalidCardinality {
        /// Group index.
        group: usize,
        /// Why the bounds are invalid.
        reason: String,
    },
    /// A default selection names an item that does not exist.
    #[error("choice group {group} default selects unknown item {item:?}")]
    UnknownDefaultItem {
        /// Group index.
        group: usize,
        /// Unknown item id.
        item: String,
    },
    /// A template uses a placeholder its context does not provide.
    #[error("{context}: template {template:?} uses unknown placeholder {{{placeholder}}}")]
    UnknownPlaceholder {
        /// Where the template is used.
        context: String,
        /// Template text.
        template: String,
        /// Unknown placeholder name.
        placeholder: String,
    },
    /// Model id word count out of range.
    #[error("id_words must be between {min} and {max}, got {0}", min = hashname::MIN_WORDS, max = hashname::MAX_WORDS)]
    InvalidIdWords(usize),
    /// Sampling combined with optimal-only solving.
    #[error("model selection 'sampling' cannot be combined with solving mode 'optimals'")]
    SamplingWithOptimals,
    /// A plugin's options are inconsistent.
    #[error("plugin {kind:?}: {reason}")]
    InvalidPlugin {
        /// Plugin kind.
        kind: String,
        /// What is wrong.
        reason: String,
    },
}

/// Complete configuration of one instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// Program source and global behavior.
    pub global: GlobalOptions,
    /// Who may record choices.
    pub users: UsersOptions,
    /// Ordered choice groups, addressed by index.
    pub choice_groups: Vec<ChoiceGroup>,
    /// Model selection and rendering.
    pub output: OutputOptions,
    /// Solver invocation.
    pub solver: SolverOptions,
    /// History display.
    pub history: HistoryOptions,
}

impl Configuration {
    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Default selection of a group (empty for an out-of-range index).
    pub fn default_selection(&self, group: usize) -> Selection {
        self.choice_groups
            .get(group)
            .map(ChoiceGroup::default_selection)
            .unwrap_or_default()
    }

    /// Choices an instance starts with: defaults for every allowed user in
    /// restricted mode, nothing in open mode.
    pub fn initial_choices(&self) -> UserChoiceSet {
        let mut choices = UserChoiceSet::new();
        if self.users.mode == UsersMode::Restricted {
            let defaults: Vec<Selection> = self
                .choice_groups
                .iter()
                .map(ChoiceGroup::default_selection)
                .collect();
            for user in &self.users.allowed {
                choices.set_all(&user.id, defaults.clone());
            }
        }
        choices
    }
}

/// Program source and global behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    /// Base constraint program.
    pub base_encoding: String,
    /// Predicates to show (`p/2` or `p`), in order.
    #[serde(deserialize_with = "words_or_list")]
    pub shows: Vec<String>,
    /// When results are compiled.
    pub compilation: CompilationMode,
}

/// When results are compiled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompilationMode {
    /// Compile (if needed) whenever results are read.
    #[default]
    #[serde(rename = "direct access", alias = "direct_access")]
    DirectAccess,
    /// Compile only on explicit request.
    #[serde(rename = "specific access", alias = "specific_access")]
    SpecificAccess,
}

/// Who may record choices.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsersOptions {
    /// Restricted to `allowed`, or open to any well-formed id.
    #[serde(alias = "type")]
    pub mode: UsersMode,
    /// Allowed users (restricted mode); also used as labels in open mode.
    pub allowed: Vec<LabeledItem>,
    /// Text shown on the user selection page.
    pub description: String,
}

/// User admission mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsersMode {
    /// Only configured users.
    Restricted,
    /// Any id that is a valid solver term.
    #[default]
    #[serde(alias = "valid-id")]
    Open,
}

/// A displayable item with a machine id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "LabeledItemRepr")]
pub struct LabeledItem {
    /// Display label.
    pub label: String,
    /// Machine id used in the program.
    pub id: String,
}

impl LabeledItem {
    /// Create an item.
    pub fn new(label: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            id: id.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LabeledItemRepr {
    Plain(Scalar),
    Full { label: String, id: Scalar },
}

impl From<LabeledItemRepr> for LabeledItem {
    fn from(repr: LabeledItemRepr) -> Self {
        match repr {
            LabeledItemRepr::Plain(id) => {
                let id = id.into_string();
                Self::new(id.clone(), id)
            }
            LabeledItemRepr::Full { label, id } => Self::new(label, id.into_string()),
        }
    }
}

/// A JSON scalar read as text.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Int(i64),
    Text(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Text(s) => s,
        }
    }
}

/// One set of alternatives users choose from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoiceGroup {
    /// Text shown above the choices.
    pub description: String,
    /// Alternatives.
    pub items: Vec<LabeledItem>,
    /// How many items one user may select.
    #[serde(alias = "type")]
    pub cardinality: Cardinality,
    /// Selection given to users who did not choose yet.
    pub default: DefaultSelection,
    /// Templates expanded per (user, selected item).
    #[serde(deserialize_with = "templates")]
    pub produced_atoms: Vec<Template>,
    /// Templates expanded over the declared universe.
    #[serde(deserialize_with = "templates")]
    pub data_atoms: Vec<Template>,
    /// Rank values: integers feed `{rank}`, booleans feed `{absolute_rank}`.
    pub ranks: BTreeMap<String, RankValue>,
}

impl ChoiceGroup {
    /// Resolved default selection.
    pub fn default_selection(&self) -> Selection {
        match &self.default {
            DefaultSelection::All => self.items.iter().map(|i| i.id.clone()).collect(),
            DefaultSelection::None => Selection::new(),
            DefaultSelection::Items(ids) => ids.iter().cloned().collect(),
        }
    }

    /// Whether the group has an item with this id.
    pub fn has_item(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    /// Integer rank values, in rank name order.
    pub fn rank_levels(&self) -> Vec<String> {
        self.ranks
            .values()
            .filter_map(|r| match r {
                RankValue::Level(n) => Some(n.to_string()),
                RankValue::Absolute(_) => None,
            })
            .collect()
    }

    /// Boolean rank values as `yes` / `no`, in rank name order.
    pub fn absolute_ranks(&self) -> Vec<String> {
        self.ranks
            .values()
            .filter_map(|r| match r {
                RankValue::Absolute(b) => Some(if *b { "yes" } else { "no" }.to_string()),
                RankValue::Level(_) => None,
            })
            .collect()
    }
}

/// Bounds on the number of items one user selects in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CardinalityRepr")]
pub struct Cardinality {
    /// Minimum number of items.
    pub min: usize,
    /// Maximum number of items, unbounded when `None`.
    pub max: Option<usize>,
}

impl Cardinality {
    /// Any number of items.
    pub const ANY: Self = Self { min: 0, max: None };
    /// Exactly one item.
    pub const EXACTLY_ONE: Self = Self { min: 1, max: Some(1) };

    /// Whether `count` selected items satisfy the bounds.
    pub fn allows(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl Default for Cardinality {
    fn default() -> Self {
        Self::ANY
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CardinalityRepr {
    Named(String),
    Range { min: usize, max: Option<usize> },
}

impl TryFrom<CardinalityRepr> for Cardinality {
    type Error = String;

    fn try_from(repr: CardinalityRepr) -> Result<Self, Self::Error> {
        match repr {
            CardinalityRepr::Range { min, max } => Ok(Self { min, max }),
            CardinalityRepr::Named(name) => match name.as_str() {
                "any" | "multiple" => Ok(Self::ANY),
                "at least 1" => Ok(Self { min: 1, max: None }),
                "at most 1" => Ok(Self { min: 0, max: Some(1) }),
                "exactly 1" | "single" => Ok(Self::EXACTLY_ONE),
                other => Err(format!(
                    "unknown cardinality {:?}; expected one of 'any', 'multiple', \
                     'at least 1', 'at most 1', 'exactly 1', 'single' or {{min, max}}",
                    other
                )),
            },
        }
    }
}

/// Default selection of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DefaultRepr", into = "DefaultRepr")]
pub enum DefaultSelection {
    /// Every item.
    #[default]
    All,
    /// Nothing.
    None,
    /// The listed item ids.
    Items(Vec<String>),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DefaultRepr {
    Named(String),
    Items(Vec<Scalar>),
}

impl From<DefaultSelection> for DefaultRepr {
    fn from(selection: DefaultSelection) -> Self {
        match selection {
            DefaultSelection::All => Self::Named("all".to_string()),
            DefaultSelection::None => Self::Named("none".to_string()),
            DefaultSelection::Items(ids) => Self::Items(ids.into_iter().map(Scalar::Text).collect()),
        }
    }
}

impl TryFrom<DefaultRepr> for DefaultSelection {
    type Error = String;

    fn try_from(repr: DefaultRepr) -> Result<Self, Self::Error> {
        match repr {
            DefaultRepr::Named(name) => match name.as_str() {
                "all" => Ok(Self::All),
                "none" => Ok(Self::None),
                other => Err(format!("unknown default {:?}; expected 'all', 'none' or a list of ids", other)),
            },
            DefaultRepr::Items(ids) => Ok(Self::Items(ids.into_iter().map(Scalar::into_string).collect())),
        }
    }
}

/// A rank value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RankValue {
    /// Absolute rank (`yes` / `no`).
    Absolute(bool),
    /// Numeric rank level.
    Level(i64),
}

/// How models are picked when the solver returns more than `max_models`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSelection {
    /// The first models in engine order.
    #[default]
    First,
    /// A uniform sample without replacement.
    Sampling,
}

/// Model selection and rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputOptions {
    /// Maximum number of models, 0 for no limit.
    pub max_models: usize,
    /// First or sampled models.
    pub model_selection: ModelSelection,
    /// Seed for sampling; fresh entropy when absent.
    pub sampling_seed: Option<u64>,
    /// Number of words in model ids.
    pub id_words: usize,
    /// Plugins rendering the page header.
    #[serde(deserialize_with = "plugin_chain")]
    pub header_repr: Vec<ReprPlugin>,
    /// Plugins rendering the page footer.
    #[serde(deserialize_with = "plugin_chain")]
    pub footer_repr: Vec<ReprPlugin>,
    /// Plugins opening each model.
    #[serde(deserialize_with = "plugin_chain")]
    pub model_header_repr: Vec<ReprPlugin>,
    /// Plugins rendering each model's body.
    #[serde(deserialize_with = "plugin_chain")]
    pub model_repr: Vec<ReprPlugin>,
    /// Plugins appended to each model's body.
    #[serde(deserialize_with = "plugin_chain")]
    pub inline_repr: Vec<ReprPlugin>,
    /// Plugins closing each model.
    #[serde(deserialize_with = "plugin_chain")]
    pub model_footer_repr: Vec<ReprPlugin>,
    /// Message shown when no model exists.
    #[serde(alias = "insatisfiability_message")]
    pub unsat_message: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            max_models: 0,
            model_selection: ModelSelection::First,
            sampling_seed: None,
            id_words: hashname::DEFAULT_WORDS,
            header_repr: Vec::new(),
            footer_repr: Vec::new(),
            model_header_repr: vec![ReprPlugin::Title(Default::default())],
            model_repr: vec![ReprPlugin::Table(Default::default())],
            inline_repr: Vec::new(),
            model_footer_repr: Vec::new(),
            unsat_message: "<i>That program is unsatisfiable.</i>".to_string(),
        }
    }
}

/// Which answers the solver reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolvingMode {
    /// Every answer set.
    #[default]
    All,
    /// Only optimal answer sets.
    Optimals,
}

/// Solver invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverOptions {
    /// Engine executable; looked up on `PATH` when absent.
    pub path: Option<PathBuf>,
    /// Extra command line flags.
    #[serde(deserialize_with = "words_or_list")]
    pub cli: Vec<String>,
    /// Program constants, passed as `-c name=value`.
    #[serde(deserialize_with = "scalar_map")]
    pub constants: BTreeMap<String, String>,
    /// All or optimal answers.
    pub solving_mode: SolvingMode,
    /// Wall-clock limit per invocation, in seconds.
    pub timeout_secs: u64,
}

impl SolverOptions {
    /// Invocation time limit.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            path: None,
            cli: Vec::new(),
            constants: BTreeMap::new(),
            solving_mode: SolvingMode::All,
            timeout_secs: 60,
        }
    }
}

/// History display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryOptions {
    /// `strftime` pattern for entry timestamps.
    pub time_format: String,
}

impl Default for HistoryOptions {
    fn default() -> Self {
        Self {
            time_format: "%Y/%m/%d %H:%M".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// A space-separated string or a list of strings.
fn words_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match OneOrMany::<String>::deserialize(deserializer)? {
        OneOrMany::One(words) => words.split_whitespace().map(str::to_string).collect(),
        OneOrMany::Many(list) => list,
    })
}

fn templates<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Template>, D::Error> {
    words_or_list(deserializer)?
        .iter()
        .map(|t| Template::parse(t).map_err(serde::de::Error::custom))
        .collect()
}

/// A kind string, an options object, or a list of either.
fn plugin_chain<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ReprPlugin>, D::Error> {
    let entries = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(entries) => entries,
        single => vec![single],
    };
    entries
        .into_iter()
        .map(|entry| ReprPlugin::from_json(entry).map_err(serde::de::Error::custom))
        .collect()
}

fn scalar_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<BTreeMap<String, String>, D::Error> {
    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw.into_iter().map(|(k, v)| (k, v.into_string())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document_uses_defaults() {
        let config: Configuration = serde_json::from_str("{}").unwrap();
        assert_eq!(config.output.max_models, 0);
        assert_eq!(config.output.id_words, hashname::DEFAULT_WORDS);
        assert_eq!(config.global.compilation, CompilationMode::DirectAccess);
        assert_eq!(config.solver.timeout(), Duration::from_secs(60));
        assert_eq!(config.output.model_repr.len(), 1);
        assert_eq!(config.output.model_repr[0].kind(), "table/2");
        assert_eq!(config.history.time_format, "%Y/%m/%d %H:%M");
    }

    #[test]
    fn test_labeled_items_accept_plain_and_full_forms() {
        let items: Vec<LabeledItem> =
            serde_json::from_str(r#"["ada", 3, {"label": "Lucas", "id": "lucas"}, {"label": "One", "id": 1}]"#)
                .unwrap();
        assert_eq!(items[0], LabeledItem::new("ada", "ada"));
        assert_eq!(items[1], LabeledItem::new("3", "3"));
        assert_eq!(items[2], LabeledItem::new("Lucas", "lucas"));
        assert_eq!(items[3], LabeledItem::new("One", "1"));
    }

    #[test]
    fn test_cardinality_forms() {
        let c: Cardinality = serde_json::from_str(r#""exactly 1""#).unwrap();
        assert_eq!(c, Cardinality::EXACTLY_ONE);
        let c: Cardinality = serde_json::from_str(r#"{"min": 2, "max": 3}"#).unwrap();
        assert!(c.allows(2) && c.allows(3) && !c.allows(1) && !c.allows(4));
        assert!(serde_json::from_str::<Cardinality>(r#""a few""#).is_err());
    }

    #[test]
    fn test_shows_and_templates_accept_strings() {
        let config: Configuration = serde_json::from_str(
            r#"{
                "global": {"shows": "assign/2 score/1"},
                "choice_groups": [{"items": ["a"], "produced_atoms": "pick({user},{choice}). like({user},{choice})"}]
            }"#,
        )
        .unwrap();
        assert_eq!(config.global.shows, vec!["assign/2", "score/1"]);
        assert_eq!(config.choice_groups[0].produced_atoms.len(), 2);
    }

    #[test]
    fn test_ranks_split_into_levels_and_absolutes() {
        let group: ChoiceGroup =
            serde_json::from_str(r#"{"ranks": {"first": 1, "second": 2, "veto": false, "must": true}}"#).unwrap();
        assert_eq!(group.rank_levels(), vec!["1", "2"]);
        // BTreeMap order: must, veto
        assert_eq!(group.absolute_ranks(), vec!["yes", "no"]);
    }

    #[test]
    fn test_initial_choices_restricted() {
        let config: Configuration = serde_json::from_str(
            r#"{
                "users": {"mode": "restricted", "allowed": ["ada", "lucas"]},
                "choice_groups": [{"items": ["1", "2"], "default": ["2"]}]
            }"#,
        )
        .unwrap();
        let choices = config.initial_choices();
        assert_eq!(choices.len(), 2);
        assert_eq!(
            choices.selection("ada", 0).unwrap().iter().collect::<Vec<_>>(),
            vec!["2"]
        );
    }

    #[test]
    fn test_initial_choices_open_is_empty() {
        let config: Configuration =
            serde_json::from_str(r#"{"choice_groups": [{"items": ["1"]}]}"#).unwrap();
        assert!(config.initial_choices().is_empty());
    }

    #[test]
    fn test_constants_accept_numbers() {
        let options: SolverOptions = serde_json::from_str(r#"{"constants": {"k": 3, "mode": "fast"}}"#).unwrap();
        assert_eq!(options.constants["k"], "3");
        assert_eq!(options.constants["mode"], "fast");
    }
}
