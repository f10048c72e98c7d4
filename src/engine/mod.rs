//! Compilation engine: one instance's choices, models and history.
//!
//! ```text
//! record_choice ──► choices + pending users
//!                         │
//! compile ──► encode ──► solve ──► canonicalize ──► diff ──► render ──► publish
//! ```
//!
//! Compilations of one engine are serialized by an async mutex; a caller
//! arriving while another compiles waits, then finds nothing pending and
//! returns immediately unless new choices arrived meanwhile. Recording a
//! choice never waits for the solver. Readers always see a complete result:
//! results are published as a whole behind an [`Arc`].

pub mod state;

pub use state::{PersistedState, StateLoadError};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use regex_lite::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{CompilationMode, Configuration, UsersMode};
use crate::encoder;
use crate::repr::{Labels, Pipeline, Rendering, Statistics};
use crate::solver::{SolveRequest, Solver, SolverError};
use crate::types::{intersection, CanonicalModel, HistoryEntry, ModelId, Selection, UserChoiceSet};

/// Error raised when a choice is rejected. Nothing is stored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChoiceError {
    /// Group index out of range.
    #[error("unknown choice group {group} (instance has {groups})")]
    UnknownGroup {
        /// Requested index.
        group: usize,
        /// Number of groups.
        groups: usize,
    },
    /// User not allowed in restricted mode.
    #[error("unknown user {0:?}")]
    UnknownUser(String),
    /// User id that is not a valid solver term.
    #[error("malformed user id {0:?}: expected a lowercase identifier or an integer")]
    MalformedUser(String),
    /// Item not in the group.
    #[error("choice group {group} has no item {item:?}")]
    UnknownItem {
        /// Group index.
        group: usize,
        /// Unknown item id.
        item: String,
    },
    /// Selection size outside the group's bounds.
    #[error("choice group {group} accepts {} items, got {count}", bounds(.min, .max))]
    Cardinality {
        /// Group index.
        group: usize,
        /// Selected item count.
        count: usize,
        /// Minimum allowed.
        min: usize,
        /// Maximum allowed, if bounded.
        max: Option<usize>,
    },
}

fn bounds(min: &usize, max: &Option<usize>) -> String {
    match *max {
        Some(max) if max == *min => min.to_string(),
        Some(max) => format!("{}..={}", min, max),
        None => format!("at least {}", min),
    }
}

/// Error raised by a compilation. The previous result stays visible.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The solver failed.
    #[error("solving failed: {0}")]
    Solver(#[from] SolverError),
}

/// Outcome of one compilation.
#[derive(Debug, Clone, Default)]
pub struct CompilationResult {
    /// Models in solver order, duplicates by id removed.
    pub models: Vec<CanonicalModel>,
    /// Ids of `models`; before the first compilation, the persisted ids.
    pub ids: BTreeSet<ModelId>,
    /// Compilation figures.
    pub stats: Statistics,
    /// Rendered page fragments.
    pub rendering: Rendering,
    /// When the result was produced; `None` before the first compilation.
    pub compiled_at: Option<DateTime<Utc>>,
}

impl CompilationResult {
    /// Model with the given id.
    pub fn model(&self, id: &ModelId) -> Option<&CanonicalModel> {
        self.models.iter().find(|m| m.id() == id)
    }

    /// Rendering of the model with the given id.
    pub fn model_rendering(&self, id: &ModelId) -> Option<&str> {
        self.models
            .iter()
            .position(|m| m.id() == id)
            .and_then(|i| self.rendering.models.get(i))
            .map(String::as_str)
    }

    /// Whether the last compilation found no model.
    pub fn is_unsatisfiable(&self) -> bool {
        self.compiled_at.is_some() && self.models.is_empty()
    }
}

#[derive(Debug, Default)]
struct Inputs {
    choices: UserChoiceSet,
    /// Users changed since the last successful compilation, with the
    /// sequence number of their latest change.
    pending: BTreeMap<String, u64>,
    next_seq: u64,
}

impl Inputs {
    fn mark_pending(&mut self, user: &str) {
        self.next_seq += 1;
        self.pending.insert(user.to_string(), self.next_seq);
    }
}

#[derive(Debug, Default)]
struct Published {
    result: Arc<CompilationResult>,
    history: Vec<HistoryEntry>,
}

/// Engine of one instance.
pub struct CompilationEngine {
    config: Configuration,
    solver: Arc<dyn Solver>,
    pipeline: Pipeline,
    labels: Labels,
    compile_lock: tokio::sync::Mutex<()>,
    inputs: Mutex<Inputs>,
    published: RwLock<Published>,
}

impl std::fmt::Debug for CompilationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompilationEngine")
            .field("pending", &self.pending_users())
            .field("models", &self.current().models.len())
            .finish_non_exhaustive()
    }
}

fn user_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:[a-z][A-Za-z0-9_]*|-?[0-9]+)$").expect("user id regex must compile")
    })
}

/// Whether `id` can appear as a term in the solver program.
pub fn is_valid_user_id(id: &str) -> bool {
    user_id_re().is_match(id)
}

impl CompilationEngine {
    /// Engine with the configuration's initial choices.
    pub fn new(config: Configuration, solver: Arc<dyn Solver>) -> Self {
        Self::with_state(config, solver, PersistedState::default())
    }

    /// Engine resuming from persisted state.
    ///
    /// Loaded choices override the configured defaults; in restricted mode
    /// choices of users no longer allowed are dropped. Every user present
    /// in the resulting choice set starts pending, so the first compilation
    /// runs even when not forced.
    pub fn with_state(config: Configuration, solver: Arc<dyn Solver>, state: PersistedState) -> Self {
        let PersistedState(loaded, ids, history) = state;
        let mut choices = config.initial_choices();
        for (user, selections) in loaded.iter() {
            if config.users.mode == UsersMode::Restricted && !choices.contains_user(user) {
                warn!(user, "dropping persisted choices of a user who is no longer allowed");
                continue;
            }
            let mut selections = selections.to_vec();
            selections.truncate(config.choice_groups.len());
            while selections.len() < config.choice_groups.len() {
                selections.push(config.default_selection(selections.len()));
            }
            for (group, selection) in selections.iter_mut().enumerate() {
                if config.choice_groups.get(group).is_some_and(|g| selection.iter().any(|i| !g.has_item(i))) {
                    warn!(user, group, "dropping persisted selection with unknown items");
                    *selection = config.default_selection(group);
                }
            }
            choices.set_all(user, selections);
        }

        let mut inputs = Inputs {
            choices,
            ..Default::default()
        };
        let users: Vec<String> = inputs.choices.users().map(str::to_string).collect();
        for user in &users {
            inputs.mark_pending(user);
        }
        debug!(users = users.len(), known_models = ids.len(), history = history.len(), "engine ready");

        Self {
            pipeline: Pipeline::new(&config.output),
            labels: Labels::from_config(&config),
            config,
            solver,
            compile_lock: tokio::sync::Mutex::new(()),
            inputs: Mutex::new(inputs),
            published: RwLock::new(Published {
                result: Arc::new(CompilationResult {
                    ids,
                    ..Default::default()
                }),
                history,
            }),
        }
    }

    /// Configuration of the instance.
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Store a user's selection in one group.
    ///
    /// Returns `true` when `group` is the last group, i.e. the user has
    /// gone through every group.
    pub fn record_choice(&self, user: &str, group: usize, selection: Selection) -> Result<bool, ChoiceError> {
        let groups = self.config.choice_groups.len();
        let choice_group = self
            .config
            .choice_groups
            .get(group)
            .ok_or(ChoiceError::UnknownGroup { group, groups })?;

        match self.config.users.mode {
            UsersMode::Restricted => {
                if !self.config.users.allowed.iter().any(|u| u.id == user) {
                    return Err(ChoiceError::UnknownUser(user.to_string()));
                }
            }
            UsersMode::Open => {
                if !is_valid_user_id(user) {
                    return Err(ChoiceError::MalformedUser(user.to_string()));
                }
            }
        }

        if let Some(unknown) = selection.iter().find(|item| !choice_group.has_item(item)) {
            return Err(ChoiceError::UnknownItem {
                group,
                item: unknown.clone(),
            });
        }
        let card = choice_group.cardinality;
        if !card.allows(selection.len()) {
            return Err(ChoiceError::Cardinality {
                group,
                count: selection.len(),
                min: card.min,
                max: card.max,
            });
        }

        let mut inputs = self.inputs.lock();
        inputs
            .choices
            .set(user, group, selection, |g| self.config.default_selection(g));
        inputs.mark_pending(user);
        debug!(user, group, "choice recorded");
        Ok(group + 1 == groups)
    }

    /// Restore defaults (restricted mode) or forget every choice (open
    /// mode). Affected users become pending.
    pub fn reset_choices(&self) {
        let mut inputs = self.inputs.lock();
        let mut affected: BTreeSet<String> = inputs.choices.users().map(str::to_string).collect();
        inputs.choices = self.config.initial_choices();
        affected.extend(inputs.choices.users().map(str::to_string));
        for user in &affected {
            inputs.mark_pending(user);
        }
        info!(users = affected.len(), "choices reset");
    }

    /// Recompile if choices changed since the last compilation, or always
    /// when `force` is set.
    ///
    /// Returns the compilation time, zero when nothing had to be done. On
    /// failure nothing changes: the previous result stays visible and
    /// pending users stay pending.
    #[tracing::instrument(skip(self))]
    pub async fn compile(&self, force: bool) -> Result<Duration, CompileError> {
        let _guard = self.compile_lock.lock().await;
        let start = Instant::now();

        let (choices, pending) = {
            let inputs = self.inputs.lock();
            if inputs.pending.is_empty() && !force {
                return Ok(Duration::ZERO);
            }
            (inputs.choices.clone(), inputs.pending.clone())
        };

        let program = encoder::encode(&self.config, &choices);
        let request = SolveRequest::from_config(&self.config, program);
        let raw = self.solver.solve(&request).await.map_err(|e| {
            warn!(error = %e, "compilation failed, keeping previous result");
            e
        })?;

        let id_words = self.config.output.id_words;
        let mut seen = BTreeSet::new();
        let mut models = Vec::with_capacity(raw.len());
        for solution in &raw {
            let model = CanonicalModel::from_raw(solution, id_words);
            if seen.insert(model.id().clone()) {
                models.push(model);
            } else {
                debug!(id = %model.id(), "merging model with an already seen id");
            }
        }

        let previous = self.current().ids.clone();
        let now = Utc::now();
        let entry = HistoryEntry::from_diff(now, pending.keys().cloned(), force, &previous, &seen);
        let runtime = start.elapsed();

        let stats = Statistics {
            nb_models: models.len(),
            runtime,
            common_atoms: models
                .split_first()
                .map(|(first, rest)| intersection(first, rest)),
        };
        let rendering = self.pipeline.render(&self.labels, &models, &stats);
        info!(
            models = models.len(),
            new = entry.new_models.len(),
            lost = entry.lost_models.len(),
            runtime_ms = runtime.as_millis() as u64,
            "compiled"
        );

        let result = CompilationResult {
            models,
            ids: seen,
            stats,
            rendering,
            compiled_at: Some(now),
        };
        {
            let mut published = self.published.write();
            published.result = Arc::new(result);
            published.history.push(entry);
        }

        // Users who changed again during solving stay pending.
        let mut inputs = self.inputs.lock();
        for (user, seq) in &pending {
            if inputs.pending.get(user) == Some(seq) {
                inputs.pending.remove(user);
            }
        }
        Ok(runtime)
    }

    /// Current result, compiling first in `direct access` mode.
    pub async fn results(&self) -> Result<Arc<CompilationResult>, CompileError> {
        if self.config.global.compilation == CompilationMode::DirectAccess {
            self.compile(false).await?;
        }
        Ok(self.current())
    }

    /// Current result, without compiling.
    pub fn current(&self) -> Arc<CompilationResult> {
        Arc::clone(&self.published.read().result)
    }

    /// Rendered page header of the current result.
    pub fn header(&self) -> String {
        self.current().rendering.header.clone()
    }

    /// Rendered page footer of the current result.
    pub fn footer(&self) -> String {
        self.current().rendering.footer.clone()
    }

    /// Rendering of one model of the current result.
    pub fn model_rendering(&self, id: &ModelId) -> Option<String> {
        self.current().model_rendering(id).map(str::to_string)
    }

    /// History, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.published.read().history.iter().rev().cloned().collect()
    }

    /// Users whose changes the next compilation will include, sorted.
    pub fn pending_users(&self) -> Vec<String> {
        self.inputs.lock().pending.keys().cloned().collect()
    }

    /// Copy of the recorded choices.
    pub fn choices(&self) -> UserChoiceSet {
        self.inputs.lock().choices.clone()
    }

    /// Selection of a user in a group, or the group default.
    pub fn selection_of(&self, user: &str, group: usize) -> Selection {
        self.inputs
            .lock()
            .choices
            .selection(user, group)
            .cloned()
            .unwrap_or_else(|| self.config.default_selection(group))
    }

    /// Program the next compilation would send to the solver.
    pub fn encoding(&self) -> String {
        let choices = self.choices();
        encoder::encode(&self.config, &choices)
    }

    /// State to persist: choices, visible model ids and history.
    pub fn snapshot(&self) -> PersistedState {
        let choices = self.choices();
        let published = self.published.read();
        PersistedState(choices, published.result.ids.clone(), published.history.clone())
    }
}
