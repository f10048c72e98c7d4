//! # preference-kernel
//!
//! Deterministic compilation of group preferences into answer-set models.
//!
//! An instance couples a base constraint program with choice groups. Users
//! select items in each group; their choices become facts appended to the
//! program, an ASP solver enumerates the models, and each model is rendered
//! through a configurable chain of representation plugins.
//!
//! ## Architecture
//!
//! ```text
//! Configuration ─┐
//!                ├─► encoder ─► Solver (clingo | memory) ─► selection
//! UserChoiceSet ─┘                                              │
//!                                                               ▼
//!        history ◄── diff ◄── CanonicalModel + ModelId ◄── canonicalize
//!                                                               │
//!                                                               ▼
//!                                                       repr::Pipeline
//! ```
//!
//! ## Determinism Guarantees
//!
//! - A model's id depends only on its atom set, never on solver order
//! - The same choices and configuration produce the same program text
//! - Seeded sampling picks the same models for the same solver output

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod hashname;
pub mod repr;
pub mod solver;
pub mod template;
pub mod types;

// Re-exports
pub use canonical::{canonical_digest, canonical_hash, to_canonical_bytes};
pub use config::{
    Cardinality, ChoiceGroup, CompilationMode, ConfigError, Configuration, ModelSelection,
    SolvingMode, UsersMode,
};
pub use engine::{
    is_valid_user_id, ChoiceError, CompilationEngine, CompilationResult, CompileError,
    PersistedState, StateLoadError,
};
pub use repr::{Labels, Pipeline, Rendering, ReprPlugin, Representation, Statistics};
pub use solver::{ClingoSolver, InMemorySolver, SolveRequest, Solver, SolverError};
pub use template::{Template, TemplateError};
pub use types::{
    Atom, AtomParseError, CanonicalModel, HistoryEntry, ModelId, RawSolution, Selection,
    UserChoiceSet, Value,
};
