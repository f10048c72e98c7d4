//! Core types: atoms, canonical models, choices and history.

pub mod atom;
pub mod choices;
pub mod history;
pub mod model;

pub use atom::{Atom, AtomParseError, RawSolution, Value};
pub use choices::{Selection, UserChoiceSet};
pub use history::HistoryEntry;
pub use model::{intersection, union, AtomsByPredicate, CanonicalModel, ModelId};
