//! Solver backends.
//!
//! A [`Solver`] turns program text into raw solutions. [`ClingoSolver`]
//! runs the clingo executable; [`InMemorySolver`] serves canned answers for
//! tests and embedding. Both apply the same model selection rules
//! ([`selection::select`]).

pub mod clingo;
pub mod memory;
pub mod selection;

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Configuration, ModelSelection, SolvingMode};
use crate::types::RawSolution;

pub use clingo::ClingoSolver;
pub use memory::InMemorySolver;

/// Error raised by a solver invocation.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// No executable configured and none found on `PATH`.
    #[error("solver engine not found: {0}")]
    EngineNotFound(String),
    /// The executable could not be started.
    #[error("failed to start solver {path}: {source}")]
    Spawn {
        /// Executable path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Reading from or writing to the solver process failed.
    #[error("solver i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The invocation exceeded its time limit; the process was killed.
    #[error("solver timed out after {0:?}")]
    Timeout(Duration),
    /// The engine reported an error exit code.
    #[error("solver failed with exit code {code:?}: {stderr}")]
    EngineFailed {
        /// Exit code, `None` when killed by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },
    /// The engine output could not be understood.
    #[error("malformed solver output: {0}")]
    MalformedOutput(String),
    /// Failure configured on an in-memory solver.
    #[error("injected solver failure: {0}")]
    Injected(String),
}

/// One solver invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveRequest {
    /// Complete program text.
    pub program: String,
    /// Maximum number of solutions, 0 for all.
    pub max_models: usize,
    /// Sample `max_models` solutions instead of keeping the first ones.
    pub sampling: bool,
    /// Sampling seed; fresh entropy when absent.
    pub sampling_seed: Option<u64>,
    /// Extra command line flags.
    pub cli: Vec<String>,
    /// Program constants.
    pub constants: BTreeMap<String, String>,
    /// Keep only optimal solutions.
    pub optimals_only: bool,
}

impl SolveRequest {
    /// Request for `program` with every option at its default.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
    }

    /// Request for `program` under the configured output and solver options.
    pub fn from_config(config: &Configuration, program: String) -> Self {
        Self {
            program,
            max_models: config.output.max_models,
            sampling: config.output.model_selection == ModelSelection::Sampling,
            sampling_seed: config.output.sampling_seed,
            cli: config.solver.cli.clone(),
            constants: config.solver.constants.clone(),
            optimals_only: config.solver.solving_mode == SolvingMode::Optimals,
        }
    }
}

/// A backend producing the solutions of a program.
#[async_trait]
pub trait Solver: Send + Sync {
    /// Solve the request. Solutions come in engine order, already filtered
    /// and limited according to the request.
    async fn solve(&self, request: &SolveRequest) -> Result<Vec<RawSolution>, SolverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_config() {
        let config = Configuration::from_json_str(
            r#"{
                "choice_groups": [{"items": ["1"]}],
                "output": {"max_models": 4, "model_selection": "sampling", "sampling_seed": 7},
                "solver": {"cli": "--parallel-mode=2", "constants": {"k": 2}}
            }"#,
        )
        .unwrap();
        let request = SolveRequest::from_config(&config, "a.".to_string());
        assert_eq!(request.program, "a.");
        assert_eq!(request.max_models, 4);
        assert!(request.sampling);
        assert_eq!(request.sampling_seed, Some(7));
        assert_eq!(request.cli, vec!["--parallel-mode=2"]);
        assert_eq!(request.constants["k"], "2");
        assert!(!request.optimals_only);
    }
}
