//! clingo subprocess backend.
//!
//! The program is written to the engine's stdin and answers are read from
//! its JSON output (`--outf=2`):
//!
//! ```text
//! {"Call": [{"Witnesses": [{"Value": ["a(1)", "b"], "Costs": [3]}, ...]}],
//!  "Result": "OPTIMUM FOUND", ...}
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::{selection, SolveRequest, Solver, SolverError};
use crate::config::SolverOptions;
use crate::types::{Atom, RawSolution};

/// Exit codes clingo uses for completed or interrupted searches
/// (satisfiable, unsatisfiable, exhausted and their combinations).
const ACCEPTED_EXIT_CODES: &[i32] = &[0, 10, 11, 20, 30];

/// Default executable name looked up on `PATH`.
const ENGINE_NAME: &str = "clingo";

/// Runs the clingo executable.
#[derive(Debug, Clone)]
pub struct ClingoSolver {
    path: Option<PathBuf>,
    timeout: Duration,
}

impl Default for ClingoSolver {
    fn default() -> Self {
        Self {
            path: None,
            timeout: Duration::from_secs(60),
        }
    }
}

impl ClingoSolver {
    /// Solver looking up `clingo` on `PATH`, with a 60 second limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the solver from configuration.
    pub fn from_options(options: &SolverOptions) -> Self {
        Self {
            path: options.path.clone(),
            timeout: options.timeout(),
        }
    }

    /// Use this executable instead of a `PATH` lookup.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Limit each invocation to `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Executable to run.
    pub fn resolve_path(&self) -> Result<PathBuf, SolverError> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => which::which(ENGINE_NAME).map_err(|e| {
                SolverError::EngineNotFound(format!("{} is not on PATH ({})", ENGINE_NAME, e))
            }),
        }
    }

    /// Whether the engine can be found.
    pub fn is_available(&self) -> bool {
        self.resolve_path().map_or(false, |p| p.exists())
    }
}

/// Command line for a request.
pub fn build_args(request: &SolveRequest) -> Vec<String> {
    let mut args = vec!["--outf=2".to_string()];
    args.extend(request.cli.iter().cloned());
    for (name, value) in &request.constants {
        args.push("-c".to_string());
        args.push(format!("{}={}", name, value));
    }
    if request.optimals_only && !request.cli.iter().any(|a| a.starts_with("--opt-mode")) {
        args.push("--opt-mode=optN".to_string());
    }
    let user_sets_models = request
        .cli
        .iter()
        .any(|a| a == "-n" || a.starts_with("--models") || (a.starts_with("-n") && a[2..].parse::<usize>().is_ok()));
    if !user_sets_models {
        // Selection happens after solving when all solutions are needed.
        let n = if request.sampling || request.optimals_only {
            0
        } else {
            request.max_models
        };
        args.push(format!("--models={}", n));
    }
    args
}

#[derive(Deserialize)]
struct Output {
    #[serde(rename = "Call", default)]
    calls: Vec<Call>,
    #[serde(rename = "Result", default)]
    result: String,
}

#[derive(Deserialize)]
struct Call {
    #[serde(rename = "Witnesses", default)]
    witnesses: Vec<Witness>,
}

#[derive(Deserialize)]
struct Witness {
    #[serde(rename = "Value", default)]
    value: Vec<String>,
    #[serde(rename = "Costs", default)]
    costs: Vec<i64>,
}

/// Parse clingo's JSON output into solutions, in engine order.
pub fn parse_output(stdout: &str) -> Result<Vec<RawSolution>, SolverError> {
    let output: Output =
        serde_json::from_str(stdout).map_err(|e| SolverError::MalformedOutput(e.to_string()))?;
    debug!(result = %output.result, "clingo finished");
    output
        .calls
        .into_iter()
        .flat_map(|call| call.witnesses)
        .map(|witness| {
            let atoms = witness
                .value
                .iter()
                .map(|text| Atom::parse(text))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SolverError::MalformedOutput(e.to_string()))?;
            Ok(RawSolution::new(atoms).with_costs(witness.costs))
        })
        .collect()
}

#[async_trait]
impl Solver for ClingoSolver {
    async fn solve(&self, request: &SolveRequest) -> Result<Vec<RawSolution>, SolverError> {
        let path = self.resolve_path()?;
        let args = build_args(request);
        debug!(path = %path.display(), ?args, bytes = request.program.len(), "running clingo");

        let mut child = Command::new(&path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SolverError::Spawn {
                path: path.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SolverError::Io(std::io::Error::other("solver stdin unavailable")))?;
        let program = request.program.clone();
        let feed = async move {
            let written = stdin.write_all(program.as_bytes()).await;
            drop(stdin);
            written
        };

        // Dropping the child on timeout kills the process.
        let run = async move { tokio::join!(feed, child.wait_with_output()) };
        let (fed, output) = tokio::time::timeout(self.timeout, run)
            .await
            .map_err(|_| SolverError::Timeout(self.timeout))?;
        let output = output?;

        let code = output.status.code();
        if !code.map_or(false, |c| ACCEPTED_EXIT_CODES.contains(&c)) {
            return Err(SolverError::EngineFailed {
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        fed?;

        let solutions = parse_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(solutions = solutions.len(), "clingo answers parsed");
        Ok(selection::select(request, solutions))
    }
}
