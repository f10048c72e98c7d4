//! In-memory solver for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{selection, SolveRequest, Solver, SolverError};
use crate::types::RawSolution;

type Responder = Arc<dyn Fn(&SolveRequest) -> Result<Vec<RawSolution>, SolverError> + Send + Sync>;

/// Solver serving canned answers.
///
/// Answers are either a fixed list or computed from the request by a
/// closure. A delay and an injected failure can be configured to exercise
/// callers; calls and the peak number of concurrent calls are counted.
pub struct InMemorySolver {
    responder: Mutex<Responder>,
    failure: Mutex<Option<String>>,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    last_request: Mutex<Option<SolveRequest>>,
}

impl InMemorySolver {
    /// Solver always answering `solutions`.
    pub fn new(solutions: Vec<RawSolution>) -> Self {
        Self::with_responder(fixed(solutions))
    }

    /// Solver answering with `f(request)`.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&SolveRequest) -> Result<Vec<RawSolution>, SolverError> + Send + Sync + 'static,
    {
        Self::with_responder(Arc::new(f))
    }

    fn with_responder(responder: Responder) -> Self {
        Self {
            responder: Mutex::new(responder),
            failure: Mutex::new(None),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the answers of subsequent calls.
    pub fn set_solutions(&self, solutions: Vec<RawSolution>) {
        *self.responder.lock() = fixed(solutions);
    }

    /// Make subsequent calls fail (`Some`) or succeed again (`None`).
    pub fn set_failure(&self, message: Option<&str>) {
        *self.failure.lock() = message.map(str::to_string);
    }

    /// Number of calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were running at the same time.
    pub fn max_concurrent_calls(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    /// Most recent request.
    pub fn last_request(&self) -> Option<SolveRequest> {
        self.last_request.lock().clone()
    }
}

impl std::fmt::Debug for InMemorySolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySolver")
            .field("delay", &self.delay)
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

fn fixed(solutions: Vec<RawSolution>) -> Responder {
    Arc::new(move |_: &SolveRequest| Ok(solutions.clone()))
}

#[async_trait]
impl Solver for InMemorySolver {
    async fn solve(&self, request: &SolveRequest) -> Result<Vec<RawSolution>, SolverError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        *self.last_request.lock() = Some(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failure = self.failure.lock().clone();
        let responder = self.responder.lock().clone();
        let result = match failure {
            Some(message) => Err(SolverError::Injected(message)),
            None => responder(request).map(|solutions| selection::select(request, solutions)),
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solutions(n: usize) -> Vec<RawSolution> {
        (0..n)
            .map(|i| RawSolution::from_texts([format!("n({})", i)]).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_fixed_answers_are_limited() {
        let solver = InMemorySolver::new(solutions(5));
        let request = SolveRequest {
            max_models: 2,
            ..SolveRequest::new("")
        };
        assert_eq!(solver.solve(&request).await.unwrap().len(), 2);
        assert_eq!(solver.calls(), 1);
        assert_eq!(solver.last_request(), Some(request));
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let solver = InMemorySolver::new(solutions(1));
        solver.set_failure(Some("boom"));
        assert!(matches!(
            solver.solve(&SolveRequest::new("")).await,
            Err(SolverError::Injected(m)) if m == "boom"
        ));
        solver.set_failure(None);
        solver.set_solutions(solutions(3));
        assert_eq!(solver.solve(&SolveRequest::new("")).await.unwrap().len(), 3);
        assert_eq!(solver.calls(), 2);
    }

    #[tokio::test]
    async fn test_responder_sees_program() {
        let solver = InMemorySolver::from_fn(|request| {
            RawSolution::from_texts([format!("len({})", request.program.len())])
                .map(|s| vec![s])
                .map_err(|e| SolverError::MalformedOutput(e.to_string()))
        });
        let out = solver.solve(&SolveRequest::new("abc")).await.unwrap();
        assert_eq!(out[0].atoms[0].to_string(), "len(3)");
    }
}
