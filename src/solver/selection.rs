//! Model selection applied to every backend's output.

use rand::rngs::StdRng;
use rand::{seq::index, SeedableRng};

use super::SolveRequest;
use crate::types::RawSolution;

/// Filter and limit solutions according to the request.
///
/// Optimal-only requests keep the optimal solutions and truncate; sampling is
/// not applied on that path. Otherwise solutions are sampled or truncated
/// down to `max_models`.
pub fn select(request: &SolveRequest, solutions: Vec<RawSolution>) -> Vec<RawSolution> {
    if request.optimals_only {
        let mut optimal = retain_optimal(solutions);
        truncate(&mut optimal, request.max_models);
        return optimal;
    }
    if request.sampling {
        sample(solutions, request.max_models, request.sampling_seed)
    } else {
        let mut solutions = solutions;
        truncate(&mut solutions, request.max_models);
        solutions
    }
}

/// Keep the solutions whose cost vector equals the lexicographic minimum.
pub fn retain_optimal(solutions: Vec<RawSolution>) -> Vec<RawSolution> {
    let Some(best) = solutions.iter().map(|s| s.costs.clone()).min() else {
        return solutions;
    };
    solutions.into_iter().filter(|s| s.costs == best).collect()
}

/// Uniform sample of `max` solutions without replacement, in engine order.
///
/// `max == 0` or fewer solutions than `max` keeps everything.
pub fn sample(solutions: Vec<RawSolution>, max: usize, seed: Option<u64>) -> Vec<RawSolution> {
    if max == 0 || solutions.len() <= max {
        return solutions;
    }
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut picked = index::sample(&mut rng, solutions.len(), max).into_vec();
    picked.sort_unstable();
    let mut picked = picked.into_iter().peekable();
    solutions
        .into_iter()
        .enumerate()
        .filter_map(|(i, solution)| {
            if picked.peek() == Some(&i) {
                picked.next();
                Some(solution)
            } else {
                None
            }
        })
        .collect()
}

fn truncate(solutions: &mut Vec<RawSolution>, max: usize) {
    if max > 0 {
        solutions.truncate(max);
    }
}
