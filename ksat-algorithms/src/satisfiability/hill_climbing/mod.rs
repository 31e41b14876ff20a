use super::{ensure_positive, OccurrenceIndex, RunStats, ScoreTracker, SearchOutcome};
use crate::{Error, Result};
use ksat_challenges::satisfiability::{Assignment, Formula};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Hyperparameters {
    pub max_iters: usize,
    pub restarts: usize,
    /// Accept zero-delta flips instead of stopping at a plateau.
    pub allow_sideways: bool,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            restarts: 10,
            allow_sideways: false,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("max_iters", self.max_iters)?;
        ensure_positive("restarts", self.restarts)
    }
}

/// Work done by one ascent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Climb {
    pub flips: u64,
    pub accepted: u64,
}

/// Steepest ascent from the tracker's current assignment. Every step scans all
/// variables, keeps the ones tied for the best make-break, and flips one of
/// them chosen uniformly. Stops at a local optimum, once every clause is
/// satisfied, or after `max_iters` steps. Accepted moves never lower the
/// score, so the tracker ends on the best assignment of the ascent.
pub fn climb<R: Rng + ?Sized>(
    tracker: &mut ScoreTracker,
    params: &Hyperparameters,
    rng: &mut R,
) -> Climb {
    let num_variables = tracker.assignment().num_variables();
    let mut climb = Climb::default();
    let mut tie_vars = Vec::with_capacity(num_variables);

    for _ in 0..params.max_iters {
        if tracker.is_satisfied() {
            break;
        }
        climb.flips += 1;

        let mut best_delta = i64::MIN;
        tie_vars.clear();
        for var in 1..=num_variables {
            let delta = tracker.flip_delta(var).net();
            if delta > best_delta {
                best_delta = delta;
                tie_vars.clear();
                tie_vars.push(var);
            } else if delta == best_delta {
                tie_vars.push(var);
            }
        }

        // Local optimum, or nothing to flip at all.
        if best_delta < 0 || (best_delta == 0 && !params.allow_sideways) {
            break;
        }
        let Some(&var) = tie_vars.choose(rng) else {
            break;
        };
        tracker.flip(var);
        climb.accepted += 1;
    }
    climb
}

/// Independent ascents from fresh random assignments, keeping the best one
/// seen across the whole run.
pub fn search<R: Rng + ?Sized>(
    formula: &Formula,
    params: &Hyperparameters,
    rng: &mut R,
) -> Result<SearchOutcome> {
    params.validate()?;
    let start = Instant::now();
    let num_variables = formula.num_variables();
    let num_clauses = formula.num_clauses();
    let index = OccurrenceIndex::build(formula);

    let mut best: Option<(usize, Assignment)> = None;
    let mut flips = 0u64;

    for restart in 0..params.restarts {
        let mut tracker =
            ScoreTracker::new(formula, &index, Assignment::random(num_variables, rng))?;
        let ascent = climb(&mut tracker, params, rng);
        flips += ascent.flips;
        debug!(
            restart,
            score = tracker.score(),
            accepted = ascent.accepted,
            "restart finished"
        );

        if best.as_ref().map_or(true, |(score, _)| tracker.score() > *score) {
            best = Some((tracker.score(), tracker.into_assignment()));
        }
        if best.as_ref().is_some_and(|(score, _)| *score == num_clauses) {
            break;
        }
    }

    let (score, assignment) =
        best.ok_or_else(|| Error::InvalidParameter("restarts must be positive".to_string()))?;
    let stats = RunStats {
        time_seconds: start.elapsed().as_secs_f64(),
        iterations: flips,
    };
    info!(score, num_clauses, flips, "hill-climbing finished");
    Ok(SearchOutcome {
        assignment,
        score,
        stats,
    })
}
