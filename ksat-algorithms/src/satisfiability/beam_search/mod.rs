use super::{ensure_positive, OccurrenceIndex, RunStats, ScoreTracker, SearchOutcome};
use crate::{seeded_hasher, Error, HashSet, Result};
use ahash::RandomState;
use ksat_challenges::satisfiability::{Assignment, Formula};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Hyperparameters {
    pub beam_width: usize,
    pub max_iters: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            beam_width: 3,
            max_iters: 1000,
        }
    }
}

/// Widest beam accepted, unless the requested width covers every assignment
/// of a small formula and the space is no larger than this either.
pub const MAX_BEAM_WIDTH: usize = 1 << 16;

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("beam_width", self.beam_width)?;
        ensure_positive("max_iters", self.max_iters)
    }
}

/// A single-flip neighbour of a beam member, not yet materialised.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: usize,
    parent: usize,
    variable: usize,
}

/// Up to `width` distinct assignments, each owning its own snapshot, sorted
/// best first.
#[derive(Clone)]
pub struct Beam<'a> {
    members: Vec<ScoreTracker<'a>>,
    width: usize,
    hasher: RandomState,
}

impl<'a> Beam<'a> {
    /// `width` pairwise distinct random assignments. When the whole space
    /// holds no more than `width` assignments it is enumerated instead, so
    /// the beam is shorter than requested and sampling never spins. Widths
    /// above [`MAX_BEAM_WIDTH`] that would have to be sampled are rejected.
    pub fn new<R: Rng + ?Sized>(
        formula: &'a Formula,
        index: &'a OccurrenceIndex,
        width: usize,
        rng: &mut R,
    ) -> Result<Self> {
        ensure_positive("beam_width", width)?;
        let hasher = seeded_hasher(rng);
        let num_variables = formula.num_variables();
        let space = u32::try_from(num_variables)
            .ok()
            .and_then(|n| 1usize.checked_shl(n));

        let assignments: Vec<Assignment> = match space {
            Some(space) if space <= width && space <= MAX_BEAM_WIDTH => (0..space)
                .map(|bits| {
                    Assignment::new((0..num_variables).map(|i| (bits >> i) & 1 == 1).collect())
                })
                .collect(),
            _ if width > MAX_BEAM_WIDTH => {
                return Err(Error::InvalidParameter(format!(
                    "beam_width must not exceed {} for {} variables, got {}",
                    MAX_BEAM_WIDTH, num_variables, width
                )));
            }
            _ => {
                let mut seen: HashSet<Assignment> =
                    HashSet::with_capacity_and_hasher(width, hasher.clone());
                let mut assignments = Vec::with_capacity(width);
                while assignments.len() < width {
                    let assignment = Assignment::random(num_variables, rng);
                    if seen.insert(assignment.clone()) {
                        assignments.push(assignment);
                    }
                }
                assignments
            }
        };

        let mut members = assignments
            .into_iter()
            .map(|assignment| ScoreTracker::new(formula, index, assignment).map_err(Error::from))
            .collect::<Result<Vec<_>>>()?;
        members.sort_by(|a, b| b.score().cmp(&a.score()));
        Ok(Self {
            members,
            width,
            hasher,
        })
    }

    pub fn members(&self) -> &[ScoreTracker<'a>] {
        &self.members
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// First member satisfying every clause.
    pub fn satisfied(&self) -> Option<&ScoreTracker<'a>> {
        self.members.iter().find(|member| member.is_satisfied())
    }

    /// Replaces the beam by the best distinct single-flip neighbours of its
    /// members. Candidates reachable from two members count once; score ties
    /// keep generation order. Returns false, leaving the beam untouched, when
    /// there is no neighbour at all.
    pub fn step(&mut self) -> bool {
        let num_variables = self
            .members
            .first()
            .map_or(0, |member| member.assignment().num_variables());
        let mut seen: HashSet<Assignment> = HashSet::with_capacity_and_hasher(
            self.members.len() * num_variables,
            self.hasher.clone(),
        );
        let mut candidates = Vec::with_capacity(self.members.len() * num_variables);
        for (parent, member) in self.members.iter().enumerate() {
            for variable in 1..=num_variables {
                if !seen.insert(member.assignment().flipped(variable)) {
                    continue;
                }
                let score = (member.score() as i64 + member.flip_delta(variable).net()) as usize;
                candidates.push(Candidate {
                    score,
                    parent,
                    variable,
                });
            }
        }
        if candidates.is_empty() {
            return false;
        }

        // Stable, so equal scores stay in generation order.
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        let members = candidates
            .iter()
            .take(self.width)
            .map(|candidate| {
                let mut member = self.members[candidate.parent].clone();
                member.flip(candidate.variable);
                member
            })
            .collect();
        self.members = members;
        true
    }

    /// The satisfying member if there is one, else the highest scoring.
    pub fn into_best(mut self) -> Option<ScoreTracker<'a>> {
        match self.members.iter().position(|member| member.is_satisfied()) {
            Some(pos) => Some(self.members.swap_remove(pos)),
            None => self.members.into_iter().next(),
        }
    }
}

/// Beam search over complete assignments. Stops as soon as a member satisfies
/// the formula, otherwise after `max_iters` rounds, and returns the best
/// member of the final beam.
pub fn search<R: Rng + ?Sized>(
    formula: &Formula,
    params: &Hyperparameters,
    rng: &mut R,
) -> Result<SearchOutcome> {
    params.validate()?;
    let start = Instant::now();
    let index = OccurrenceIndex::build(formula);
    let mut beam = Beam::new(formula, &index, params.beam_width, rng)?;
    let mut rounds = 0u64;

    while rounds < params.max_iters as u64 && beam.satisfied().is_none() {
        if !beam.step() {
            break;
        }
        rounds += 1;
        debug!(
            round = rounds,
            best = beam.members()[0].score(),
            width = beam.members().len(),
            "beam round"
        );
    }

    let best = beam
        .into_best()
        .ok_or_else(|| Error::InvalidParameter("beam is empty".to_string()))?;
    let score = best.score();
    info!(
        score,
        num_clauses = formula.num_clauses(),
        rounds,
        "beam search finished"
    );
    Ok(SearchOutcome {
        assignment: best.into_assignment(),
        score,
        stats: RunStats {
            time_seconds: start.elapsed().as_secs_f64(),
            iterations: rounds,
        },
    })
}
