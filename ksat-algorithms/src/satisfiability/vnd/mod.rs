use super::{ensure_positive, OccurrenceIndex, RunStats, ScoreTracker, SearchOutcome};
use crate::Result;
use ksat_challenges::satisfiability::{Assignment, Formula};
use rand::{seq::index, Rng};
use serde::{Deserialize, Serialize};
use std::{fmt, time::Instant};
use tracing::{debug, info};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Hyperparameters {
    pub max_iters: usize,
    /// Upper bound on distinct pairs tried per N2 pass.
    pub sample_pairs: usize,
    /// Upper bound on distinct triples tried per N3 pass.
    pub sample_triples: usize,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            sample_pairs: 200,
            sample_triples: 500,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        ensure_positive("max_iters", self.max_iters)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighbourhood {
    SingleFlip,
    PairFlip,
    TripleFlip,
}

impl Neighbourhood {
    /// Escalation order, cheapest first.
    pub const ORDER: [Neighbourhood; 3] = [Self::SingleFlip, Self::PairFlip, Self::TripleFlip];

    pub fn move_size(self) -> usize {
        match self {
            Self::SingleFlip => 1,
            Self::PairFlip => 2,
            Self::TripleFlip => 3,
        }
    }
}

impl fmt::Display for Neighbourhood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleFlip => write!(f, "N1"),
            Self::PairFlip => write!(f, "N2"),
            Self::TripleFlip => write!(f, "N3"),
        }
    }
}

/// An improving move: the variables to flip together and the score gain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    pub variables: Vec<usize>,
    pub delta: i64,
}

/// Variable neighbourhood descent from a random assignment. N1 is scanned
/// exhaustively; N2 and N3 try a bounded random sample of distinct pairs and
/// triples. After any accepted move the search goes back to N1; the run ends
/// when none of the three neighbourhoods improves.
pub fn search<R: Rng + ?Sized>(
    formula: &Formula,
    params: &Hyperparameters,
    rng: &mut R,
) -> Result<SearchOutcome> {
    params.validate()?;
    let start = Instant::now();
    let index = OccurrenceIndex::build(formula);
    let mut tracker = ScoreTracker::new(
        formula,
        &index,
        Assignment::random(formula.num_variables(), rng),
    )?;
    let moves = descend(&mut tracker, params, rng);

    let score = tracker.score();
    info!(
        score,
        num_clauses = formula.num_clauses(),
        moves,
        "vnd finished"
    );
    Ok(SearchOutcome {
        assignment: tracker.into_assignment(),
        score,
        stats: RunStats {
            time_seconds: start.elapsed().as_secs_f64(),
            iterations: moves,
        },
    })
}

/// Runs the descent on `tracker` in place and returns the number of accepted moves.
pub fn descend<R: Rng + ?Sized>(
    tracker: &mut ScoreTracker,
    params: &Hyperparameters,
    rng: &mut R,
) -> u64 {
    let mut moves = 0u64;
    while moves < params.max_iters as u64 && !tracker.is_satisfied() {
        let Some((neighbourhood, accepted)) = Neighbourhood::ORDER
            .into_iter()
            .find_map(|hood| best_move(tracker, hood, params, rng).map(|mv| (hood, mv)))
        else {
            break;
        };

        for &var in &accepted.variables {
            tracker.flip(var);
        }
        moves += 1;
        debug!(
            %neighbourhood,
            variables = ?accepted.variables,
            delta = accepted.delta,
            score = tracker.score(),
            "move accepted"
        );
    }
    moves
}

/// Best strictly improving move of `neighbourhood`, first found among equals.
pub fn best_move<R: Rng + ?Sized>(
    tracker: &mut ScoreTracker,
    neighbourhood: Neighbourhood,
    params: &Hyperparameters,
    rng: &mut R,
) -> Option<Move> {
    let num_variables = tracker.assignment().num_variables();
    match neighbourhood {
        Neighbourhood::SingleFlip => {
            let mut best: Option<Move> = None;
            for var in 1..=num_variables {
                let delta = tracker.flip_delta(var).net();
                if delta > best.as_ref().map_or(0, |mv| mv.delta) {
                    best = Some(Move {
                        variables: vec![var],
                        delta,
                    });
                }
            }
            best
        }
        Neighbourhood::PairFlip => sampled_move(tracker, 2, params.sample_pairs, rng),
        Neighbourhood::TripleFlip => sampled_move(tracker, 3, params.sample_triples, rng),
    }
}

/// Tries up to `sample` distinct `size`-subsets of the variables, drawn
/// without replacement. Nothing is tried when fewer than `size` variables exist.
fn sampled_move<R: Rng + ?Sized>(
    tracker: &mut ScoreTracker,
    size: usize,
    sample: usize,
    rng: &mut R,
) -> Option<Move> {
    let num_variables = tracker.assignment().num_variables();
    let total = binomial(num_variables, size);
    let amount = sample.min(total);
    if amount == 0 {
        return None;
    }

    let mut best: Option<Move> = None;
    for rank in index::sample(rng, total, amount) {
        let variables = unrank_combination(rank, size, num_variables);
        let delta = tracker.probe_flips(&variables);
        if delta > best.as_ref().map_or(0, |mv| mv.delta) {
            best = Some(Move { variables, delta });
        }
    }
    best
}

/// `C(n, k)`, saturating at `usize::MAX`.
pub fn binomial(n: usize, k: usize) -> usize {
    if k > n {
        return 0;
    }
    let mut acc: u128 = 1;
    for i in 0..k {
        acc = acc.saturating_mul((n - i) as u128) / (i + 1) as u128;
    }
    usize::try_from(acc).unwrap_or(usize::MAX)
}

/// The `rank`-th `size`-subset of `1..=n` in colexicographic order, largest
/// variable first.
pub fn unrank_combination(mut rank: usize, size: usize, n: usize) -> Vec<usize> {
    let mut variables = Vec::with_capacity(size);
    let mut upper = n;
    for j in (1..=size).rev() {
        // Largest c < upper with C(c, j) <= rank.
        let (mut lo, mut hi) = (j - 1, upper - 1);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if binomial(mid, j) <= rank {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        rank -= binomial(lo, j);
        variables.push(lo + 1);
        upper = lo;
    }
    variables
}
