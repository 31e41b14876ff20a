use crate::{Error, Result};
use ksat_challenges::satisfiability::{Assignment, Formula};
use rand::{rngs::StdRng, SeedableRng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{from_value, Map, Value};
use std::{fmt, str::FromStr};

pub mod beam_search;
pub mod hill_climbing;
pub mod tracker;
pub mod vnd;

pub use tracker::{
    apply_flip, flip_delta, initial_counts, FlipDelta, OccurrenceIndex, ScoreTracker,
};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct RunStats {
    pub time_seconds: f64,
    /// Flip attempts for hill-climbing, rounds for beam search, accepted
    /// moves for VND.
    pub iterations: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub assignment: Assignment,
    pub score: usize,
    pub stats: RunStats,
}

pub(crate) fn parse_hyperparameters<T>(hyperparameters: &Option<Map<String, Value>>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    match hyperparameters {
        Some(map) => Ok(from_value(Value::Object(map.clone()))?),
        None => Ok(T::default()),
    }
}

pub(crate) fn ensure_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(Error::InvalidParameter(format!("{} must be positive", name)));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    HillClimbing,
    /// `beam_width` overrides the hyperparameter when the name carries one, as in `beam4`.
    BeamSearch { beam_width: Option<usize> },
    Vnd,
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "hc" | "hill_climbing" => Ok(Self::HillClimbing),
            "beam" | "beam_search" => Ok(Self::BeamSearch { beam_width: None }),
            "vnd" => Ok(Self::Vnd),
            _ => match name.strip_prefix("beam").map(usize::from_str) {
                Some(Ok(width)) => Ok(Self::BeamSearch {
                    beam_width: Some(width),
                }),
                _ => Err(Error::UnknownAlgorithm(name.to_string())),
            },
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HillClimbing => write!(f, "hc"),
            Self::BeamSearch { beam_width: None } => write!(f, "beam"),
            Self::BeamSearch {
                beam_width: Some(width),
            } => write!(f, "beam{}", width),
            Self::Vnd => write!(f, "vnd"),
        }
    }
}

impl Algorithm {
    pub fn solve(
        &self,
        formula: &Formula,
        seed: u64,
        hyperparameters: &Option<Map<String, Value>>,
    ) -> Result<SearchOutcome> {
        let mut rng = StdRng::seed_from_u64(seed);
        match *self {
            Self::HillClimbing => {
                let params = parse_hyperparameters::<hill_climbing::Hyperparameters>(hyperparameters)?;
                hill_climbing::search(formula, &params, &mut rng)
            }
            Self::BeamSearch { beam_width } => {
                let mut params = parse_hyperparameters::<beam_search::Hyperparameters>(hyperparameters)?;
                if let Some(width) = beam_width {
                    params.beam_width = width;
                }
                beam_search::search(formula, &params, &mut rng)
            }
            Self::Vnd => {
                let params = parse_hyperparameters::<vnd::Hyperparameters>(hyperparameters)?;
                vnd::search(formula, &params, &mut rng)
            }
        }
    }
}

/// Runs the named algorithm on `formula` with an RNG seeded from `seed`.
pub fn solve_challenge(
    formula: &Formula,
    algorithm: &str,
    seed: u64,
    hyperparameters: &Option<Map<String, Value>>,
) -> Result<SearchOutcome> {
    algorithm.parse::<Algorithm>()?.solve(formula, seed, hyperparameters)
}
