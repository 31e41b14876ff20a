use crate::{Error, Result};
use ndarray::{Array2, Axis};
use rand::{
    distributions::{Distribution, Uniform},
    rngs::{SmallRng, StdRng},
    seq::index,
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt, str::FromStr};

mod assignment;
pub use assignment::Assignment;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Difficulty {
    pub clause_size: usize,
    pub num_variables: usize,
    pub num_clauses: usize,
}

impl Difficulty {
    pub fn new(clause_size: usize, num_variables: usize, num_clauses: usize) -> Self {
        Self {
            clause_size,
            num_variables,
            num_clauses,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.clause_size == 0 {
            return Err(Error::InvalidParameter(
                "k (clause length) must be a positive integer".to_string(),
            ));
        }
        if self.num_variables == 0 {
            return Err(Error::InvalidParameter(
                "n (number of variables) must be a positive integer".to_string(),
            ));
        }
        if self.clause_size > self.num_variables {
            return Err(Error::InvalidParameter(format!(
                "k (clause length) cannot be greater than n (number of variables). k: {}, n: {}",
                self.clause_size, self.num_variables
            )));
        }
        if self.num_variables > i32::MAX as usize {
            return Err(Error::InvalidParameter(format!(
                "n (number of variables) must not exceed {}",
                i32::MAX
            )));
        }
        Ok(())
    }
}

/// Signed inputs `[k, n, m]`, as handed over by command lines and JSON settings.
impl TryFrom<Vec<i64>> for Difficulty {
    type Error = Error;

    fn try_from(arr: Vec<i64>) -> Result<Self> {
        let [k, n, m]: [i64; 3] = arr.try_into().map_err(|arr: Vec<i64>| {
            Error::InvalidParameter(format!("expected [k, n, m], got {} values", arr.len()))
        })?;
        if k <= 0 || n <= 0 || m < 0 {
            return Err(Error::InvalidParameter(
                "k and n must be positive integers; m must be non-negative".to_string(),
            ));
        }
        let difficulty = Self::new(k as usize, n as usize, m as usize);
        difficulty.validate()?;
        Ok(difficulty)
    }
}

impl From<Difficulty> for Vec<i64> {
    fn from(difficulty: Difficulty) -> Self {
        vec![
            difficulty.clause_size as i64,
            difficulty.num_variables as i64,
            difficulty.num_clauses as i64,
        ]
    }
}

/// A variable id in `1..=n` carrying a polarity in its sign.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Literal(i32);

impl Literal {
    pub fn new(variable: usize, positive: bool) -> Self {
        let v = variable as i32;
        Self(if positive { v } else { -v })
    }

    pub fn from_dimacs(value: i32) -> Self {
        Self(value)
    }

    #[inline]
    pub fn variable(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn complement(self) -> Self {
        Self(-self.0)
    }

    #[inline]
    pub fn is_true_under(self, assignment: &Assignment) -> bool {
        assignment.value(self.variable()) == self.is_positive()
    }

    pub fn to_i32(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Clause(Vec<Literal>);

impl Clause {
    pub fn literals(&self) -> &[Literal] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Literal> + '_ {
        self.0.iter().copied()
    }

    /// Number of literals evaluating to true.
    #[inline]
    pub fn count_true(&self, assignment: &Assignment) -> usize {
        self.0
            .iter()
            .filter(|literal| literal.is_true_under(assignment))
            .count()
    }

    pub fn is_satisfied_by(&self, assignment: &Assignment) -> bool {
        self.0
            .iter()
            .any(|literal| literal.is_true_under(assignment))
    }

    /// The literal over `variable`, if the clause mentions it.
    pub fn literal_of(&self, variable: usize) -> Option<Literal> {
        self.0
            .iter()
            .copied()
            .find(|literal| literal.variable() == variable)
    }
}

impl FromIterator<Literal> for Clause {
    fn from_iter<I: IntoIterator<Item = Literal>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<i32>> for Clause {
    fn from(literals: Vec<i32>) -> Self {
        literals.into_iter().map(Literal::from_dimacs).collect()
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, literal) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", literal)?;
        }
        write!(f, "]")
    }
}

#[derive(Deserialize)]
struct FormulaData {
    num_variables: usize,
    clauses: Vec<Clause>,
}

impl TryFrom<FormulaData> for Formula {
    type Error = Error;

    fn try_from(data: FormulaData) -> Result<Self> {
        Formula::new(data.num_variables, data.clauses)
    }
}

/// An immutable k-SAT instance over variables `1..=num_variables`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(try_from = "FormulaData")]
pub struct Formula {
    num_variables: usize,
    clauses: Vec<Clause>,
}

impl Formula {
    /// Builds a formula from hand-written clauses, rejecting anything the
    /// generator could not have produced.
    pub fn new(num_variables: usize, clauses: Vec<Clause>) -> Result<Self> {
        if num_variables > i32::MAX as usize {
            return Err(Error::MalformedFormula(format!(
                "{} variables do not fit a signed literal, at most {} are allowed",
                num_variables,
                i32::MAX
            )));
        }
        let clause_size = clauses.first().map(Clause::len);
        for (idx, clause) in clauses.iter().enumerate() {
            if clause.is_empty() {
                return Err(Error::MalformedFormula(format!("clause '{}' is empty", idx)));
            }
            if Some(clause.len()) != clause_size {
                return Err(Error::MalformedFormula(format!(
                    "clause '{}' has {} literals, expected {}",
                    idx,
                    clause.len(),
                    clause_size.unwrap_or_default()
                )));
            }
            let mut seen = HashSet::with_capacity(clause.len());
            for literal in clause.iter() {
                let var = literal.variable();
                if var == 0 || var > num_variables {
                    return Err(Error::MalformedFormula(format!(
                        "clause '{}' has literal {} outside [1, {}]",
                        idx, literal, num_variables
                    )));
                }
                if !seen.insert(var) {
                    return Err(Error::MalformedFormula(format!(
                        "clause '{}' repeats variable {}",
                        idx, var
                    )));
                }
            }
        }
        Ok(Self {
            num_variables,
            clauses,
        })
    }

    /// Uniform random k-SAT: each clause draws k distinct variables without
    /// replacement and negates each one with probability 1/2.
    pub fn generate_instance(seed: u64, difficulty: &Difficulty) -> Result<Self> {
        difficulty.validate()?;
        let Difficulty {
            clause_size: k,
            num_variables: n,
            num_clauses: m,
        } = *difficulty;
        let mut rng = SmallRng::from_seed(StdRng::seed_from_u64(seed).gen());

        // Row i holds the k distinct variables of clause i.
        let mut chosen = Vec::with_capacity(m * k);
        for _ in 0..m {
            chosen.extend(
                index::sample(&mut rng, n, k)
                    .into_iter()
                    .map(|idx| idx as i32 + 1),
            );
        }
        let variables = Array2::from_shape_vec((m, k), chosen)
            .map_err(|e| Error::InvalidParameter(e.to_string()))?;

        // One fair sign per literal, in row-major order.
        let signs = Uniform::new(0, 2)
            .sample_iter(&mut rng)
            .take(m * k)
            .map(|bit: i32| 2 * bit - 1)
            .collect::<Vec<i32>>();
        let literals = variables
            * Array2::from_shape_vec((m, k), signs)
                .map_err(|e| Error::InvalidParameter(e.to_string()))?;

        let clauses = literals
            .axis_iter(Axis(0))
            .map(|row| row.iter().copied().map(Literal::from_dimacs).collect())
            .collect();

        Ok(Self {
            num_variables: n,
            clauses,
        })
    }

    /// Parses the `[1,-2,3] [-1,2,4]` text form. Every clause must be a closed
    /// `[...]` group and every literal a non-empty integer; only whitespace may
    /// separate clauses.
    pub fn parse(num_variables: usize, text: &str) -> Result<Self> {
        let mut clauses = Vec::new();
        let mut rest = text.trim_start();
        while !rest.is_empty() {
            let idx = clauses.len();
            let body = rest.strip_prefix('[').ok_or_else(|| {
                Error::MalformedFormula(format!(
                    "expected '[' to open clause '{}' at '{}'",
                    idx, rest
                ))
            })?;
            let (inner, tail) = body.split_once(']').ok_or_else(|| {
                Error::MalformedFormula(format!("clause '{}' is missing its closing ']'", idx))
            })?;
            let clause = inner
                .split(',')
                .map(str::trim)
                .map(|token| {
                    if token.is_empty() {
                        return Err(Error::MalformedFormula(format!(
                            "clause '{}' has an empty literal",
                            idx
                        )));
                    }
                    i32::from_str(token)
                        .map(Literal::from_dimacs)
                        .map_err(|e| Error::MalformedFormula(format!("literal '{}': {}", token, e)))
                })
                .collect::<Result<Clause>>()?;
            clauses.push(clause);
            rest = tail.trim_start();
        }
        Self::new(num_variables, clauses)
    }

    pub fn num_variables(&self) -> usize {
        self.num_variables
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    /// `None` for a formula without clauses.
    pub fn clause_size(&self) -> Option<usize> {
        self.clauses.first().map(Clause::len)
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn clause(&self, idx: usize) -> &Clause {
        &self.clauses[idx]
    }

    fn check_size(&self, assignment: &Assignment) -> Result<()> {
        if assignment.num_variables() != self.num_variables {
            return Err(Error::AssignmentSize {
                expected: self.num_variables,
                actual: assignment.num_variables(),
            });
        }
        Ok(())
    }

    /// Number of satisfied clauses, by full recount.
    pub fn evaluate(&self, assignment: &Assignment) -> Result<usize> {
        self.check_size(assignment)?;
        Ok(self
            .clauses
            .iter()
            .filter(|clause| clause.is_satisfied_by(assignment))
            .count())
    }

    pub fn verify_assignment(&self, assignment: &Assignment) -> Result<()> {
        self.check_size(assignment)?;
        match self
            .clauses
            .iter()
            .position(|clause| !clause.is_satisfied_by(assignment))
        {
            Some(clause) => Err(Error::Unsatisfied { clause }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", clause)?;
        }
        Ok(())
    }
}
