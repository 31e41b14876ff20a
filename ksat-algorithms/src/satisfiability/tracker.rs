use ksat_challenges::satisfiability::{Assignment, Formula};
use ksat_challenges::Error;

/// Clause indices each variable appears in, addressed by variable id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceIndex {
    occurrences: Vec<Vec<usize>>,
}

impl OccurrenceIndex {
    pub fn build(formula: &Formula) -> Self {
        let mut occurrences: Vec<Vec<usize>> = vec![Vec::new(); formula.num_variables()];
        for (i, clause) in formula.clauses().iter().enumerate() {
            for literal in clause.iter() {
                occurrences[literal.variable() - 1].push(i);
            }
        }
        Self { occurrences }
    }

    #[inline]
    pub fn clauses_of(&self, variable: usize) -> &[usize] {
        &self.occurrences[variable - 1]
    }

    pub fn num_variables(&self) -> usize {
        self.occurrences.len()
    }
}

/// Per-clause count of literals that are currently true.
pub fn initial_counts(formula: &Formula, assignment: &Assignment) -> Vec<u32> {
    formula
        .clauses()
        .iter()
        .map(|clause| clause.count_true(assignment) as u32)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlipDelta {
    /// Clauses going from unsatisfied to satisfied.
    pub make: usize,
    /// Clauses going from satisfied to unsatisfied.
    pub breaks: usize,
}

impl FlipDelta {
    #[inline]
    pub fn net(&self) -> i64 {
        self.make as i64 - self.breaks as i64
    }
}

/// Make/break of flipping `variable`, looking only at the clauses it occurs in.
/// Nothing is mutated.
pub fn flip_delta(
    variable: usize,
    formula: &Formula,
    assignment: &Assignment,
    counts: &[u32],
    index: &OccurrenceIndex,
) -> FlipDelta {
    let value = assignment.value(variable);
    let mut delta = FlipDelta::default();
    for &c in index.clauses_of(variable) {
        let Some(literal) = formula.clause(c).literal_of(variable) else {
            continue;
        };
        // The literal is true before the flip iff it is false after it.
        if literal.is_positive() == value {
            if counts[c] == 1 {
                delta.breaks += 1;
            }
        } else if counts[c] == 0 {
            delta.make += 1;
        }
    }
    delta
}

/// Flips `variable` and rescans exactly the clauses it occurs in.
/// Returns the change in the number of satisfied clauses.
pub fn apply_flip(
    variable: usize,
    formula: &Formula,
    assignment: &mut Assignment,
    counts: &mut [u32],
    index: &OccurrenceIndex,
) -> i64 {
    assignment.flip(variable);
    let mut net = 0;
    for &c in index.clauses_of(variable) {
        let was_satisfied = counts[c] > 0;
        counts[c] = formula.clause(c).count_true(assignment) as u32;
        net += (counts[c] > 0) as i64 - was_satisfied as i64;
    }
    net
}

/// An assignment together with its clause counts and score, kept consistent
/// across flips. Cloning yields an independent snapshot.
#[derive(Debug, Clone)]
pub struct ScoreTracker<'a> {
    formula: &'a Formula,
    index: &'a OccurrenceIndex,
    assignment: Assignment,
    counts: Vec<u32>,
    score: usize,
}

impl<'a> ScoreTracker<'a> {
    pub fn new(
        formula: &'a Formula,
        index: &'a OccurrenceIndex,
        assignment: Assignment,
    ) -> Result<Self, Error> {
        if assignment.num_variables() != formula.num_variables() {
            return Err(Error::AssignmentSize {
                expected: formula.num_variables(),
                actual: assignment.num_variables(),
            });
        }
        let counts = initial_counts(formula, &assignment);
        let score = counts.iter().filter(|&&count| count > 0).count();
        Ok(Self {
            formula,
            index,
            assignment,
            counts,
            score,
        })
    }

    #[inline]
    pub fn score(&self) -> usize {
        self.score
    }

    pub fn is_satisfied(&self) -> bool {
        self.score == self.formula.num_clauses()
    }

    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn into_assignment(self) -> Assignment {
        self.assignment
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    #[inline]
    pub fn flip_delta(&self, variable: usize) -> FlipDelta {
        flip_delta(
            variable,
            self.formula,
            &self.assignment,
            &self.counts,
            self.index,
        )
    }

    pub fn flip(&mut self, variable: usize) -> i64 {
        let net = apply_flip(
            variable,
            self.formula,
            &mut self.assignment,
            &mut self.counts,
            self.index,
        );
        self.score = (self.score as i64 + net) as usize;
        net
    }

    /// Score change of flipping all of `variables` together. The tracker is
    /// left exactly as it was.
    pub fn probe_flips(&mut self, variables: &[usize]) -> i64 {
        let net: i64 = variables.iter().map(|&v| self.flip(v)).sum();
        for &v in variables.iter().rev() {
            self.flip(v);
        }
        net
    }

    /// Rebuilds counts and score from scratch.
    pub fn recount(&mut self) -> usize {
        self.counts = initial_counts(self.formula, &self.assignment);
        self.score = self.counts.iter().filter(|&&count| count > 0).count();
        self.score
    }
}
