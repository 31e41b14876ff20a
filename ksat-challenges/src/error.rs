use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Generator parameters that cannot describe a k-SAT instance.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("malformed formula: {0}")]
    MalformedFormula(String),

    #[error("invalid number of variables. Expected: {expected}, Actual: {actual}")]
    AssignmentSize { expected: usize, actual: usize },

    #[error("clause '{clause}' not satisfied")]
    Unsatisfied { clause: usize },
}
