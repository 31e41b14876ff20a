use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid hyperparameters: {0}")]
    Hyperparameters(#[from] serde_json::Error),

    #[error(transparent)]
    Formula(#[from] ksat_challenges::Error),
}
