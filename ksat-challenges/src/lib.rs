mod error;
pub use error::*;

pub mod satisfiability;
