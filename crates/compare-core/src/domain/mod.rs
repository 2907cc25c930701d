//! Domain model: failure sets, builds, and contract errors.

pub mod build;
pub mod error;
pub mod failure_set;

pub use build::{BuildDetails, BuildRef, BuildReport};
pub use error::{ContractViolation, Result};
pub use failure_set::FailureSet;
