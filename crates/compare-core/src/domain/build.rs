//! Build identity and the per-build report handed to reconciliation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::failure_set::FailureSet;

/// A CI build: job name plus build number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildRef {
    /// Job name. A `/` separates folder segments (`team/nightly`).
    pub job: String,

    /// Build number within the job.
    pub number: u64,
}

impl BuildRef {
    pub fn new(job: impl Into<String>, number: u64) -> Self {
        Self {
            job: job.into(),
            number,
        }
    }
}

impl fmt::Display for BuildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.job, self.number)
    }
}

/// Descriptive metadata about a build, as reported by the CI server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildDetails {
    /// Browsable URL of the build.
    pub url: String,

    /// Free-text build description, if one was set.
    pub description: Option<String>,

    /// When the build started.
    pub timestamp: DateTime<Utc>,

    /// Server-side build result (`SUCCESS`, `UNSTABLE`, ...), if finished.
    pub result: Option<String>,
}

/// One side of a comparison: a build and the names of its failing tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub build: BuildRef,
    pub failures: FailureSet,
    pub details: Option<BuildDetails>,
}

impl BuildReport {
    pub fn new(build: BuildRef, failures: FailureSet) -> Self {
        Self {
            build,
            failures,
            details: None,
        }
    }

    pub fn with_details(mut self, details: BuildDetails) -> Self {
        self.details = Some(details);
        self
    }
}
