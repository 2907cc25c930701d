//! jenkins-source: build result acquisition for jenkins-compare
//!
//! Turns a (job, build number) pair into the set of failing test names:
//! - `config`: credentials and job names from flags, environment, and the
//!   `.jenkins_compare_tool` YAML file
//! - `client`: Jenkins JSON API client and artifact download
//! - `junit`: JUnit XML parsing
//! - `source`: the `BuildSource` seam and the concurrent two-build pipeline

pub mod client;
pub mod config;
pub mod error;
pub mod fakes;
pub mod junit;
pub mod source;

pub use client::{ArtifactInfo, BuildInfo, JenkinsClient};
pub use config::{
    CompareConfig, ConfigFile, JenkinsCredentials, Overrides, CONFIG_FILE_NAME,
    DEFAULT_ARTIFACT_PATH, DEFAULT_TIMEOUT_SECS,
};
pub use error::{AcquireError, ConfigError, JunitError};
pub use junit::{failing_names, parse_failures, parse_report, FailurePolicy, Outcome, TestOutcome};
pub use source::{compare_builds, fetch_pair, fetch_with_timeout, BuildSource, Comparison};

/// Result type for acquisition operations.
pub type Result<T> = std::result::Result<T, AcquireError>;
