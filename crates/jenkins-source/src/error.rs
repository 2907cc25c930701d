//! Error types for jenkins-source

use thiserror::Error;

/// Errors raised while acquiring a build's failing tests.
///
/// Every variant that concerns a specific build names the job and build
/// number, so a failed run can be diagnosed without re-running it.
#[derive(Error, Debug)]
pub enum AcquireError {
    /// No credentials were supplied for the server
    #[error("Jenkins credentials missing: {0}")]
    CredentialsMissing(String),

    /// Server rejected the credentials
    #[error("Jenkins rejected credentials for {job} #{build} (HTTP {status})")]
    Unauthorized { job: String, build: u64, status: u16 },

    /// Job does not exist
    #[error("Job not found: {job}")]
    JobNotFound { job: String },

    /// Job exists but the build does not
    #[error("Build not found: {job} #{build}")]
    BuildNotFound { job: String, build: u64 },

    /// Build has no artifact at the expected path
    #[error("Artifact '{path}' missing from {job} #{build} (available: {available})")]
    ArtifactMissing {
        job: String,
        build: u64,
        path: String,
        available: String,
    },

    /// Artifact was downloaded but is not a usable JUnit report
    #[error("Test report of {job} #{build} is unparsable: {reason}")]
    ReportUnparsable {
        job: String,
        build: u64,
        reason: String,
    },

    /// Acquisition did not finish in time
    #[error("Timed out after {secs}s fetching {job} #{build}")]
    Timeout { job: String, build: u64, secs: u64 },

    /// Server answered with something other than the expected JSON
    #[error("Invalid response for {job} #{build}: {reason}")]
    InvalidResponse {
        job: String,
        build: u64,
        reason: String,
    },

    /// Transport or unexpected HTTP status
    #[error("HTTP error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for AcquireError {
    fn from(err: reqwest::Error) -> Self {
        AcquireError::Http(err.to_string())
    }
}

/// Errors raised while parsing a JUnit XML document.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum JunitError {
    /// Malformed XML
    #[error("XML error at byte {position}: {message}")]
    Xml { position: usize, message: String },

    /// Well-formed XML whose root is not a JUnit element
    #[error("expected <testsuites> or <testsuite> root element, found <{0}>")]
    UnexpectedRoot(String),

    /// Document has no root element at all
    #[error("document contains no root element")]
    Empty,

    /// Document ends before every element is closed
    #[error("document truncated at byte {position}: {open} element(s) still open")]
    Truncated { position: usize, open: usize },

    /// A <testcase> without a name attribute
    #[error("<testcase> at byte {position} has no name attribute")]
    MissingName { position: usize },
}

/// Errors raised while resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required value absent from flags, environment, and config files
    #[error("missing configuration key '{key}' (set {hint} or add '{key}' to the config file)")]
    MissingKey { key: &'static str, hint: &'static str },

    /// Config file exists but is not valid YAML of the expected shape
    #[error("failed to parse config file {path}: {reason}")]
    Parse { path: String, reason: String },

    /// Config file exists but could not be read
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Host is not an http(s) URL
    #[error("invalid Jenkins host '{0}': expected an http:// or https:// URL")]
    InvalidHost(String),
}
