//! jenkins-compare core library
//!
//! Reconciles the failing tests of a baseline (nightly) build with those of a
//! candidate (feature) build, and renders the outcome. Nothing in here
//! performs I/O; acquiring the failure sets is the job of `jenkins-source`.

pub mod domain;
pub mod metadata;
pub mod obs;
pub mod reconcile;
pub mod report;
pub mod telemetry;

pub use domain::{BuildDetails, BuildRef, BuildReport, ContractViolation, FailureSet};
pub use metadata::{build_locator, encode_path_segment, format_build_metadata, job_path};
pub use obs::{
    compare_span, emit_acquire_failed, emit_build_fetched, emit_reconciled, CompareSpan,
};
pub use reconcile::{reconcile, ReconciliationResult};
pub use report::{render_failures, render_text, BuildSummary, ComparisonReport, OutputMode};
pub use telemetry::init_tracing;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
