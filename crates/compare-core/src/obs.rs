//! Structured log events for the comparison lifecycle.
//!
//! Each event carries an `event = "..."` field so log pipelines can filter on
//! it. Reconciliation itself never logs; callers emit these around it.

use tracing::{info, warn};

use crate::domain::BuildRef;
use crate::reconcile::ReconciliationResult;

/// Span tagged with both builds; use with `Instrument` in async code.
pub fn compare_span(baseline: &BuildRef, candidate: &BuildRef) -> tracing::Span {
    tracing::info_span!(
        "compare",
        baseline = %baseline,
        candidate = %candidate,
    )
}

/// RAII guard for a comparison-scoped span in synchronous code.
pub struct CompareSpan {
    _span: tracing::span::EnteredSpan,
}

impl CompareSpan {
    /// Enter a span tagged with both builds.
    pub fn enter(baseline: &BuildRef, candidate: &BuildRef) -> Self {
        Self {
            _span: compare_span(baseline, candidate).entered(),
        }
    }
}

/// Emit event: a build's failing tests were acquired.
pub fn emit_build_fetched(build: &BuildRef, failure_count: usize, duration_ms: u64) {
    info!(
        event = "build.fetched",
        job = %build.job,
        build = build.number,
        failures = failure_count,
        duration_ms = duration_ms,
    );
}

/// Emit event: acquisition of a build failed.
pub fn emit_acquire_failed(build: &BuildRef, error: &dyn std::fmt::Display) {
    warn!(
        event = "build.acquire_failed",
        job = %build.job,
        build = build.number,
        error = %error,
    );
}

/// Emit event: reconciliation finished.
pub fn emit_reconciled(result: &ReconciliationResult) {
    info!(
        event = "compare.reconciled",
        new_failures = result.new_count(),
        suppressed = result.suppressed_count(),
        resolved = result.resolved.len(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_span_enter() {
        let _span = CompareSpan::enter(&BuildRef::new("nightly", 1), &BuildRef::new("feature", 2));
    }
}
