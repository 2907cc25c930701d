//! Failure-set reconciliation between a baseline and a candidate build.

use serde::{Deserialize, Serialize};

use crate::domain::FailureSet;

/// Outcome of comparing a candidate build's failures against a baseline.
///
/// `suppressed` and `new_failures` partition the candidate set exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Failing in both builds: known failures, not actionable.
    pub suppressed: FailureSet,

    /// Failing only in the candidate: new regressions.
    pub new_failures: FailureSet,

    /// Failing only in the baseline: no longer failing in the candidate.
    pub resolved: FailureSet,

    /// Number of baseline failures still failing in the candidate.
    pub carried_over_count: usize,
}

impl ReconciliationResult {
    pub fn has_regressions(&self) -> bool {
        !self.new_failures.is_empty()
    }

    pub fn new_count(&self) -> usize {
        self.new_failures.len()
    }

    pub fn suppressed_count(&self) -> usize {
        self.suppressed.len()
    }
}

/// Reconcile two failure sets.
///
/// `suppressed = baseline ∩ candidate`, `new_failures = candidate − baseline`,
/// `resolved = baseline − candidate`. Inputs are borrowed and left untouched.
pub fn reconcile(baseline: &FailureSet, candidate: &FailureSet) -> ReconciliationResult {
    let base = baseline.as_set();
    let cand = candidate.as_set();

    let suppressed = FailureSet::from_set(cand.intersection(base).cloned().collect());
    let new_failures = FailureSet::from_set(cand.difference(base).cloned().collect());
    let resolved = FailureSet::from_set(base.difference(cand).cloned().collect());

    ReconciliationResult {
        carried_over_count: suppressed.len(),
        suppressed,
        new_failures,
        resolved,
    }
}
