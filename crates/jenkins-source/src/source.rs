//! Build sources and the two-build comparison pipeline.

use async_trait::async_trait;
use compare_core::{
    compare_span, emit_acquire_failed, emit_reconciled, reconcile, BuildRef, BuildReport,
    ComparisonReport, ReconciliationResult,
};
use std::time::Duration;
use tracing::Instrument;

use crate::error::AcquireError;
use crate::Result;

/// Anything that can produce the failing tests of a build.
///
/// Implementations must fail with a named [`AcquireError`] rather than
/// returning an empty report when something goes wrong.
#[async_trait]
pub trait BuildSource: Send + Sync {
    async fn fetch_build(&self, build: &BuildRef) -> Result<BuildReport>;
}

/// Both sides of a finished comparison.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub baseline: BuildReport,
    pub candidate: BuildReport,
    pub result: ReconciliationResult,
}

impl Comparison {
    pub fn into_report(self) -> ComparisonReport {
        ComparisonReport::new(&self.baseline, &self.candidate, self.result)
    }
}

/// Fetch one build, failing with [`AcquireError::Timeout`] after `timeout`.
pub async fn fetch_with_timeout<S>(source: &S, build: &BuildRef, timeout: Duration) -> Result<BuildReport>
where
    S: BuildSource + ?Sized,
{
    let outcome = match tokio::time::timeout(timeout, source.fetch_build(build)).await {
        Ok(result) => result,
        Err(_) => Err(AcquireError::Timeout {
            job: build.job.clone(),
            build: build.number,
            secs: timeout.as_secs(),
        }),
    };

    if let Err(e) = &outcome {
        emit_acquire_failed(build, e);
    }
    outcome
}

/// Fetch the baseline and candidate concurrently, each with its own timeout.
///
/// Fails closed: if either fetch fails, no report is returned for either.
/// The first failure ends the pair and the other fetch is dropped.
pub async fn fetch_pair<S>(
    source: &S,
    baseline: &BuildRef,
    candidate: &BuildRef,
    timeout: Duration,
) -> Result<(BuildReport, BuildReport)>
where
    S: BuildSource + ?Sized,
{
    tokio::try_join!(
        fetch_with_timeout(source, baseline, timeout),
        fetch_with_timeout(source, candidate, timeout),
    )
}

/// Fetch both builds and reconcile their failures.
pub async fn compare_builds<S>(
    source: &S,
    baseline: &BuildRef,
    candidate: &BuildRef,
    timeout: Duration,
) -> Result<Comparison>
where
    S: BuildSource + ?Sized,
{
    async {
        let (baseline_report, candidate_report) =
            fetch_pair(source, baseline, candidate, timeout).await?;

        let result = reconcile(&baseline_report.failures, &candidate_report.failures);
        emit_reconciled(&result);

        Ok(Comparison {
            baseline: baseline_report,
            candidate: candidate_report,
            result,
        })
    }
    .instrument(compare_span(baseline, candidate))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryBuildSource;
    use compare_core::FailureSet;

    fn report(job: &str, number: u64, names: &[&str]) -> BuildReport {
        BuildReport::new(
            BuildRef::new(job, number),
            names.iter().copied().collect::<FailureSet>(),
        )
    }

    #[tokio::test]
    async fn test_compare_builds_reconciles() {
        let source = MemoryBuildSource::new();
        source.insert(report("nightly", 1, &["test_alpha", "test_beta"]));
        source.insert(report("feature", 2, &["test_beta", "test_gamma"]));

        let comparison = compare_builds(
            &source,
            &BuildRef::new("nightly", 1),
            &BuildRef::new("feature", 2),
            Duration::from_secs(5),
        )
        .await
        .expect("compare failed");

        assert_eq!(comparison.result.new_failures.to_vec(), vec!["test_gamma"]);
        assert_eq!(comparison.result.suppressed.to_vec(), vec!["test_beta"]);
        assert_eq!(source.fetch_count(), 2);

        let report = comparison.into_report();
        assert_eq!(report.baseline.failure_count, 2);
        assert!(report.has_regressions());
    }

    #[tokio::test]
    async fn test_missing_build_fails_closed() {
        let source = MemoryBuildSource::new();
        source.insert(report("nightly", 1, &["a"]));

        let err = compare_builds(
            &source,
            &BuildRef::new("nightly", 1),
            &BuildRef::new("feature", 99),
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            AcquireError::BuildNotFound { ref job, build: 99 } if job == "feature"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_build_times_out() {
        let source = MemoryBuildSource::new();
        source.insert(report("nightly", 1, &[]));
        source.insert_delayed(report("feature", 2, &["x"]), Duration::from_secs(120));

        let err = fetch_pair(
            &source,
            &BuildRef::new("nightly", 1),
            &BuildRef::new("feature", 2),
            Duration::from_secs(10),
        )
        .await
        .unwrap_err();

        match err {
            AcquireError::Timeout { job, build, secs } => {
                assert_eq!(job, "feature");
                assert_eq!(build, 2);
                assert_eq!(secs, 10);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_failure_does_not_wait_for_other_fetch() {
        let source = MemoryBuildSource::new();
        source.insert_delayed(report("nightly", 1, &["a"]), Duration::from_secs(50));

        let started = tokio::time::Instant::now();
        let err = fetch_pair(
            &source,
            &BuildRef::new("nightly", 1),
            &BuildRef::new("feature", 404),
            Duration::from_secs(60),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AcquireError::BuildNotFound { build: 404, .. }));
        assert!(started.elapsed() < Duration::from_secs(50));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_run_concurrently() {
        let source = MemoryBuildSource::new();
        source.insert_delayed(report("nightly", 1, &["a"]), Duration::from_secs(6));
        source.insert_delayed(report("feature", 2, &["a"]), Duration::from_secs(6));

        // Back to back these would take 12s.
        let started = tokio::time::Instant::now();
        let (b, c) = fetch_pair(
            &source,
            &BuildRef::new("nightly", 1),
            &BuildRef::new("feature", 2),
            Duration::from_secs(10),
        )
        .await
        .expect("fetch failed");

        assert!(started.elapsed() < Duration::from_secs(12));
        assert_eq!(b.build.number, 1);
        assert_eq!(c.build.number, 2);
    }
}
