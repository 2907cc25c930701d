//! Rendering of comparison results for the console and for JSON consumers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::{BuildDetails, BuildRef, BuildReport, FailureSet};
use crate::metadata::format_build_metadata;
use crate::reconcile::ReconciliationResult;

/// How much of the suppressed (known) failures to show in text output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputMode {
    /// Only the new failure names, one per line, no headers.
    NewOnly,
    /// Build metadata, new failures listed, known failures as a count.
    #[default]
    Summary,
    /// Build metadata, new, known, and resolved failures all listed.
    Full,
}

impl FromStr for OutputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new-only" => Ok(OutputMode::NewOnly),
            "summary" => Ok(OutputMode::Summary),
            "full" => Ok(OutputMode::Full),
            other => Err(format!(
                "unknown output mode '{}' (expected new-only, summary, or full)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputMode::NewOnly => "new-only",
            OutputMode::Summary => "summary",
            OutputMode::Full => "full",
        };
        f.write_str(s)
    }
}

/// Identity and metadata of one compared build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    pub build: BuildRef,
    pub failure_count: usize,
    pub details: Option<BuildDetails>,
}

impl From<&BuildReport> for BuildSummary {
    fn from(report: &BuildReport) -> Self {
        Self {
            build: report.build.clone(),
            failure_count: report.failures.len(),
            details: report.details.clone(),
        }
    }
}

/// Everything the reporting stage needs about one comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub baseline: BuildSummary,
    pub candidate: BuildSummary,
    pub new_failures: FailureSet,
    pub suppressed: FailureSet,
    pub resolved: FailureSet,
    pub carried_over_count: usize,
}

impl ComparisonReport {
    pub fn new(baseline: &BuildReport, candidate: &BuildReport, result: ReconciliationResult) -> Self {
        Self {
            baseline: baseline.into(),
            candidate: candidate.into(),
            new_failures: result.new_failures,
            suppressed: result.suppressed,
            resolved: result.resolved,
            carried_over_count: result.carried_over_count,
        }
    }

    pub fn has_regressions(&self) -> bool {
        !self.new_failures.is_empty()
    }
}

/// Render a comparison as console text.
pub fn render_text(report: &ComparisonReport, mode: OutputMode, include_description: bool) -> String {
    let mut out = String::new();

    if mode == OutputMode::NewOnly {
        push_names(&mut out, &report.new_failures, "");
        return out;
    }

    out.push_str(&summary_metadata("nightly", &report.baseline, include_description));
    out.push_str(&summary_metadata("feature", &report.candidate, include_description));
    out.push('\n');

    if report.new_failures.is_empty() {
        out.push_str("No new failures.\n");
    } else {
        out.push_str(&format!("New failures ({}):\n", report.new_failures.len()));
        push_names(&mut out, &report.new_failures, "  ");
    }

    match mode {
        OutputMode::Summary => {
            out.push_str(&format!(
                "Known failures suppressed: {}\n",
                report.suppressed.len()
            ));
        }
        OutputMode::Full => {
            out.push_str(&format!("Known failures ({}):\n", report.suppressed.len()));
            push_names(&mut out, &report.suppressed, "  ");
            if !report.resolved.is_empty() {
                out.push_str(&format!(
                    "Resolved since baseline ({}):\n",
                    report.resolved.len()
                ));
                push_names(&mut out, &report.resolved, "  ");
            }
        }
        OutputMode::NewOnly => {}
    }

    out
}

/// Sorted failing test names of a single build, one per line.
pub fn render_failures(report: &BuildReport) -> String {
    let mut out = String::new();
    push_names(&mut out, &report.failures, "");
    out
}

fn summary_metadata(label: &str, summary: &BuildSummary, include_description: bool) -> String {
    let report = BuildReport {
        build: summary.build.clone(),
        failures: FailureSet::empty(),
        details: summary.details.clone(),
    };
    let mut text = format_build_metadata(label, &report, include_description);
    text.push_str(&format!("  failures: {}\n", summary.failure_count));
    text
}

fn push_names(out: &mut String, names: &FailureSet, indent: &str) {
    for name in names.iter() {
        out.push_str(indent);
        out.push_str(name);
        out.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::reconcile;

    fn report(job: &str, number: u64, names: &[&str]) -> BuildReport {
        BuildReport::new(BuildRef::new(job, number), names.iter().copied().collect())
    }

    fn sample() -> ComparisonReport {
        let baseline = report("nightly", 10, &["test_alpha", "test_beta"]);
        let candidate = report("feature", 20, &["test_beta", "test_gamma"]);
        let result = reconcile(&baseline.failures, &candidate.failures);
        ComparisonReport::new(&baseline, &candidate, result)
    }

    #[test]
    fn test_output_mode_parse_roundtrip() {
        for mode in [OutputMode::NewOnly, OutputMode::Summary, OutputMode::Full] {
            assert_eq!(mode.to_string().parse::<OutputMode>().unwrap(), mode);
        }
        assert!("verbose".parse::<OutputMode>().is_err());
        assert_eq!(OutputMode::default(), OutputMode::Summary);
    }

    #[test]
    fn test_new_only_is_bare_names() {
        assert_eq!(render_text(&sample(), OutputMode::NewOnly, true), "test_gamma\n");
    }

    #[test]
    fn test_summary_counts_known_failures() {
        let text = render_text(&sample(), OutputMode::Summary, true);
        assert!(text.contains("New failures (1):\n  test_gamma\n"));
        assert!(text.contains("Known failures suppressed: 1\n"));
        assert!(!text.contains("  test_beta\n"));
        assert!(text.starts_with("nightly: nightly #10\n"));
    }

    #[test]
    fn test_full_lists_known_and_resolved() {
        let text = render_text(&sample(), OutputMode::Full, true);
        assert!(text.contains("Known failures (1):\n  test_beta\n"));
        assert!(text.contains("Resolved since baseline (1):\n  test_alpha\n"));
    }

    #[test]
    fn test_no_new_failures_message() {
        let baseline = report("nightly", 1, &["a"]);
        let candidate = report("feature", 2, &["a"]);
        let result = reconcile(&baseline.failures, &candidate.failures);
        let report = ComparisonReport::new(&baseline, &candidate, result);

        assert!(!report.has_regressions());
        assert!(render_text(&report, OutputMode::Summary, true).contains("No new failures.\n"));
        assert_eq!(render_text(&report, OutputMode::NewOnly, true), "");
    }

    #[test]
    fn test_json_shape_contains_every_set() {
        let value = serde_json::to_value(sample()).unwrap();
        assert_eq!(value["new_failures"], serde_json::json!(["test_gamma"]));
        assert_eq!(value["suppressed"], serde_json::json!(["test_beta"]));
        assert_eq!(value["resolved"], serde_json::json!(["test_alpha"]));
        assert_eq!(value["carried_over_count"], serde_json::json!(1));
        assert_eq!(value["baseline"]["build"]["job"], serde_json::json!("nightly"));
        assert_eq!(value["candidate"]["failure_count"], serde_json::json!(2));
    }

    #[test]
    fn test_render_failures_sorted() {
        let build = report("feature", 3, &["zeta", "Alpha", "beta"]);
        assert_eq!(render_failures(&build), "Alpha\nbeta\nzeta\n");
    }
}
