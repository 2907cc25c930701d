//! Display formatting for build metadata.

use crate::domain::{BuildRef, BuildReport};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Canonical Jenkins URL of a build.
///
/// Folder jobs (`team/nightly`) expand to nested `job/<segment>` paths.
pub fn build_locator(host: &str, build: &BuildRef) -> String {
    format!(
        "{}/{}/{}/",
        host.trim_end_matches('/'),
        job_path(&build.job),
        build.number
    )
}

/// `job/<a>/job/<b>` path for a (possibly foldered) job name.
pub fn job_path(job: &str) -> String {
    job.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| format!("job/{}", encode_path_segment(segment)))
        .collect::<Vec<_>>()
        .join("/")
}

/// Multi-line description of one build for the console report.
///
/// The description line is omitted when absent, blank, or when
/// `include_description` is false.
pub fn format_build_metadata(label: &str, report: &BuildReport, include_description: bool) -> String {
    let build = &report.build;
    let mut out = format!("{}: {}\n", label, build);

    match &report.details {
        Some(details) => {
            out.push_str(&format!("  url: {}\n", details.url));
            if include_description {
                if let Some(description) = details
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                {
                    out.push_str(&format!("  description: {}\n", description));
                }
            }
            out.push_str(&format!(
                "  date: {}\n",
                details.timestamp.format(DATE_FORMAT)
            ));
            if let Some(result) = &details.result {
                out.push_str(&format!("  result: {}\n", result));
            }
        }
        None => {
            out.push_str(&format!("  url: {}/{}/\n", job_path(&build.job), build.number));
            out.push_str("  date: unknown\n");
        }
    }

    out
}

/// Percent-encode one URL path segment (RFC 3986 unreserved set kept).
pub fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
