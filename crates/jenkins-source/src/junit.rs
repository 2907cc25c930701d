//! JUnit/XUnit XML report parsing.
//!
//! Only the parts needed for triage are read: each `<testcase>`'s name and
//! classname, and whether it carries a `<failure>`, `<error>` or `<skipped>`
//! child. Rerun and flaky-run children (`rerunFailure`, `flakyFailure`, ...)
//! do not change the final outcome.

use compare_core::FailureSet;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::JunitError;

static TESTSUITES_TAG: &[u8] = b"testsuites";
static TESTSUITE_TAG: &[u8] = b"testsuite";
static TESTCASE_TAG: &[u8] = b"testcase";
static FAILURE_TAG: &[u8] = b"failure";
static ERROR_TAG: &[u8] = b"error";
static SKIPPED_TAG: &[u8] = b"skipped";

/// Final outcome of a test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failure,
    Error,
    Skipped,
}

/// One `<testcase>` from a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub name: String,
    pub classname: Option<String>,
    pub outcome: Outcome,
}

/// Which outcomes count as failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Only `<failure>` results.
    #[default]
    FailuresOnly,
    /// `<failure>` and `<error>` results.
    FailuresAndErrors,
}

impl FailurePolicy {
    pub fn from_include_errors(include_errors: bool) -> Self {
        if include_errors {
            FailurePolicy::FailuresAndErrors
        } else {
            FailurePolicy::FailuresOnly
        }
    }

    pub fn is_failing(self, outcome: Outcome) -> bool {
        match outcome {
            Outcome::Failure => true,
            Outcome::Error => self == FailurePolicy::FailuresAndErrors,
            Outcome::Passed | Outcome::Skipped => false,
        }
    }
}

/// Parse every test case outcome in a JUnit document.
///
/// A document that ends while any element is still open is rejected.
pub fn parse_report(xml: &str) -> Result<Vec<TestOutcome>, JunitError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut outcomes = Vec::new();
    let mut saw_root = false;
    // Elements opened but not yet closed, counting the root.
    let mut open = 0usize;
    // The open <testcase>, and how deep we are below it.
    let mut current: Option<TestOutcome> = None;
    let mut depth = 0usize;

    loop {
        let position = reader.buffer_position();
        let event = reader.read_event().map_err(|e| JunitError::Xml {
            position: reader.buffer_position(),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                let is_start = matches!(event, Event::Start(_));
                let local = e.local_name();
                let tag = local.as_ref();
                if is_start {
                    open += 1;
                }

                if !saw_root {
                    if tag != TESTSUITES_TAG && tag != TESTSUITE_TAG {
                        return Err(JunitError::UnexpectedRoot(
                            String::from_utf8_lossy(tag).into_owned(),
                        ));
                    }
                    saw_root = true;
                    continue;
                }

                if let Some(case) = current.as_mut() {
                    if depth == 0 {
                        case.outcome = merge_outcome(case.outcome, tag);
                    }
                    if is_start {
                        depth += 1;
                    }
                } else if tag == TESTCASE_TAG {
                    let case = read_testcase(e, position)?;
                    if is_start {
                        current = Some(case);
                        depth = 0;
                    } else {
                        outcomes.push(case);
                    }
                }
            }
            Event::End(_) => {
                open = open.saturating_sub(1);
                if current.is_some() {
                    if depth == 0 {
                        outcomes.extend(current.take());
                    } else {
                        depth -= 1;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(JunitError::Empty);
    }
    if open > 0 {
        return Err(JunitError::Truncated {
            position: reader.buffer_position(),
            open,
        });
    }
    Ok(outcomes)
}

/// Names of the failing test cases under `policy`.
pub fn failing_names(outcomes: &[TestOutcome], policy: FailurePolicy) -> FailureSet {
    outcomes
        .iter()
        .filter(|case| policy.is_failing(case.outcome))
        .map(|case| case.name.clone())
        .collect()
}

/// Parse a report straight into its failure set.
pub fn parse_failures(xml: &str, policy: FailurePolicy) -> Result<FailureSet, JunitError> {
    let outcomes = parse_report(xml)?;
    Ok(failing_names(&outcomes, policy))
}

fn read_testcase(e: &BytesStart<'_>, position: usize) -> Result<TestOutcome, JunitError> {
    let mut name = None;
    let mut classname = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| JunitError::Xml {
            position,
            message: err.to_string(),
        })?;
        let value = || {
            attr.unescape_value()
                .map(|v| v.into_owned())
                .map_err(|err| JunitError::Xml {
                    position,
                    message: err.to_string(),
                })
        };
        match attr.key.local_name().as_ref() {
            b"name" => name = Some(value()?),
            b"classname" => classname = Some(value()?),
            _ => {}
        }
    }

    let name = name.ok_or(JunitError::MissingName { position })?;
    Ok(TestOutcome {
        name,
        classname,
        outcome: Outcome::Passed,
    })
}

// A failure outranks an error, which outranks a skip.
fn merge_outcome(current: Outcome, child: &[u8]) -> Outcome {
    let incoming = if child == FAILURE_TAG {
        Outcome::Failure
    } else if child == ERROR_TAG {
        Outcome::Error
    } else if child == SKIPPED_TAG {
        Outcome::Skipped
    } else {
        return current;
    };

    match (current, incoming) {
        (Outcome::Failure, _) => Outcome::Failure,
        (_, Outcome::Failure) => Outcome::Failure,
        (Outcome::Error, _) => Outcome::Error,
        (_, Outcome::Error) => Outcome::Error,
        (_, incoming) => incoming,
    }
}
