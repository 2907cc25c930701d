//! In-memory build source (testing only)
//!
//! `MemoryBuildSource` satisfies the [`BuildSource`] contract without a
//! Jenkins server: unknown builds fail with `BuildNotFound`, and individual
//! builds can be delayed to exercise timeouts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use compare_core::{BuildRef, BuildReport};

use crate::error::AcquireError;
use crate::source::BuildSource;
use crate::Result;

#[derive(Debug, Clone)]
struct Entry {
    report: BuildReport,
    delay: Option<Duration>,
}

/// Build source backed by a `HashMap<BuildRef, BuildReport>`.
#[derive(Debug, Default)]
pub struct MemoryBuildSource {
    builds: Mutex<HashMap<BuildRef, Entry>>,
    fetches: AtomicUsize,
}

impl MemoryBuildSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `report` for its build.
    pub fn insert(&self, report: BuildReport) {
        self.insert_entry(report, None);
    }

    /// Serve `report` only after `delay` has elapsed.
    pub fn insert_delayed(&self, report: BuildReport, delay: Duration) {
        self.insert_entry(report, Some(delay));
    }

    /// Number of `fetch_build` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn insert_entry(&self, report: BuildReport, delay: Option<Duration>) {
        let mut builds = self.builds.lock().unwrap();
        builds.insert(report.build.clone(), Entry { report, delay });
    }
}

#[async_trait]
impl BuildSource for MemoryBuildSource {
    async fn fetch_build(&self, build: &BuildRef) -> Result<BuildReport> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let entry = {
            let builds = self.builds.lock().unwrap();
            builds.get(build).cloned()
        };

        let entry = entry.ok_or_else(|| AcquireError::BuildNotFound {
            job: build.job.clone(),
            build: build.number,
        })?;

        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(entry.report)
    }
}
