//! Connection and comparison configuration.
//!
//! Values come from command-line flags (or their environment variables) first,
//! then from a YAML config file: an explicit `--config` path, otherwise the
//! first of `./.jenkins_compare_tool` and `~/.jenkins_compare_tool` that
//! exists. The resolved [`CompareConfig`] is built once and passed around.

use compare_core::BuildRef;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;
use crate::junit::FailurePolicy;

/// File name searched for in the working and home directories.
pub const CONFIG_FILE_NAME: &str = ".jenkins_compare_tool";

/// Artifact holding the JUnit report, relative to the build's archive.
pub const DEFAULT_ARTIFACT_PATH: &str = "artifacts/results.xml";

/// Per-build acquisition timeout.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Contents of a config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConfigFile {
    pub jenkins_host: Option<String>,
    pub username: Option<String>,
    /// API token (the key is named `password` for compatibility).
    pub password: Option<String>,
    pub nightly_test_job: Option<String>,
    pub feature_test_job: Option<String>,
}

impl ConfigFile {
    /// Load a config file. Returns `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Some(Self::default()));
        }

        serde_yaml::from_str(&content)
            .map(Some)
            .map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Locate and load the config file.
    ///
    /// An explicit path must exist. Otherwise `search` is tried in order and
    /// the first existing file wins; finding none is not an error.
    pub fn discover(
        explicit: Option<&Path>,
        search: &[PathBuf],
    ) -> Result<Option<(PathBuf, Self)>, ConfigError> {
        if let Some(path) = explicit {
            return match Self::load(path)? {
                Some(file) => Ok(Some((path.to_path_buf(), file))),
                None => Err(ConfigError::Io {
                    path: path.display().to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                }),
            };
        }

        for path in search {
            if let Some(file) = Self::load(path)? {
                debug!(path = %path.display(), "Loaded config file");
                return Ok(Some((path.clone(), file)));
            }
        }
        Ok(None)
    }

    /// `./.jenkins_compare_tool`, then `~/.jenkins_compare_tool`.
    pub fn default_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(home) = home::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }
        paths
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub jenkins_host: Option<String>,
    pub username: Option<String>,
    pub api_token: Option<String>,
    pub nightly_test_job: Option<String>,
    pub feature_test_job: Option<String>,
}

impl Overrides {
    /// Fill every unset (or blank) value from the config file.
    pub fn with_fallback(self, file: Option<&ConfigFile>) -> Self {
        let file = file.cloned().unwrap_or_default();
        Self {
            jenkins_host: present(self.jenkins_host).or(present(file.jenkins_host)),
            username: present(self.username).or(present(file.username)),
            api_token: present(self.api_token).or(present(file.password)),
            nightly_test_job: present(self.nightly_test_job).or(present(file.nightly_test_job)),
            feature_test_job: present(self.feature_test_job).or(present(file.feature_test_job)),
        }
    }

    /// Server credentials; host, username and token are all required.
    pub fn credentials(&self) -> Result<JenkinsCredentials, ConfigError> {
        let host = require(&self.jenkins_host, "jenkins_host", "--jenkins-host / JENKINS_HOST")?;
        let username = require(&self.username, "username", "--jenkins-username / JENKINS_USERNAME")?;
        let token = require(&self.api_token, "password", "--jenkins-api-token / JENKINS_API_TOKEN")?;
        JenkinsCredentials::new(host, username, token)
    }
}

/// Where and as whom to talk to Jenkins.
#[derive(Clone, PartialEq, Eq)]
pub struct JenkinsCredentials {
    /// Base URL without a trailing slash.
    pub host: String,
    pub username: String,
    pub token: String,
}

impl JenkinsCredentials {
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let host = host.into();
        let trimmed = host.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(ConfigError::InvalidHost(host));
        }
        Ok(Self {
            host: trimmed.to_string(),
            username: username.into(),
            token: token.into(),
        })
    }
}

impl fmt::Debug for JenkinsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JenkinsCredentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Everything needed to compare a feature build against a nightly build.
#[derive(Debug, Clone)]
pub struct CompareConfig {
    pub credentials: JenkinsCredentials,
    pub nightly: BuildRef,
    pub feature: BuildRef,
    pub artifact_path: String,
    pub timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl CompareConfig {
    /// Resolve from merged overrides and the two build numbers.
    pub fn resolve(
        overrides: &Overrides,
        nightly_build: u64,
        feature_build: u64,
    ) -> Result<Self, ConfigError> {
        let credentials = overrides.credentials()?;
        let nightly_job = require(
            &overrides.nightly_test_job,
            "nightly_test_job",
            "--nightly-test-job",
        )?;
        let feature_job = require(
            &overrides.feature_test_job,
            "feature_test_job",
            "--feature-test-job",
        )?;

        Ok(Self {
            credentials,
            nightly: BuildRef::new(nightly_job, nightly_build),
            feature: BuildRef::new(feature_job, feature_build),
            artifact_path: DEFAULT_ARTIFACT_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            failure_policy: FailurePolicy::default(),
        })
    }

    pub fn with_artifact_path(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn require(
    value: &Option<String>,
    key: &'static str,
    hint: &'static str,
) -> Result<String, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ConfigError::MissingKey { key, hint })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const FULL_FILE: &str = "\
jenkins_host: https://jenkins.example.com/
username: qa-bot
password: s3cret
nightly_test_job: Test_Tower_Yolo_Express
feature_test_job: Test_Tower_Yolo_Feature
";

    fn overrides() -> Overrides {
        Overrides::default()
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempdir().unwrap();
        let loaded = ConfigFile::load(&dir.path().join("absent")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, FULL_FILE).unwrap();

        let file = ConfigFile::load(&path).unwrap().unwrap();
        assert_eq!(file.username.as_deref(), Some("qa-bot"));
        assert_eq!(file.password.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_load_empty_file_is_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(ConfigFile::load(&path).unwrap(), Some(ConfigFile::default()));
    }

    #[test]
    fn test_load_garbage_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "- just\n- a list\n").unwrap();
        let err = ConfigFile::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_discover_first_existing_wins() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        std::fs::write(&second, "username: from-second\n").unwrap();

        let (path, file) = ConfigFile::discover(None, &[first.clone(), second.clone()])
            .unwrap()
            .unwrap();
        assert_eq!(path, second);
        assert_eq!(file.username.as_deref(), Some("from-second"));

        std::fs::write(&first, "username: from-first\n").unwrap();
        let (path, _) = ConfigFile::discover(None, &[first.clone(), second]).unwrap().unwrap();
        assert_eq!(path, first);
    }

    #[test]
    fn test_discover_nothing_found() {
        let dir = tempdir().unwrap();
        let found = ConfigFile::discover(None, &[dir.path().join("nope")]).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let dir = tempdir().unwrap();
        let err = ConfigFile::discover(Some(&dir.path().join("nope")), &[]).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_flags_take_precedence_over_file() {
        let file: ConfigFile = serde_yaml::from_str(FULL_FILE).unwrap();
        let merged = Overrides {
            username: Some("cli-user".to_string()),
            api_token: Some("".to_string()),
            ..overrides()
        }
        .with_fallback(Some(&file));

        assert_eq!(merged.username.as_deref(), Some("cli-user"));
        // Blank flag values fall through to the file.
        assert_eq!(merged.api_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_resolve_full_config() {
        let file: ConfigFile = serde_yaml::from_str(FULL_FILE).unwrap();
        let merged = overrides().with_fallback(Some(&file));
        let config = CompareConfig::resolve(&merged, 100, 200).unwrap();

        assert_eq!(config.credentials.host, "https://jenkins.example.com");
        assert_eq!(config.nightly, BuildRef::new("Test_Tower_Yolo_Express", 100));
        assert_eq!(config.feature, BuildRef::new("Test_Tower_Yolo_Feature", 200));
        assert_eq!(config.artifact_path, DEFAULT_ARTIFACT_PATH);
        assert_eq!(config.failure_policy, FailurePolicy::FailuresOnly);
    }

    #[test]
    fn test_missing_keys_are_named_in_order() {
        let err = CompareConfig::resolve(&overrides(), 1, 2).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "jenkins_host", .. }));

        let partial = Overrides {
            jenkins_host: Some("https://ci".to_string()),
            username: Some("u".to_string()),
            ..overrides()
        };
        let err = CompareConfig::resolve(&partial, 1, 2).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "password", .. }));

        let no_jobs = Overrides {
            api_token: Some("t".to_string()),
            ..partial
        };
        let err = CompareConfig::resolve(&no_jobs, 1, 2).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "nightly_test_job", .. }));

        let no_feature = Overrides {
            nightly_test_job: Some("n".to_string()),
            ..no_jobs
        };
        let err = CompareConfig::resolve(&no_feature, 1, 2).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey { key: "feature_test_job", .. }));
    }

    #[test]
    fn test_invalid_host_rejected() {
        let err = JenkinsCredentials::new("jenkins.example.com", "u", "t").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHost(_)));
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = JenkinsCredentials::new("https://ci", "u", "top-secret").unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("top-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
