//! Jenkins HTTP client
//!
//! Talks to the Jenkins JSON API with basic auth (username + API token):
//! looks up a build, finds the JUnit artifact in its archive, downloads it,
//! and parses the failing test names out of it.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use compare_core::{
    build_locator, emit_build_fetched, encode_path_segment, job_path, BuildDetails, BuildRef,
    BuildReport,
};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{
    CompareConfig, JenkinsCredentials, DEFAULT_ARTIFACT_PATH, DEFAULT_TIMEOUT_SECS,
};
use crate::error::AcquireError;
use crate::junit::{self, FailurePolicy};
use crate::source::BuildSource;
use crate::Result;

/// Build as returned by `<build>/api/json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub number: u64,
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Start time in milliseconds since the epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactInfo>,
}

/// One archived artifact of a build.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactInfo {
    pub file_name: String,
    pub relative_path: String,
}

impl BuildInfo {
    /// Convert to the display metadata used by reports.
    pub fn details(&self, build: &BuildRef) -> Result<BuildDetails> {
        let timestamp = Utc
            .timestamp_millis_opt(self.timestamp)
            .single()
            .ok_or_else(|| AcquireError::InvalidResponse {
                job: build.job.clone(),
                build: build.number,
                reason: format!("timestamp {} out of range", self.timestamp),
            })?;

        Ok(BuildDetails {
            url: self.url.clone(),
            description: self.description.clone(),
            timestamp,
            result: self.result.clone(),
        })
    }
}

/// Client for one Jenkins server.
pub struct JenkinsClient {
    credentials: JenkinsCredentials,
    http_client: reqwest::Client,
    artifact_path: String,
    policy: FailurePolicy,
}

impl JenkinsClient {
    /// Create a client with the default artifact path, policy, and timeout.
    pub fn new(credentials: JenkinsCredentials) -> Result<Self> {
        Self::with_timeout(credentials, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a client whose individual HTTP requests time out after `timeout`.
    pub fn with_timeout(credentials: JenkinsCredentials, timeout: Duration) -> Result<Self> {
        if credentials.username.is_empty() || credentials.token.is_empty() {
            return Err(AcquireError::CredentialsMissing(format!(
                "username and API token are required for {}",
                credentials.host
            )));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(concat!("jenkins-compare/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(JenkinsClient {
            credentials,
            http_client,
            artifact_path: DEFAULT_ARTIFACT_PATH.to_string(),
            policy: FailurePolicy::default(),
        })
    }

    /// Create a client for a resolved comparison config.
    pub fn from_config(config: &CompareConfig) -> Result<Self> {
        Ok(Self::with_timeout(config.credentials.clone(), config.timeout)?
            .with_artifact_path(config.artifact_path.clone())
            .with_failure_policy(config.failure_policy))
    }

    pub fn with_artifact_path(mut self, path: impl Into<String>) -> Self {
        self.artifact_path = path.into();
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn host(&self) -> &str {
        &self.credentials.host
    }

    /// `<host>/job/<job>/api/json`
    pub fn job_api_url(&self, job: &str) -> String {
        format!("{}/{}/api/json", self.credentials.host, job_path(job))
    }

    /// `<host>/job/<job>/<n>/api/json`
    pub fn build_api_url(&self, build: &BuildRef) -> String {
        format!("{}api/json", build_locator(&self.credentials.host, build))
    }

    /// `<host>/job/<job>/<n>/artifact/<relative path>`
    pub fn artifact_url(&self, build: &BuildRef, relative_path: &str) -> String {
        let encoded = relative_path
            .split('/')
            .map(encode_path_segment)
            .collect::<Vec<_>>()
            .join("/");
        format!(
            "{}artifact/{}",
            build_locator(&self.credentials.host, build),
            encoded
        )
    }

    /// Look up a build's metadata and artifact list.
    pub async fn build_info(&self, build: &BuildRef) -> Result<BuildInfo> {
        let url = self.build_api_url(build);
        debug!(url = %url, "Fetching build info");

        let response = self.get(&url).await?;
        match response.status() {
            status if status.is_success() => {
                response
                    .json::<BuildInfo>()
                    .await
                    .map_err(|e| AcquireError::InvalidResponse {
                        job: build.job.clone(),
                        build: build.number,
                        reason: e.to_string(),
                    })
            }
            StatusCode::NOT_FOUND => Err(self.classify_not_found(build).await),
            status => Err(self.status_error(build, status, &url)),
        }
    }

    /// Download an artifact's text.
    pub async fn download_artifact(&self, build: &BuildRef, relative_path: &str) -> Result<String> {
        let url = self.artifact_url(build, relative_path);
        debug!(url = %url, "Downloading artifact");

        let response = self.get(&url).await?;
        match response.status() {
            status if status.is_success() => Ok(response.text().await?),
            StatusCode::NOT_FOUND => Err(AcquireError::ArtifactMissing {
                job: build.job.clone(),
                build: build.number,
                path: relative_path.to_string(),
                available: "listed but not downloadable".to_string(),
            }),
            status => Err(self.status_error(build, status, &url)),
        }
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        Ok(self
            .http_client
            .get(url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.token))
            .send()
            .await?)
    }

    // A 404 on the build could mean the job itself is missing.
    async fn classify_not_found(&self, build: &BuildRef) -> AcquireError {
        let job_url = self.job_api_url(&build.job);
        match self.get(&job_url).await {
            Ok(response) if response.status() == StatusCode::NOT_FOUND => AcquireError::JobNotFound {
                job: build.job.clone(),
            },
            _ => AcquireError::BuildNotFound {
                job: build.job.clone(),
                build: build.number,
            },
        }
    }

    fn status_error(&self, build: &BuildRef, status: StatusCode, url: &str) -> AcquireError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AcquireError::Unauthorized {
                job: build.job.clone(),
                build: build.number,
                status: status.as_u16(),
            },
            _ => AcquireError::Http(format!("GET {} returned {}", url, status)),
        }
    }
}

#[async_trait]
impl BuildSource for JenkinsClient {
    async fn fetch_build(&self, build: &BuildRef) -> Result<BuildReport> {
        let started = Instant::now();
        info!(job = %build.job, build = build.number, "Fetching test results");

        let info = self.build_info(build).await?;
        let artifact = info
            .artifacts
            .iter()
            .find(|a| a.relative_path == self.artifact_path)
            .ok_or_else(|| AcquireError::ArtifactMissing {
                job: build.job.clone(),
                build: build.number,
                path: self.artifact_path.clone(),
                available: list_artifacts(&info.artifacts),
            })?;

        let xml = self.download_artifact(build, &artifact.relative_path).await?;
        let failures = junit::parse_failures(&xml, self.policy).map_err(|e| {
            AcquireError::ReportUnparsable {
                job: build.job.clone(),
                build: build.number,
                reason: e.to_string(),
            }
        })?;

        let details = info.details(build)?;
        emit_build_fetched(build, failures.len(), started.elapsed().as_millis() as u64);

        Ok(BuildReport::new(build.clone(), failures).with_details(details))
    }
}

fn list_artifacts(artifacts: &[ArtifactInfo]) -> String {
    if artifacts.is_empty() {
        "none".to_string()
    } else {
        artifacts
            .iter()
            .map(|a| a.relative_path.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> JenkinsClient {
        let creds = JenkinsCredentials::new("https://ci.example.com/", "bot", "token").unwrap();
        JenkinsClient::new(creds).unwrap()
    }

    #[test]
    fn test_urls() {
        let client = client();
        let build = BuildRef::new("qa/Test Tower", 17);

        assert_eq!(
            client.build_api_url(&build),
            "https://ci.example.com/job/qa/job/Test%20Tower/17/api/json"
        );
        assert_eq!(
            client.job_api_url(&build.job),
            "https://ci.example.com/job/qa/job/Test%20Tower/api/json"
        );
        assert_eq!(
            client.artifact_url(&build, "artifacts/results.xml"),
            "https://ci.example.com/job/qa/job/Test%20Tower/17/artifact/artifacts/results.xml"
        );
    }

    #[test]
    fn test_build_info_deserializes_jenkins_json() {
        let info: BuildInfo = serde_json::from_value(json!({
            "_class": "hudson.model.FreeStyleBuild",
            "number": 17,
            "url": "https://ci.example.com/job/nightly/17/",
            "description": null,
            "timestamp": 1_700_000_000_000i64,
            "result": "UNSTABLE",
            "artifacts": [
                {"displayPath": "results.xml", "fileName": "results.xml", "relativePath": "artifacts/results.xml"}
            ]
        }))
        .unwrap();

        assert_eq!(info.number, 17);
        assert_eq!(info.artifacts[0].relative_path, "artifacts/results.xml");

        let details = info.details(&BuildRef::new("nightly", 17)).unwrap();
        assert_eq!(details.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(details.result.as_deref(), Some("UNSTABLE"));
        assert!(details.description.is_none());
    }

    #[test]
    fn test_empty_token_is_credentials_missing() {
        let creds = JenkinsCredentials::new("https://ci.example.com", "bot", "").unwrap();
        let err = JenkinsClient::new(creds).err().unwrap();
        assert!(matches!(err, AcquireError::CredentialsMissing(_)));
    }

    #[test]
    fn test_list_artifacts() {
        assert_eq!(list_artifacts(&[]), "none");
        let artifacts = vec![
            ArtifactInfo {
                file_name: "a.xml".to_string(),
                relative_path: "out/a.xml".to_string(),
            },
            ArtifactInfo {
                file_name: "b.log".to_string(),
                relative_path: "b.log".to_string(),
            },
        ];
        assert_eq!(list_artifacts(&artifacts), "out/a.xml, b.log");
    }
}
