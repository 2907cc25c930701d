//! jenkins-compare CLI
//!
//! Compares the failing tests of a feature-branch build against the nightly
//! build and reports only the failures the feature branch introduced.
//!
//! ## Commands
//!
//! - `compare`: fetch a nightly and a feature build from Jenkins and reconcile them
//! - `failures`: list the failing tests of a single build
//! - `local`: reconcile two JUnit XML files already on disk

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use compare_core::{
    reconcile, render_failures, render_text, BuildDetails, BuildRef, BuildReport, CompareSpan,
    ComparisonReport, OutputMode,
};
use jenkins_source::{
    compare_builds, fetch_with_timeout, parse_failures, BuildSource, CompareConfig, ConfigFile,
    FailurePolicy, JenkinsClient, Overrides, DEFAULT_ARTIFACT_PATH, DEFAULT_TIMEOUT_SECS,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "jenkins-compare")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Report test failures a feature build introduced relative to nightly",
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a feature build against a nightly build
    Compare {
        /// Nightly (baseline) build number
        #[arg(long)]
        nightly: u64,

        /// Feature (candidate) build number
        #[arg(long)]
        feature: u64,

        /// Nightly test job name (folders separated by '/')
        #[arg(long)]
        nightly_test_job: Option<String>,

        /// Feature test job name (folders separated by '/')
        #[arg(long)]
        feature_test_job: Option<String>,

        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        fetch: FetchArgs,

        #[command(flatten)]
        render: RenderArgs,
    },

    /// List the failing tests of one build
    Failures {
        /// Job name (folders separated by '/')
        #[arg(long)]
        job: String,

        /// Build number
        #[arg(long)]
        build: u64,

        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        fetch: FetchArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Compare two local JUnit XML reports
    Local {
        /// Baseline (nightly) report
        baseline: PathBuf,

        /// Candidate (feature) report
        candidate: PathBuf,

        /// Count <error> test cases as failures too
        #[arg(long)]
        include_errors: bool,

        #[command(flatten)]
        render: RenderArgs,
    },
}

/// Where the Jenkins server is and how to log in.
#[derive(Args, Debug, Clone, Default)]
struct ConnectionArgs {
    /// Jenkins base URL
    #[arg(long, env = "JENKINS_HOST")]
    jenkins_host: Option<String>,

    /// Jenkins user name
    #[arg(long, env = "JENKINS_USERNAME")]
    jenkins_username: Option<String>,

    /// Jenkins API token
    #[arg(long, env = "JENKINS_API_TOKEN", hide_env_values = true)]
    jenkins_api_token: Option<String>,

    /// Config file (default: ./.jenkins_compare_tool, then ~/.jenkins_compare_tool)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// How to locate and read a build's test report.
#[derive(Args, Debug, Clone)]
struct FetchArgs {
    /// Path of the JUnit report among the build's archived artifacts
    #[arg(long, default_value = DEFAULT_ARTIFACT_PATH)]
    artifact_path: String,

    /// Per-build fetch timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Count <error> test cases as failures too
    #[arg(long)]
    include_errors: bool,
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// How much of the known failures to show
    #[arg(long, default_value_t = OutputMode::Summary)]
    output: OutputMode,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Leave build descriptions out of the metadata block
    #[arg(long)]
    no_description: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    compare_core::init_tracing(cli.json_logs, level);

    match cli.command {
        Commands::Compare {
            nightly,
            feature,
            nightly_test_job,
            feature_test_job,
            connection,
            fetch,
            render,
        } => {
            let mut overrides = connection_overrides(&connection);
            overrides.nightly_test_job = nightly_test_job;
            overrides.feature_test_job = feature_test_job;
            let overrides = merge_config_file(overrides, connection.config.as_deref())?;

            let config = CompareConfig::resolve(&overrides, nightly, feature)
                .context("Failed to resolve configuration")?
                .with_artifact_path(fetch.artifact_path)
                .with_timeout(Duration::from_secs(fetch.timeout_secs))
                .with_failure_policy(FailurePolicy::from_include_errors(fetch.include_errors));
            debug!(?config, "Resolved configuration");

            let client = JenkinsClient::from_config(&config)?;
            let report = cmd_compare(&client, &config).await?;
            print!("{}", render_comparison(&report, &render)?);
            check_regressions(&report)
        }
        Commands::Failures {
            job,
            build,
            connection,
            fetch,
            format,
        } => {
            let overrides = merge_config_file(
                connection_overrides(&connection),
                connection.config.as_deref(),
            )?;
            let credentials = overrides
                .credentials()
                .context("Failed to resolve configuration")?;

            let client = JenkinsClient::with_timeout(
                credentials,
                Duration::from_secs(fetch.timeout_secs),
            )?
            .with_artifact_path(fetch.artifact_path)
            .with_failure_policy(FailurePolicy::from_include_errors(fetch.include_errors));

            let report = cmd_failures(
                &client,
                &BuildRef::new(job, build),
                Duration::from_secs(fetch.timeout_secs),
            )
            .await?;
            print!("{}", render_build(&report, format)?);
            Ok(())
        }
        Commands::Local {
            baseline,
            candidate,
            include_errors,
            render,
        } => {
            let report = cmd_local(
                &baseline,
                &candidate,
                FailurePolicy::from_include_errors(include_errors),
            )?;
            print!("{}", render_comparison(&report, &render)?);
            check_regressions(&report)
        }
    }
}

fn connection_overrides(connection: &ConnectionArgs) -> Overrides {
    Overrides {
        jenkins_host: connection.jenkins_host.clone(),
        username: connection.jenkins_username.clone(),
        api_token: connection.jenkins_api_token.clone(),
        ..Overrides::default()
    }
}

/// Fill gaps in the command-line values from the first config file found.
fn merge_config_file(overrides: Overrides, explicit: Option<&Path>) -> Result<Overrides> {
    let found = ConfigFile::discover(explicit, &ConfigFile::default_search_paths())?;
    match &found {
        Some((path, _)) => info!(path = %path.display(), "Using config file"),
        None => debug!("No config file found"),
    }
    Ok(overrides.with_fallback(found.as_ref().map(|(_, file)| file)))
}

async fn cmd_compare<S>(source: &S, config: &CompareConfig) -> Result<ComparisonReport>
where
    S: BuildSource + ?Sized,
{
    let comparison = compare_builds(source, &config.nightly, &config.feature, config.timeout)
        .await
        .with_context(|| {
            format!(
                "Failed to compare {} against {}",
                config.feature, config.nightly
            )
        })?;
    Ok(comparison.into_report())
}

async fn cmd_failures<S>(source: &S, build: &BuildRef, timeout: Duration) -> Result<BuildReport>
where
    S: BuildSource + ?Sized,
{
    fetch_with_timeout(source, build, timeout)
        .await
        .with_context(|| format!("Failed to fetch failures of {}", build))
}

fn cmd_local(baseline: &Path, candidate: &Path, policy: FailurePolicy) -> Result<ComparisonReport> {
    let baseline = read_local_report(baseline, policy)?;
    let candidate = read_local_report(candidate, policy)?;

    let _span = CompareSpan::enter(&baseline.build, &candidate.build);
    let result = reconcile(&baseline.failures, &candidate.failures);
    compare_core::emit_reconciled(&result);

    Ok(ComparisonReport::new(&baseline, &candidate, result))
}

/// A local file stands in for a build: it is named by its path with build
/// number 0, its URL is a `file://` URL and its date is the file's mtime.
fn read_local_report(path: &Path, policy: FailurePolicy) -> Result<BuildReport> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let failures = parse_failures(&xml, policy)
        .with_context(|| format!("Failed to parse JUnit report {}", path.display()))?;

    let absolute = std::fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let modified = std::fs::metadata(&absolute)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to read modification time of {}", path.display()))?;
    let details = BuildDetails {
        url: format!("file://{}", absolute.display()),
        description: None,
        timestamp: modified.into(),
        result: None,
    };

    Ok(BuildReport::new(BuildRef::new(path.display().to_string(), 0), failures)
        .with_details(details))
}

fn render_comparison(report: &ComparisonReport, render: &RenderArgs) -> Result<String> {
    match render.format {
        Format::Text => Ok(render_text(report, render.output, !render.no_description)),
        Format::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn render_build(report: &BuildReport, format: Format) -> Result<String> {
    match format {
        Format::Text => Ok(render_failures(report)),
        Format::Json => {
            let mut json = serde_json::to_string_pretty(report)?;
            json.push('\n');
            Ok(json)
        }
    }
}

fn check_regressions(report: &ComparisonReport) -> Result<()> {
    if report.has_regressions() {
        bail!("{} new failure(s)", report.new_failures.len());
    }
    Ok(())
}
