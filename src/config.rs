use crate::cli::{CommonArgs, RunArgs};
use crate::error::{OrgHoursError, Result};
use chrono::{Days, NaiveDate};
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_ESTIMATOR: &str = "git-hours";
pub const DEFAULT_GIT_HOST: &str = "https://github.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub repository: String,
    pub token: String,
    pub metrics_branch: String,
    /// Dashboard branch; only honoured together with a metrics branch.
    pub pages_branch: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub repos: Vec<String>,
    pub window_start: Option<String>,
    pub reports_dir: PathBuf,
    pub site_dir: PathBuf,
    pub token: Option<String>,
    pub git_host: String,
    pub estimator: PathBuf,
    pub output_file: Option<PathBuf>,
    pub publish: Option<PublishTarget>,
}

impl Config {
    pub fn from_args(common: &CommonArgs, run: &RunArgs) -> Result<Self> {
        let repos = parse_repos(run.repos.as_deref())?;
        let token = non_empty(common.token.as_deref());

        let metrics_branch = non_empty(run.metrics_branch.as_deref());
        let pages_branch = non_empty(run.pages_branch.as_deref());
        let publish = match metrics_branch {
            Some(metrics_branch) => Some(publish_target(
                token.as_deref(),
                run.repository.as_deref(),
                metrics_branch,
                pages_branch,
            )?),
            None => {
                if let Some(pages) = pages_branch {
                    warn!(pages_branch = %pages, "pages branch requires a metrics branch; skipping dashboard publication");
                }
                None
            }
        };

        Ok(Self {
            repos,
            window_start: non_empty(run.since.as_deref()),
            reports_dir: common.reports_dir.clone(),
            site_dir: common.site_dir.clone(),
            token,
            git_host: common.git_host.clone(),
            estimator: run.estimator.clone(),
            output_file: run.output_file.clone().filter(|p| !p.as_os_str().is_empty()),
            publish,
        })
    }
}

pub fn publish_target(
    token: Option<&str>,
    repository: Option<&str>,
    metrics_branch: String,
    pages_branch: Option<String>,
) -> Result<PublishTarget> {
    match (non_empty(token), non_empty(repository)) {
        (Some(token), Some(repository)) => Ok(PublishTarget {
            repository,
            token,
            metrics_branch,
            pages_branch,
        }),
        _ => Err(OrgHoursError::Config(
            "GITHUB_TOKEN or GITHUB_REPOSITORY not set; cannot push to branch".to_string(),
        )),
    }
}

pub fn parse_repos(raw: Option<&str>) -> Result<Vec<String>> {
    let mut repos: Vec<String> = Vec::new();
    for repo in raw.unwrap_or_default().split_whitespace() {
        if repos.iter().any(|r| r == repo) {
            warn!(repo, "repository listed more than once; ignoring duplicate");
            continue;
        }
        repos.push(repo.to_string());
    }
    if repos.is_empty() {
        return Err(OrgHoursError::Config(
            "REPOS env var must list repositories to process".to_string(),
        ));
    }
    Ok(repos)
}

pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| OrgHoursError::InvalidDate(format!("'{raw}': {e}")))
}

/// Durations such as `90days` count back from `today`; other values pass through.
pub fn resolve_window_start(raw: &str, today: NaiveDate) -> String {
    let raw = raw.trim();
    if NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok() {
        return raw.to_string();
    }
    if let Ok(duration) = humantime::parse_duration(raw) {
        let days = duration.as_secs() / 86_400;
        if let Some(start) = today.checked_sub_days(Days::new(days)) {
            return start.format("%Y-%m-%d").to_string();
        }
    }
    raw.to_string()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
