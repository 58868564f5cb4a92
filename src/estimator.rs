use crate::error::{OrgHoursError, Result};
use crate::git::{redact_credentials, remote_url, SourceControl};
use crate::model::RepoResult;
use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

pub trait Analyzer {
    fn analyze(&self, repo: &str, since: Option<&str>) -> Result<RepoResult>;
}

pub struct GitHoursAnalyzer<'a> {
    scm: &'a dyn SourceControl,
    tool: PathBuf,
    host: String,
    token: Option<String>,
}

impl<'a> GitHoursAnalyzer<'a> {
    pub fn new(
        scm: &'a dyn SourceControl,
        tool: impl Into<PathBuf>,
        host: impl Into<String>,
        token: Option<String>,
    ) -> Self {
        Self {
            scm,
            tool: tool.into(),
            host: host.into(),
            token,
        }
    }

    fn run_tool(&self, repo: &str, workdir: &Path, since: Option<&str>) -> Result<RepoResult> {
        let args = estimator_args(since);
        debug!(tool = %self.tool.display(), ?args, "running estimator");
        let output = Command::new(&self.tool)
            .args(&args)
            .current_dir(workdir)
            .output()?;

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exit code {code}"),
                None => "terminated by signal".to_string(),
            };
            let mut command = self.tool.display().to_string();
            for arg in &args {
                command.push(' ');
                command.push_str(arg);
            }
            return Err(OrgHoursError::Command {
                command: format!("{command} (for {repo})"),
                status,
                stderr: redact_credentials(String::from_utf8_lossy(&output.stderr).trim()),
            });
        }

        parse_output(repo, &output.stdout)
    }
}

impl Analyzer for GitHoursAnalyzer<'_> {
    fn analyze(&self, repo: &str, since: Option<&str>) -> Result<RepoResult> {
        let checkout = tempfile::Builder::new().prefix("orghours-repo-").tempdir()?;
        let url = remote_url(&self.host, repo, self.token.as_deref());
        info!(repo, "cloning full history");
        self.scm.clone_full(&url, checkout.path())?;
        // `checkout` is removed on drop whether or not the estimator succeeds
        self.run_tool(repo, checkout.path(), since)
    }
}

pub fn estimator_args(since: Option<&str>) -> Vec<String> {
    match since.filter(|s| !s.is_empty()) {
        Some(since) => vec!["-since".to_string(), since.to_string()],
        None => Vec::new(),
    }
}

pub fn parse_output(repo: &str, stdout: &[u8]) -> Result<RepoResult> {
    serde_json::from_slice(stdout)
        .and_then(|raw| RepoResult::from_output(repo, raw))
        .map_err(|source| OrgHoursError::MalformedOutput {
            repo: repo.to_string(),
            source,
        })
}

/// A tool given as a path must exist; a bare name must be found on `PATH`.
pub fn ensure_available(tool: &Path) -> Result<PathBuf> {
    if tool.components().count() > 1 || tool.is_absolute() {
        return if tool.is_file() {
            Ok(tool.to_path_buf())
        } else {
            Err(OrgHoursError::EstimatorMissing(format!(
                "{} does not exist",
                tool.display()
            )))
        };
    }

    let path = env::var_os("PATH").unwrap_or_default();
    env::split_paths(&path)
        .flat_map(|dir| candidates(&dir, tool))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            OrgHoursError::EstimatorMissing(format!("{} CLI not found in PATH", tool.display()))
        })
}

fn candidates(dir: &Path, tool: &Path) -> Vec<PathBuf> {
    let plain = dir.join(tool);
    if cfg!(windows) {
        vec![plain.with_extension("exe"), plain]
    } else {
        vec![plain]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::CommitIdentity;
    use crate::model::ContributorStats;
    use std::cell::RefCell;

    #[test]
    fn args_without_window() {
        assert!(estimator_args(None).is_empty());
        assert!(estimator_args(Some("")).is_empty());
    }

    #[test]
    fn args_with_window() {
        assert_eq!(estimator_args(Some("2023-01-01")), vec!["-since", "2023-01-01"]);
    }

    #[test]
    fn parses_estimator_json() {
        let out = br#"{"user@example.com": {"hours": 1, "commits": 1}, "total": {"hours": 1, "commits": 1}}"#;
        let result = parse_output("owner/repo", out).unwrap();
        assert_eq!(result.repo, "owner/repo");
        assert_eq!(result.stats.total, ContributorStats::new(1.0, 1));
        assert_eq!(result.stats.contributor_count(), 1);
    }

    #[test]
    fn negative_hours_are_malformed() {
        let out = br#"{"dev": {"hours": -2.5, "commits": 1}, "total": {"hours": 0, "commits": 1}}"#;
        let err = parse_output("owner/repo", out).unwrap_err();
        assert!(matches!(err, OrgHoursError::MalformedOutput { .. }));
    }

    #[test]
    fn malformed_output_names_repo() {
        let err = parse_output("owner/repo", b"not json").unwrap_err();
        assert!(matches!(err, OrgHoursError::MalformedOutput { .. }));
        assert!(err.to_string().contains("owner/repo"));
    }

    #[test]
    fn missing_explicit_tool_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_available(&dir.path().join("no-such-tool")).unwrap_err();
        assert!(matches!(err, OrgHoursError::EstimatorMissing(_)));
    }

    #[test]
    fn explicit_tool_that_exists_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("git-hours");
        std::fs::write(&tool, "").unwrap();
        assert_eq!(ensure_available(&tool).unwrap(), tool);
    }

    struct FailingClone {
        urls: RefCell<Vec<String>>,
    }

    impl SourceControl for FailingClone {
        fn clone_full(&self, url: &str, _dest: &Path) -> Result<()> {
            self.urls.borrow_mut().push(url.to_string());
            Err(OrgHoursError::Command {
                command: "git clone".into(),
                status: "exit code 128".into(),
                stderr: "repository not found".into(),
            })
        }
        fn clone_shallow(&self, _url: &str, _dest: &Path) -> Result<()> {
            unreachable!()
        }
        fn checkout_remote_branch(&self, _workdir: &Path, _branch: &str) -> Result<bool> {
            unreachable!()
        }
        fn checkout_orphan(&self, _workdir: &Path, _branch: &str) -> Result<()> {
            unreachable!()
        }
        fn stage_all(&self, _workdir: &Path) -> Result<()> {
            unreachable!()
        }
        fn has_staged_changes(&self, _workdir: &Path) -> Result<bool> {
            unreachable!()
        }
        fn commit_and_push(
            &self,
            _workdir: &Path,
            _branch: &str,
            _identity: &CommitIdentity,
            _message: &str,
        ) -> Result<()> {
            unreachable!()
        }
    }

    #[test]
    fn clone_failure_is_fatal_and_uses_token() {
        let scm = FailingClone {
            urls: RefCell::new(Vec::new()),
        };
        let analyzer =
            GitHoursAnalyzer::new(&scm, "git-hours", "https://github.com", Some("secret".into()));
        let err = analyzer.analyze("owner/private", None).unwrap_err();
        assert!(matches!(err, OrgHoursError::Command { .. }));
        assert!(scm.urls.borrow()[0].contains("x-access-token"));
    }
}
