mod cli;

pub use cli::GitCli;

use crate::error::Result;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitIdentity {
    pub name: String,
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        Self {
            name: "github-actions".to_string(),
            email: "actions@users.noreply.github.com".to_string(),
        }
    }
}

pub trait SourceControl {
    fn clone_full(&self, url: &str, dest: &Path) -> Result<()>;

    fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()>;

    /// `Ok(false)` when the branch does not exist on the remote.
    fn checkout_remote_branch(&self, workdir: &Path, branch: &str) -> Result<bool>;

    fn checkout_orphan(&self, workdir: &Path, branch: &str) -> Result<()>;

    fn stage_all(&self, workdir: &Path) -> Result<()>;

    fn has_staged_changes(&self, workdir: &Path) -> Result<bool>;

    fn commit_and_push(
        &self,
        workdir: &Path,
        branch: &str,
        identity: &CommitIdentity,
        message: &str,
    ) -> Result<()>;
}

/// The token is embedded only for http(s) hosts.
pub fn remote_url(host: &str, repo: &str, token: Option<&str>) -> String {
    let host = host.trim_end_matches('/');
    let token = token.filter(|t| !t.is_empty());
    if let Some(token) = token {
        for scheme in ["https://", "http://"] {
            if let Some(rest) = host.strip_prefix(scheme) {
                return format!("{scheme}x-access-token:{token}@{rest}/{repo}.git");
            }
        }
    }
    format!("{host}/{repo}.git")
}

pub fn redact_credentials(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(idx) = rest.find("://") {
        let (head, tail) = rest.split_at(idx + 3);
        out.push_str(head);
        let authority_end = tail
            .find(|c: char| c == '/' || c.is_whitespace() || c == '"' || c == '\'')
            .unwrap_or(tail.len());
        match tail[..authority_end].rfind('@') {
            Some(at) => {
                out.push_str("***");
                out.push_str(&tail[at..authority_end]);
            }
            None => out.push_str(&tail[..authority_end]),
        }
        rest = &tail[authority_end..];
    }
    out.push_str(rest);
    out
}
