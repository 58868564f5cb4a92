use crate::cli::CommonArgs;
use crate::config::publish_target;
use crate::error::{OrgHoursError, Result};
use crate::git::{remote_url, CommitIdentity, GitCli, SourceControl};
use anyhow::Context;
use console::style;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn exec(
    common: CommonArgs,
    branch: String,
    source: PathBuf,
    repository: Option<String>,
) -> anyhow::Result<()> {
    let target = publish_target(common.token.as_deref(), repository.as_deref(), branch, None)?;
    let url = remote_url(&common.git_host, &target.repository, Some(target.token.as_str()));
    let branch = target.metrics_branch;

    let scm = GitCli::default();
    let outcome = Publisher::new(&scm, url)
        .publish(&branch, &source)
        .with_context(|| format!("Failed to publish {} to '{}'", source.display(), branch))?;

    match outcome {
        PublishOutcome::Committed => println!(
            "Pushed {} to branch '{}'",
            source.display(),
            style(&branch).green()
        ),
        PublishOutcome::Unchanged => println!("No changes to commit for branch '{branch}'"),
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Committed,
    Unchanged,
}

pub struct Publisher<'a> {
    scm: &'a dyn SourceControl,
    remote_url: String,
    identity: CommitIdentity,
}

impl<'a> Publisher<'a> {
    pub fn new(scm: &'a dyn SourceControl, remote_url: impl Into<String>) -> Self {
        Self {
            scm,
            remote_url: remote_url.into(),
            identity: CommitIdentity::default(),
        }
    }

    /// A branch missing on the remote is started with empty history.
    pub fn publish(&self, branch: &str, source: &Path) -> Result<PublishOutcome> {
        if !source.exists() {
            return Err(OrgHoursError::Report(format!(
                "Source path '{}' not found",
                source.display()
            )));
        }

        let checkout = tempfile::Builder::new().prefix("orghours-push-").tempdir()?;
        let workdir = checkout.path();
        self.scm.clone_shallow(&self.remote_url, workdir)?;

        if !self.scm.checkout_remote_branch(workdir, branch)? {
            info!(branch, "branch missing on remote, starting it with empty history");
            self.scm.checkout_orphan(workdir, branch)?;
            clear_worktree(workdir)?;
        }

        copy_into(source, workdir)?;
        self.scm.stage_all(workdir)?;

        if !self.scm.has_staged_changes(workdir)? {
            info!(branch, "no changes to commit");
            return Ok(PublishOutcome::Unchanged);
        }

        let message = format!("Update {branch} data");
        self.scm
            .commit_and_push(workdir, branch, &self.identity, &message)?;
        info!(branch, "pushed");
        Ok(PublishOutcome::Committed)
    }
}

fn clear_worktree(dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn copy_into(source: &Path, dest: &Path) -> Result<()> {
    if source.is_file() {
        let name = source.file_name().ok_or_else(|| {
            OrgHoursError::Report(format!("{} has no file name", source.display()))
        })?;
        fs::copy(source, dest.join(name))?;
        return Ok(());
    }

    let walker = WalkBuilder::new(source)
        .standard_filters(false)
        .follow_links(true)
        .build();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| OrgHoursError::Report(e.to_string()))?;
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
    }
    Ok(())
}
