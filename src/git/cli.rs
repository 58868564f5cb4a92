use super::{redact_credentials, CommitIdentity, SourceControl};
use crate::error::{OrgHoursError, Result};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command<I, S>(&self, args: I, cwd: Option<&Path>) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.program);
        cmd.args(args);
        // Never block on a credential prompt.
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        cmd
    }

    fn output<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<(String, Output)>
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<OsStr>,
    {
        let line = std::iter::once(self.program.as_os_str().to_string_lossy().into_owned())
            .chain(
                args.clone()
                    .into_iter()
                    .map(|a| a.as_ref().to_string_lossy().into_owned()),
            )
            .collect::<Vec<_>>()
            .join(" ");
        let line = redact_credentials(&line);
        debug!(command = %line, "running git");
        let output = self.command(args, cwd).output()?;
        Ok((line, output))
    }

    fn run<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<Output>
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<OsStr>,
    {
        let (line, output) = self.output(args, cwd)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(command_failed(line, &output))
        }
    }

    fn status_code<I, S>(&self, args: I, cwd: Option<&Path>) -> Result<(String, Output, Option<i32>)>
    where
        I: IntoIterator<Item = S> + Clone,
        S: AsRef<OsStr>,
    {
        let (line, output) = self.output(args, cwd)?;
        let code = output.status.code();
        Ok((line, output, code))
    }
}

fn command_failed(command: String, output: &Output) -> OrgHoursError {
    let status = match output.status.code() {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    };
    OrgHoursError::Command {
        command,
        status,
        stderr: redact_credentials(String::from_utf8_lossy(&output.stderr).trim()),
    }
}

impl SourceControl for GitCli {
    fn clone_full(&self, url: &str, dest: &Path) -> Result<()> {
        self.run(
            [OsStr::new("clone"), OsStr::new("--quiet"), OsStr::new(url), dest.as_os_str()],
            None,
        )?;
        Ok(())
    }

    fn clone_shallow(&self, url: &str, dest: &Path) -> Result<()> {
        self.run(
            [
                OsStr::new("clone"),
                OsStr::new("--quiet"),
                OsStr::new("--depth"),
                OsStr::new("1"),
                OsStr::new(url),
                dest.as_os_str(),
            ],
            None,
        )?;
        Ok(())
    }

    fn checkout_remote_branch(&self, workdir: &Path, branch: &str) -> Result<bool> {
        let head = format!("refs/heads/{branch}");
        let (line, output, code) = self.status_code(
            ["ls-remote", "--exit-code", "--heads", "origin", head.as_str()],
            Some(workdir),
        )?;
        match code {
            Some(0) => {}
            // ls-remote --exit-code reports "no matching refs" with status 2
            Some(2) => return Ok(false),
            _ => return Err(command_failed(line, &output)),
        }

        // A shallow clone only tracks the default branch, so name the
        // destination ref explicitly.
        let refspec = format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
        self.run(
            ["fetch", "--quiet", "--depth", "1", "origin", refspec.as_str()],
            Some(workdir),
        )?;
        let upstream = format!("origin/{branch}");
        self.run(
            ["checkout", "--quiet", "-B", branch, upstream.as_str()],
            Some(workdir),
        )?;
        Ok(true)
    }

    fn checkout_orphan(&self, workdir: &Path, branch: &str) -> Result<()> {
        self.run(["checkout", "--quiet", "--orphan", branch], Some(workdir))?;
        Ok(())
    }

    fn stage_all(&self, workdir: &Path) -> Result<()> {
        self.run(["add", "--all", "."], Some(workdir))?;
        Ok(())
    }

    fn has_staged_changes(&self, workdir: &Path) -> Result<bool> {
        let (line, output, code) =
            self.status_code(["diff", "--cached", "--quiet"], Some(workdir))?;
        match code {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(command_failed(line, &output)),
        }
    }

    fn commit_and_push(
        &self,
        workdir: &Path,
        branch: &str,
        identity: &CommitIdentity,
        message: &str,
    ) -> Result<()> {
        self.run(["config", "user.name", identity.name.as_str()], Some(workdir))?;
        self.run(["config", "user.email", identity.email.as_str()], Some(workdir))?;
        self.run(["commit", "--quiet", "-m", message], Some(workdir))?;
        self.run(["push", "--quiet", "-u", "origin", branch], Some(workdir))?;
        Ok(())
    }
}
