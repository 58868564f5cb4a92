use crate::config::{DEFAULT_ESTIMATOR, DEFAULT_GIT_HOST};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orghours")]
#[command(about = "Aggregate per-contributor coding hours across repositories and publish reports")]
#[command(version)]
pub struct Cli {
    #[clap(flatten)]
    pub common: CommonArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    #[arg(long, global = true, env = "REPORTS_DIR", default_value = "reports", help = "Directory for JSON reports")]
    pub reports_dir: PathBuf,

    #[arg(long, global = true, env = "SITE_DIR", default_value = "site", help = "Directory for the generated dashboard")]
    pub site_dir: PathBuf,

    #[arg(long, global = true, env = "GITHUB_TOKEN", hide_env_values = true, help = "Token for private clones and publishing")]
    pub token: Option<String>,

    #[arg(long, global = true, env = "GIT_HOST", default_value = DEFAULT_GIT_HOST, help = "Base URL repositories are cloned from")]
    pub git_host: String,

    #[arg(long, global = true, env = "REPORT_DATE", help = "Report date (YYYY-MM-DD), defaults to today")]
    pub date: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    #[arg(long, env = "REPOS", help = "Space-separated owner/name repositories to analyze")]
    pub repos: Option<String>,

    #[arg(long, env = "WINDOW_START", help = "Only count commits since this date (YYYY-MM-DD or a duration such as 90days)")]
    pub since: Option<String>,

    #[arg(long, env = "METRICS_BRANCH", help = "Branch to publish JSON reports to")]
    pub metrics_branch: Option<String>,

    #[arg(long, env = "PAGES_BRANCH", help = "Branch to publish the dashboard to (requires --metrics-branch)")]
    pub pages_branch: Option<String>,

    #[arg(long, env = "GITHUB_REPOSITORY", help = "owner/name of the repository to publish to")]
    pub repository: Option<String>,

    #[arg(long, env = "GITHUB_OUTPUT", help = "File receiving key=value output lines")]
    pub output_file: Option<PathBuf>,

    #[arg(long, env = "GIT_HOURS_BIN", default_value = DEFAULT_ESTIMATOR, help = "Estimator executable")]
    pub estimator: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze repositories, write reports and publish them (default)
    Run(RunArgs),
    /// Render the dashboard from the newest aggregated report
    BuildSite,
    /// Commit a directory or file to a branch of the hosting repository
    Publish {
        #[arg(help = "Target branch")]
        branch: String,

        #[arg(help = "Directory or file to publish")]
        source: PathBuf,

        #[arg(long, env = "GITHUB_REPOSITORY", help = "owner/name of the repository to publish to")]
        repository: Option<String>,
    },
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        match self.command {
            None => {
                let run = RunArgs::parse_env()?;
                crate::run::exec(self.common, run)
            }
            Some(Commands::Run(run)) => crate::run::exec(self.common, run),
            Some(Commands::BuildSite) => crate::site::exec(self.common),
            Some(Commands::Publish {
                branch,
                source,
                repository,
            }) => crate::publish::exec(self.common, branch, source, repository),
        }
    }
}

/// Parses only environment fallbacks for `run` when no subcommand is given.
#[derive(Parser)]
#[command(no_binary_name = true)]
struct EnvOnly {
    #[clap(flatten)]
    run: RunArgs,
}

impl RunArgs {
    fn parse_env() -> Result<Self> {
        let parsed = EnvOnly::try_parse_from(std::iter::empty::<String>())?;
        Ok(parsed.run)
    }
}
