use crate::aggregate::aggregate;
use crate::cli::{CommonArgs, RunArgs};
use crate::clock::{clock_for, Clock};
use crate::config::{resolve_window_start, Config, PublishTarget};
use crate::error::Result;
use crate::estimator::{ensure_available, Analyzer, GitHoursAnalyzer};
use crate::git::{remote_url, GitCli, SourceControl};
use crate::model::{RepoResult, StatsMapping};
use crate::publish::{PublishOutcome, Publisher};
use crate::report::{append_outputs, ReportSet, ReportWriter};
use crate::site::{DashboardBuilder, SiteArtifacts};
use anyhow::Context;
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use tracing::info;

#[derive(Debug)]
pub struct RunSummary {
    pub results: Vec<RepoResult>,
    pub aggregate: StatsMapping,
    pub reports: ReportSet,
    pub site: Option<SiteArtifacts>,
    pub published: Vec<(String, PublishOutcome)>,
}

pub fn exec(common: CommonArgs, run: RunArgs) -> anyhow::Result<()> {
    let config = Config::from_args(&common, &run)?;
    let clock = clock_for(common.date.as_deref()).context("Invalid report date")?;
    let estimator = ensure_available(&config.estimator)?;

    let scm = GitCli::default();
    let analyzer = GitHoursAnalyzer::new(&scm, estimator, &config.git_host, config.token.clone());

    let mut stdout = std::io::stdout().lock();
    let summary = execute(&config, &analyzer, &scm, clock.as_ref(), &mut stdout)?;
    drop(stdout);

    print_summary(&summary)?;
    Ok(())
}

pub fn execute(
    config: &Config,
    analyzer: &dyn Analyzer,
    scm: &dyn SourceControl,
    clock: &dyn Clock,
    out: &mut dyn Write,
) -> Result<RunSummary> {
    let date = clock.today();
    let since = config
        .window_start
        .as_deref()
        .map(|raw| resolve_window_start(raw, date));

    let mut results = Vec::with_capacity(config.repos.len());
    for repo in &config.repos {
        info!(repo = %repo, since = since.as_deref().unwrap_or("always"), "processing");
        let spinner = spinner(format!("Analyzing {repo}..."));
        let result = analyzer.analyze(repo, since.as_deref());
        spinner.finish_and_clear();
        results.push(result?);
    }

    let aggregate = aggregate(results.iter().map(|r| &r.stats));
    let reports = ReportWriter::new(&config.reports_dir).write(&results, &aggregate, date)?;

    if let Some(file) = &config.output_file {
        append_outputs(
            file,
            &[
                ("aggregated_report", reports.primary.display().to_string()),
                ("repo_slug", reports.repo_slug.clone()),
            ],
        )?;
    }

    writeln!(out, "{}", serde_json::to_string_pretty(&aggregate)?)?;

    let mut published = Vec::new();
    let mut site = None;
    if let Some(target) = &config.publish {
        published.push(publish_to(config, scm, target, &target.metrics_branch, &config.reports_dir)?);

        if let Some(pages_branch) = &target.pages_branch {
            info!(branch = %pages_branch, "building dashboard");
            let artifacts = DashboardBuilder {
                site_dir: &config.site_dir,
                generated_at: clock.now(),
                repo_count: Some(results.len()),
            }
            .build(&aggregate, &reports.aggregated)?;
            site = Some(artifacts);
            published.push(publish_to(config, scm, target, pages_branch, &config.site_dir)?);
        }
    }

    Ok(RunSummary {
        results,
        aggregate,
        reports,
        site,
        published,
    })
}

fn publish_to(
    config: &Config,
    scm: &dyn SourceControl,
    target: &PublishTarget,
    branch: &str,
    source: &std::path::Path,
) -> Result<(String, PublishOutcome)> {
    info!(branch, source = %source.display(), "publishing");
    let url = remote_url(&config.git_host, &target.repository, Some(target.token.as_str()));
    let outcome = Publisher::new(scm, url).publish(branch, source)?;
    Ok((branch.to_string(), outcome))
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn print_summary(summary: &RunSummary) -> anyhow::Result<()> {
    let term = Term::stderr();
    let agg = &summary.aggregate;

    term.write_line(&format!("{}", style("Coding Hours Summary").bold()))?;
    term.write_line(&"─".repeat(72))?;
    term.write_line(&format!(
        "{:<50} {:>10} {:>10}",
        style("Contributor").bold(),
        style("Hours").bold(),
        style("Commits").bold()
    ))?;
    for (contributor, stats) in agg.ranked().into_iter().take(25) {
        term.write_line(&format!(
            "{:<50} {:>10} {:>10}",
            contributor, stats.hours, stats.commits
        ))?;
    }
    if agg.contributor_count() > 25 {
        term.write_line(&format!("... and {} more contributors", agg.contributor_count() - 25))?;
    }
    term.write_line(&format!(
        "Total: {} hours, {} commits across {} repositories",
        style(agg.total.hours).cyan(),
        style(agg.total.commits).cyan(),
        style(summary.results.len()).yellow()
    ))?;
    term.write_line(&format!(
        "Primary report: {}",
        style(summary.reports.primary.display()).dim()
    ))?;

    for (branch, outcome) in &summary.published {
        let line = match outcome {
            PublishOutcome::Committed => format!("Pushed to branch '{}'", style(branch).green()),
            PublishOutcome::Unchanged => format!("No changes to commit for branch '{branch}'"),
        };
        term.write_line(&line)?;
    }
    Ok(())
}
