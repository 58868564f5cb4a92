use crate::cli::CommonArgs;
use crate::clock::clock_for;
use crate::error::{OrgHoursError, Result};
use crate::model::StatsMapping;
use crate::report::{load_report, AGGREGATED_SLUG, REPORT_PREFIX};
use anyhow::Context;
use chrono::{DateTime, Utc};
use console::style;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const LATEST_FILE: &str = "git-hours-latest.json";
pub const DATA_DIR: &str = "data";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteArtifacts {
    pub index: PathBuf,
    pub latest: PathBuf,
    pub archived: PathBuf,
}

pub fn exec(common: CommonArgs) -> anyhow::Result<()> {
    let clock = clock_for(common.date.as_deref()).context("Invalid report date")?;
    let report = find_latest_aggregated(&common.reports_dir)
        .context("Failed to locate an aggregated report")?;
    let aggregate = load_report(&report)?;

    let artifacts = DashboardBuilder {
        site_dir: &common.site_dir,
        generated_at: clock.now(),
        repo_count: None,
    }
    .build(&aggregate, &report)
    .context("Failed to build dashboard")?;

    println!(
        "Dashboard written to {} from {}",
        style(artifacts.index.display()).green(),
        style(report.display()).dim()
    );
    Ok(())
}

pub struct DashboardBuilder<'a> {
    pub site_dir: &'a Path,
    pub generated_at: DateTime<Utc>,
    pub repo_count: Option<usize>,
}

impl DashboardBuilder<'_> {
    pub fn build(&self, aggregate: &StatsMapping, aggregated_path: &Path) -> Result<SiteArtifacts> {
        let file_name = aggregated_path.file_name().ok_or_else(|| {
            OrgHoursError::Report(format!("{} has no file name", aggregated_path.display()))
        })?;

        let data_dir = self.site_dir.join(DATA_DIR);
        fs::create_dir_all(&data_dir)?;

        let latest = self.site_dir.join(LATEST_FILE);
        let archived = data_dir.join(file_name);
        fs::copy(aggregated_path, &latest)?;
        fs::copy(aggregated_path, &archived)?;

        let index = self.site_dir.join("index.html");
        fs::write(&index, render_page(aggregate, self.generated_at, self.repo_count))?;
        info!(site = %self.site_dir.display(), "dashboard built");

        Ok(SiteArtifacts {
            index,
            latest,
            archived,
        })
    }
}

pub fn find_latest_aggregated(reports_dir: &Path) -> Result<PathBuf> {
    let prefix = format!("{REPORT_PREFIX}-{AGGREGATED_SLUG}-");
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;

    for entry in fs::read_dir(reports_dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if !name.starts_with(&prefix) || !name.ends_with(".json") {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        let path = entry.path();
        let replace = match &newest {
            None => true,
            Some((best, best_path)) => {
                modified > *best || (modified == *best && path > *best_path)
            }
        };
        if replace {
            newest = Some((modified, path));
        }
    }

    newest.map(|(_, path)| path).ok_or_else(|| {
        OrgHoursError::Report(format!(
            "No aggregated report found in {}",
            reports_dir.display()
        ))
    })
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_page(
    aggregate: &StatsMapping,
    generated_at: DateTime<Utc>,
    repo_count: Option<usize>,
) -> String {
    let mut rows = String::new();
    for (contributor, stats) in aggregate.ranked() {
        let _ = writeln!(
            rows,
            "        <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape_html(contributor),
            stats.hours,
            stats.commits
        );
    }

    let repos_item = repo_count
        .map(|n| format!("\n    <li><strong>Repositories</strong>: {n}</li>"))
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Organization Coding Hours</title>
  <link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/simpledotcss/simple.min.css">
  <script src="https://cdn.jsdelivr.net/npm/sortable-tablesort/sortable.min.js" defer></script>
  <script src="https://cdn.jsdelivr.net/npm/chart.js"></script>
  <style>canvas {{ max-height: 400px }}</style>
</head>
<body>
<main>
  <h1>Organization Coding Hours</h1>
  <p><em>Last updated {updated}</em></p>

  <h2>Totals</h2>
  <ul>
    <li><strong>Hours</strong>: {hours}</li>
    <li><strong>Commits</strong>: {commits}</li>
    <li><strong>Contributors</strong>: {contributors}</li>{repos_item}
  </ul>

  <h2>Hours per contributor</h2>
  <canvas id="hoursChart"></canvas>

  <h2>Detail table</h2>
  <table class="sortable">
    <thead><tr><th>Contributor</th><th>Hours</th><th>Commits</th></tr></thead>
    <tbody>
{rows}    </tbody>
  </table>

  <p>Historical JSON snapshots live in <code>/{data_dir}</code>.</p>

  <script>
    fetch('{latest}')
      .then(r => r.json())
      .then(d => {{
        const labels = Object.keys(d)
          .filter(k => k !== 'total')
          .sort((a, b) => d[b].hours - d[a].hours);
        const hours = labels.map(l => d[l].hours);
        new Chart(document.getElementById('hoursChart'), {{
          type: 'bar',
          data: {{ labels, datasets: [{{ label: 'Hours', data: hours }}] }},
          options: {{
            responsive: true,
            maintainAspectRatio: false,
            plugins: {{ legend: {{ display: false }} }},
            scales: {{ y: {{ beginAtZero: true }} }}
          }}
        }});
      }});
  </script>
</main>
</body>
</html>
"#,
        updated = generated_at.format("%Y-%m-%d %H:%M UTC"),
        hours = aggregate.total.hours,
        commits = aggregate.total.commits,
        contributors = aggregate.contributor_count(),
        data_dir = DATA_DIR,
        latest = LATEST_FILE,
    )
}
