use crate::error::{OrgHoursError, Result};
use crate::model::{RepoResult, StatsMapping};
use chrono::NaiveDate;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_PREFIX: &str = "git-hours";
pub const AGGREGATED_SLUG: &str = "aggregated";

/// Runs of characters outside `[0-9A-Za-z._-]` collapse to one underscore.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut in_run = false;
    for c in text.replace('/', "_").chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            slug.push(c);
            in_run = false;
        } else if !in_run {
            slug.push('_');
            in_run = true;
        }
    }
    slug
}

pub fn report_file_name(slug: &str, date: NaiveDate) -> String {
    format!("{REPORT_PREFIX}-{slug}-{}.json", date.format("%Y-%m-%d"))
}

pub fn aggregated_file_name(date: NaiveDate) -> String {
    report_file_name(AGGREGATED_SLUG, date)
}

pub fn joined_slug<S: AsRef<str>>(repos: &[S]) -> String {
    repos
        .iter()
        .map(|r| slugify(r.as_ref()))
        .collect::<Vec<_>>()
        .join("-")
}

pub fn primary_report_path<S: AsRef<str>>(reports_dir: &Path, repos: &[S], date: NaiveDate) -> PathBuf {
    match repos {
        [only] => reports_dir.join(report_file_name(&slugify(only.as_ref()), date)),
        _ => reports_dir.join(aggregated_file_name(date)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSet {
    pub repo_reports: Vec<PathBuf>,
    pub aggregated: PathBuf,
    pub primary: PathBuf,
    pub repo_slug: String,
}

pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn write(
        &self,
        results: &[RepoResult],
        aggregate: &StatsMapping,
        date: NaiveDate,
    ) -> Result<ReportSet> {
        fs::create_dir_all(&self.dir)?;

        let mut repo_reports = Vec::with_capacity(results.len());
        for result in results {
            let path = self
                .dir
                .join(report_file_name(&slugify(&result.repo), date));
            match &result.raw {
                Some(raw) => write_json(&path, raw)?,
                None => write_json(&path, &result.stats)?,
            }
            info!(repo = %result.repo, path = %path.display(), "wrote report");
            repo_reports.push(path);
        }

        let aggregated = self.dir.join(aggregated_file_name(date));
        write_json(&aggregated, aggregate)?;
        info!(path = %aggregated.display(), "wrote aggregated report");

        let repos: Vec<&str> = results.iter().map(|r| r.repo.as_str()).collect();
        Ok(ReportSet {
            repo_reports,
            primary: primary_report_path(&self.dir, &repos, date),
            aggregated,
            repo_slug: joined_slug(&repos),
        })
    }
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut body = serde_json::to_string_pretty(value)?;
    body.push('\n');
    fs::write(path, body)?;
    Ok(())
}

pub fn load_report(path: &Path) -> Result<StatsMapping> {
    let raw = fs::read(path)?;
    serde_json::from_slice(&raw)
        .map_err(|e| OrgHoursError::Report(format!("{}: {e}", path.display())))
}

pub fn append_outputs(file: &Path, pairs: &[(&str, String)]) -> Result<()> {
    let mut out = OpenOptions::new().create(true).append(true).open(file)?;
    for (key, value) in pairs {
        writeln!(out, "{key}={value}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContributorStats;
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn slugify_edge_cases() {
        for (text, expected) in [
            ("owner/repo", "owner_repo"),
            ("foo/bar baz", "foo_bar_baz"),
            ("hello world", "hello_world"),
            ("foo@bar#baz", "foo_bar_baz"),
            ("foo@bar/baz qux", "foo_bar_baz_qux"),
            ("octocat/Hello-World", "octocat_Hello-World"),
            ("name%with$chars", "name_with_chars"),
            ("a@@##b", "a_b"),
            ("", ""),
        ] {
            assert_eq!(slugify(text), expected, "slugify({text:?})");
        }
    }

    #[test]
    fn slugify_is_idempotent() {
        for text in ["owner/repo", "foo@bar#baz", "x//y", "ünïcode/repo", "a b\tc"] {
            let once = slugify(text);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn single_repo_primary_is_its_own_report() {
        let path = primary_report_path(Path::new("reports"), &["owner/repo"], date());
        assert_eq!(path, PathBuf::from("reports/git-hours-owner_repo-2024-01-01.json"));
        assert_eq!(joined_slug(&["owner/repo"]), "owner_repo");
    }

    #[test]
    fn multiple_repos_primary_is_aggregate() {
        let repos = ["foo/bar", "baz/qux"];
        let path = primary_report_path(Path::new("reports"), &repos, date());
        assert_eq!(path, PathBuf::from("reports/git-hours-aggregated-2024-01-01.json"));
        assert_eq!(joined_slug(&repos), "foo_bar-baz_qux");
    }

    #[test]
    fn writes_every_report() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("reports");
        let results = vec![
            RepoResult::new(
                "foo/bar",
                StatsMapping::from_contributors([("a@x", ContributorStats::new(1.0, 1))]),
            ),
            RepoResult::new(
                "baz/qux",
                StatsMapping::from_contributors([("b@x", ContributorStats::new(2.0, 3))]),
            ),
        ];
        let agg = crate::aggregate::aggregate(results.iter().map(|r| &r.stats));

        let set = ReportWriter::new(&dir).write(&results, &agg, date()).unwrap();

        assert_eq!(set.repo_reports.len(), 2);
        assert!(dir.join("git-hours-foo_bar-2024-01-01.json").is_file());
        assert!(dir.join("git-hours-baz_qux-2024-01-01.json").is_file());
        assert_eq!(set.primary, set.aggregated);
        assert_eq!(set.repo_slug, "foo_bar-baz_qux");
        assert_eq!(load_report(&set.aggregated).unwrap(), agg);
        assert_eq!(load_report(&set.repo_reports[1]).unwrap(), results[1].stats);
    }

    #[test]
    fn repo_report_keeps_estimator_output() {
        let tmp = tempfile::tempdir().unwrap();
        let raw = serde_json::json!({
            "dev@example.com": {"hours": 2, "commits": 3, "name": "Dev"},
            "total": {"hours": 2, "commits": 3}
        });
        let result = RepoResult::from_output("o/r", raw.clone()).unwrap();
        let set = ReportWriter::new(tmp.path())
            .write(&[result.clone()], &result.stats, date())
            .unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&set.repo_reports[0]).unwrap()).unwrap();
        assert_eq!(written, raw);
        assert_eq!(written["total"]["hours"].as_u64(), Some(2));
    }

    #[test]
    fn rewrites_same_day_report() {
        let tmp = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(tmp.path());
        let first = vec![RepoResult::new("o/r", StatsMapping::new())];
        writer.write(&first, &StatsMapping::new(), date()).unwrap();

        let stats = StatsMapping::from_contributors([("dev", ContributorStats::new(4.0, 2))]);
        let second = vec![RepoResult::new("o/r", stats.clone())];
        let set = writer.write(&second, &stats, date()).unwrap();
        assert_eq!(load_report(&set.primary).unwrap(), stats);
    }

    #[test]
    fn outputs_are_appended() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("out.txt");
        fs::write(&file, "existing=1\n").unwrap();
        append_outputs(
            &file,
            &[
                ("aggregated_report", "reports/a.json".to_string()),
                ("repo_slug", "o_r".to_string()),
            ],
        )
        .unwrap();
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "existing=1\naggregated_report=reports/a.json\nrepo_slug=o_r\n"
        );
    }
}
