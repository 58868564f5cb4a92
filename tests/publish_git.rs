use orghours::git::{remote_url, GitCli};
use orghours::publish::{PublishOutcome, Publisher};
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8(out.stdout).unwrap()
}

/// A bare hosting repository at `<root>/host/org/site.git` whose default
/// branch holds `README.md` and `src/lib.rs`.
fn hosting_repo(root: &Path) -> (String, std::path::PathBuf) {
    let seed = root.join("seed");
    fs::create_dir_all(seed.join("src")).unwrap();
    git(&seed, &["init", "--quiet"]);
    git(&seed, &["config", "user.email", "you@example.com"]);
    git(&seed, &["config", "user.name", "Your Name"]);
    fs::write(seed.join("README.md"), "hosting\n").unwrap();
    fs::write(seed.join("src/lib.rs"), "\n").unwrap();
    git(&seed, &["add", "."]);
    git(&seed, &["commit", "--quiet", "-m", "init"]);

    let bare = root.join("host/org/site.git");
    fs::create_dir_all(bare.parent().unwrap()).unwrap();
    git(
        root,
        &["clone", "--quiet", "--bare", seed.to_str().unwrap(), bare.to_str().unwrap()],
    );

    let host = format!("file://{}", root.join("host").display());
    (remote_url(&host, "org/site", Some("ignored-token")), bare)
}

fn branch_files(bare: &Path, branch: &str) -> Vec<String> {
    git(bare, &["ls-tree", "-r", "--name-only", branch])
        .lines()
        .map(str::to_string)
        .collect()
}

fn commit_count(bare: &Path, branch: &str) -> usize {
    git(bare, &["rev-list", "--count", branch]).trim().parse().unwrap()
}

#[test]
fn publishes_to_new_then_existing_branch() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    let (url, bare) = hosting_repo(dir.path());
    let scm = GitCli::default();
    let publisher = Publisher::new(&scm, url);

    let first = dir.path().join("first");
    fs::create_dir_all(first.join("nested")).unwrap();
    fs::write(first.join("git-hours-aggregated-2024-01-01.json"), "{}\n").unwrap();
    fs::write(first.join("nested/extra.json"), "[]\n").unwrap();

    assert_eq!(publisher.publish("metrics", &first).unwrap(), PublishOutcome::Committed);
    assert_eq!(
        branch_files(&bare, "metrics"),
        vec!["git-hours-aggregated-2024-01-01.json", "nested/extra.json"]
    );
    assert_eq!(commit_count(&bare, "metrics"), 1);

    let second = dir.path().join("second");
    fs::create_dir_all(&second).unwrap();
    fs::write(second.join("git-hours-aggregated-2024-01-02.json"), "{}\n").unwrap();

    assert_eq!(publisher.publish("metrics", &second).unwrap(), PublishOutcome::Committed);
    assert_eq!(
        branch_files(&bare, "metrics"),
        vec![
            "git-hours-aggregated-2024-01-01.json",
            "git-hours-aggregated-2024-01-02.json",
            "nested/extra.json",
        ]
    );
    assert_eq!(commit_count(&bare, "metrics"), 2);

    assert_eq!(publisher.publish("metrics", &second).unwrap(), PublishOutcome::Unchanged);
    assert_eq!(commit_count(&bare, "metrics"), 2);
}

#[test]
fn unreachable_remote_is_fatal() {
    let dir = tempdir().unwrap();
    if !has_git() {
        return;
    }
    let source = dir.path().join("reports");
    fs::create_dir_all(&source).unwrap();
    let url = format!("file://{}/nowhere/repo.git", dir.path().display());
    let scm = GitCli::default();
    assert!(Publisher::new(&scm, url).publish("metrics", &source).is_err());
}
