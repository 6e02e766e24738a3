//! End-to-end staleness behavior against real git repositories.

use repoatlas_cache::staleness::{compute_staleness, Freshness, StaleReason};
use repoatlas_cache::store::{build_cache_entry, snapshot_repos, CacheEntry, CacheSnapshot};
use repoatlas_core::model::RepoInfo;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .args([
            "-c",
            "user.name=atlas-test",
            "-c",
            "user.email=atlas-test@localhost",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(repo)
        .status()
        .expect("git must be installed for these tests");
    assert!(status.success(), "git {args:?} failed in {repo:?}");
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "-q"]);
    fs::write(dir.join("README.md"), "# fixture\n").unwrap();
    fs::create_dir_all(dir.join("src")).unwrap();
    fs::write(dir.join("src/main.rs"), "fn main() {}\n").unwrap();
    git(dir, &["add", "."]);
    git(dir, &["commit", "-q", "-m", "initial"]);
}

fn repo_info(name: &str, dir: &Path) -> RepoInfo {
    RepoInfo::new(name, dir, true)
}

fn snapshot_of(name: &str, dir: &Path) -> CacheSnapshot {
    let mut snapshot = CacheSnapshot::new();
    snapshot
        .repos
        .insert(name.to_string(), build_cache_entry(dir).unwrap());
    snapshot
}

#[test]
fn test_unchanged_repo_is_fresh() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());

    let snapshot = snapshot_of("api", dir.path());
    let report = compute_staleness(&[repo_info("api", dir.path())], Some(&snapshot));

    assert!(report.is_fully_fresh());
}

#[test]
fn test_uncommitted_edit_is_stale_despite_unchanged_commit() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let snapshot = snapshot_of("api", dir.path());

    fs::write(dir.path().join("src/main.rs"), "fn main() { todo!() }\n").unwrap();

    let report = compute_staleness(&[repo_info("api", dir.path())], Some(&snapshot));
    assert_eq!(
        report.repos[0].freshness,
        Freshness::Stale(StaleReason::ContentChanged)
    );
}

#[test]
fn test_new_commit_is_stale_regardless_of_content_hash() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let snapshot = snapshot_of("api", dir.path());

    fs::write(dir.path().join("NOTES.md"), "notes\n").unwrap();
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "-q", "-m", "notes"]);

    let report = compute_staleness(&[repo_info("api", dir.path())], Some(&snapshot));
    assert_eq!(
        report.repos[0].freshness,
        Freshness::Stale(StaleReason::NewCommit)
    );
}

#[test]
fn test_probe_failure_degrades_to_stale_without_aborting() {
    let broken = TempDir::new().unwrap(); // plain directory, no .git
    let healthy = TempDir::new().unwrap();
    init_repo(healthy.path());

    let mut snapshot = snapshot_of("healthy", healthy.path());
    snapshot.repos.insert(
        "broken".to_string(),
        CacheEntry {
            commit_id: "deadbeef".to_string(),
            content_hash: "deadbeef".to_string(),
            scanned_at: chrono::Utc::now(),
        },
    );

    let repos = vec![
        repo_info("broken", broken.path()),
        repo_info("healthy", healthy.path()),
    ];
    let report = compute_staleness(&repos, Some(&snapshot));

    assert_eq!(
        report.repos[0].freshness,
        Freshness::Stale(StaleReason::ProbeFailed)
    );
    assert_eq!(report.repos[1].freshness, Freshness::Fresh);
    assert!(!report.is_fully_fresh());
}

#[test]
fn test_build_cache_entry_ignores_untracked_files() {
    let dir = TempDir::new().unwrap();
    init_repo(dir.path());
    let before = build_cache_entry(dir.path()).unwrap();

    // Untracked files are invisible to `git ls-files`, so the fingerprint
    // holds until they are added.
    fs::write(dir.path().join("scratch.tmp"), "scratch\n").unwrap();
    let after = build_cache_entry(dir.path()).unwrap();

    assert_eq!(before.commit_id, after.commit_id);
    assert_eq!(before.content_hash, after.content_hash);
}

#[test]
fn test_snapshot_repos_omits_non_git_repos() {
    let with_git = TempDir::new().unwrap();
    init_repo(with_git.path());
    let without_git = TempDir::new().unwrap();

    let repos = vec![
        repo_info("tracked", with_git.path()),
        RepoInfo::new("loose", without_git.path(), false),
    ];
    let snapshot = snapshot_repos(repos.iter());

    assert!(snapshot.repos.contains_key("tracked"));
    assert!(!snapshot.repos.contains_key("loose"));
}

#[test]
fn test_snapshot_then_staleness_round_trip() {
    let a = TempDir::new().unwrap();
    init_repo(a.path());
    let b = TempDir::new().unwrap();
    init_repo(b.path());

    let repos = vec![repo_info("a", a.path()), repo_info("b", b.path())];
    let snapshot = snapshot_repos(repos.iter());
    assert!(compute_staleness(&repos, Some(&snapshot)).is_fully_fresh());

    // Touch one repo; only that repo goes stale.
    fs::write(a.path().join("README.md"), "# changed\n").unwrap();
    let report = compute_staleness(&repos, Some(&snapshot));
    assert_eq!(
        report.repos[0].freshness,
        Freshness::Stale(StaleReason::ContentChanged)
    );
    assert_eq!(report.repos[1].freshness, Freshness::Fresh);
}
