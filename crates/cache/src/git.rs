//! Git probes via the system `git` binary
//!
//! Using the installed git means repository quirks (worktrees, submodules,
//! sparse checkouts) resolve exactly as they would for the user.

use crate::error::CacheError;
use std::path::{Path, PathBuf};
use std::process::Command;

pub fn is_repo_root(path: &Path) -> bool {
    path.join(".git").exists()
}

fn run_git(repo: &Path, args: &[&str]) -> Result<Vec<u8>, CacheError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(|e| CacheError::GitCommand {
            command: args.join(" "),
            path: repo.to_path_buf(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(CacheError::GitCommand {
            command: args.join(" "),
            path: repo.to_path_buf(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Current head revision id of the repository.
pub fn head_commit(repo: &Path) -> Result<String, CacheError> {
    let stdout = run_git(repo, &["rev-parse", "HEAD"])?;
    Ok(String::from_utf8_lossy(&stdout).trim().to_string())
}

/// Paths of all tracked files, relative to the repository root. NUL-separated
/// output so unusual filenames survive.
pub fn tracked_files(repo: &Path) -> Result<Vec<PathBuf>, CacheError> {
    let stdout = run_git(repo, &["ls-files", "-z"])?;
    let files = stdout
        .split(|&b| b == 0)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| PathBuf::from(String::from_utf8_lossy(chunk).into_owned()))
        .collect();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_is_repo_root() {
        let dir = TempDir::new().unwrap();
        assert!(!is_repo_root(dir.path()));

        std::fs::create_dir(dir.path().join(".git")).unwrap();
        assert!(is_repo_root(dir.path()));
    }

    #[test]
    fn test_head_commit_fails_outside_a_repository() {
        let dir = TempDir::new().unwrap();
        let err = head_commit(dir.path()).unwrap_err();
        assert!(matches!(err, CacheError::GitCommand { .. }));
    }
}
