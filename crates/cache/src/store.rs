//! Persisted per-repository fingerprints
//!
//! The snapshot is read once at run start and rebuilt from scratch at run
//! end. Anything wrong with the file on disk (missing, unreadable, malformed,
//! written by an incompatible version) simply means "no prior data"; loading
//! never fails a run.

use crate::error::CacheError;
use crate::git;
use crate::hash;
use chrono::{DateTime, Utc};
use repoatlas_core::model::RepoInfo;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Bumped whenever the snapshot layout changes; older snapshots are ignored.
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub commit_id: String,
    pub content_hash: String,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    pub repos: BTreeMap<String, CacheEntry>,
}

impl CacheSnapshot {
    pub fn new() -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            repos: BTreeMap::new(),
        }
    }
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a snapshot, treating every failure mode as "no prior data".
pub fn load_cache(path: &Path) -> Option<CacheSnapshot> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!(path = %path.display(), "no readable cache snapshot: {err}");
            return None;
        }
    };

    let snapshot: CacheSnapshot = match serde_json::from_slice(&bytes) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            debug!(path = %path.display(), "malformed cache snapshot ignored: {err}");
            return None;
        }
    };

    if snapshot.version != CACHE_FORMAT_VERSION {
        debug!(
            path = %path.display(),
            found = snapshot.version,
            expected = CACHE_FORMAT_VERSION,
            "cache snapshot version mismatch, ignoring"
        );
        return None;
    }

    Some(snapshot)
}

/// Persist a snapshot unconditionally, creating parent directories as needed.
pub fn save_cache(path: &Path, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let bytes = serde_json::to_vec_pretty(snapshot)?;
    fs::write(path, bytes)?;
    Ok(())
}

/// Fingerprint one repository: head revision id plus the aggregate hash of
/// every tracked file's contents.
pub fn build_cache_entry(repo: &Path) -> Result<CacheEntry, CacheError> {
    if !git::is_repo_root(repo) {
        return Err(CacheError::NotARepository {
            path: repo.to_path_buf(),
        });
    }

    let commit_id = git::head_commit(repo)?;
    let files = git::tracked_files(repo)?;
    let content_hash = hash::aggregate_hash(repo, &files)?;

    Ok(CacheEntry {
        commit_id,
        content_hash,
        scanned_at: Utc::now(),
    })
}

/// Build a fresh snapshot covering every repo with a revision-control root.
/// Repos without one are omitted; a repo whose fingerprint cannot be built is
/// skipped rather than failing the whole snapshot.
pub fn snapshot_repos<'a, I>(repos: I) -> CacheSnapshot
where
    I: IntoIterator<Item = &'a RepoInfo>,
{
    let mut snapshot = CacheSnapshot::new();
    for repo in repos {
        if !repo.has_git_root {
            continue;
        }
        match build_cache_entry(&repo.path) {
            Ok(entry) => {
                snapshot.repos.insert(repo.name.clone(), entry);
            }
            Err(err) => {
                warn!(repo = %repo.name, "skipping cache entry: {err}");
            }
        }
    }
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sample_snapshot() -> CacheSnapshot {
        let mut snapshot = CacheSnapshot::new();
        snapshot.repos.insert(
            "api".to_string(),
            CacheEntry {
                commit_id: "0123abcd".to_string(),
                content_hash: "feedbeef".to_string(),
                scanned_at: Utc::now(),
            },
        );
        snapshot
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/cache.json");

        save_cache(&path, &sample_snapshot()).unwrap();
        let loaded = load_cache(&path).unwrap();

        assert_eq!(loaded.version, CACHE_FORMAT_VERSION);
        assert_eq!(loaded.repos["api"].commit_id, "0123abcd");
    }

    #[test]
    fn test_load_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        assert!(load_cache(&dir.path().join("cache.json")).is_none());
    }

    #[test]
    fn test_load_malformed_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(load_cache(&path).is_none());
    }

    #[test]
    fn test_load_version_mismatch_is_absent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut snapshot = sample_snapshot();
        snapshot.version = CACHE_FORMAT_VERSION + 1;
        save_cache(&path, &snapshot).unwrap();

        assert!(load_cache(&path).is_none());
    }

    #[test]
    fn test_save_overwrites_existing_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        save_cache(&path, &sample_snapshot()).unwrap();
        save_cache(&path, &CacheSnapshot::new()).unwrap();

        assert!(load_cache(&path).unwrap().repos.is_empty());
    }

    #[test]
    fn test_build_cache_entry_rejects_plain_directory() {
        let dir = TempDir::new().unwrap();
        let err = build_cache_entry(dir.path()).unwrap_err();
        assert!(matches!(err, CacheError::NotARepository { .. }));
    }
}
