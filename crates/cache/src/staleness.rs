//! Per-repository staleness classification
//!
//! Decides, repo by repo, whether anything changed since the last successful
//! scan. The revision id check is cheap and runs first; only a matching head
//! triggers the content re-hash that catches uncommitted edits. A probe that
//! fails for any reason degrades to "stale" so one broken repository never
//! aborts a multi-repo run.

use crate::git;
use crate::hash;
use crate::store::CacheSnapshot;
use repoatlas_core::model::RepoInfo;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// No prior cache entry for this repo.
    NeverScanned,
    /// Head revision id differs from the stored one.
    NewCommit,
    /// Head matches but the tracked-file contents changed (uncommitted edits).
    ContentChanged,
    /// A git or filesystem probe failed; re-scan to be safe.
    ProbeFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    Stale(StaleReason),
}

#[derive(Debug, Clone)]
pub struct RepoStaleness {
    pub name: String,
    pub freshness: Freshness,
}

/// Derived per-run report; never persisted.
#[derive(Debug, Clone, Default)]
pub struct StalenessReport {
    pub repos: Vec<RepoStaleness>,
}

impl StalenessReport {
    pub fn is_fully_fresh(&self) -> bool {
        self.repos
            .iter()
            .all(|repo| repo.freshness == Freshness::Fresh)
    }

    pub fn stale(&self) -> impl Iterator<Item = &RepoStaleness> {
        self.repos
            .iter()
            .filter(|repo| repo.freshness != Freshness::Fresh)
    }
}

/// Classify every repo against the prior snapshot. An absent snapshot marks
/// everything stale without touching any repository.
pub fn compute_staleness(repos: &[RepoInfo], cache: Option<&CacheSnapshot>) -> StalenessReport {
    let Some(cache) = cache else {
        return StalenessReport {
            repos: repos
                .iter()
                .map(|repo| RepoStaleness {
                    name: repo.name.clone(),
                    freshness: Freshness::Stale(StaleReason::NeverScanned),
                })
                .collect(),
        };
    };

    StalenessReport {
        repos: repos
            .iter()
            .map(|repo| RepoStaleness {
                name: repo.name.clone(),
                freshness: classify(repo, cache),
            })
            .collect(),
    }
}

fn classify(repo: &RepoInfo, cache: &CacheSnapshot) -> Freshness {
    let Some(entry) = cache.repos.get(&repo.name) else {
        return Freshness::Stale(StaleReason::NeverScanned);
    };

    let head = match git::head_commit(&repo.path) {
        Ok(head) => head,
        Err(err) => {
            debug!(repo = %repo.name, "head probe failed: {err}");
            return Freshness::Stale(StaleReason::ProbeFailed);
        }
    };
    if head != entry.commit_id {
        return Freshness::Stale(StaleReason::NewCommit);
    }

    let files = match git::tracked_files(&repo.path) {
        Ok(files) => files,
        Err(err) => {
            debug!(repo = %repo.name, "tracked-file probe failed: {err}");
            return Freshness::Stale(StaleReason::ProbeFailed);
        }
    };
    let content_hash = match hash::aggregate_hash(&repo.path, &files) {
        Ok(hash) => hash,
        Err(err) => {
            debug!(repo = %repo.name, "content hash failed: {err}");
            return Freshness::Stale(StaleReason::ProbeFailed);
        }
    };

    if content_hash != entry.content_hash {
        Freshness::Stale(StaleReason::ContentChanged)
    } else {
        Freshness::Fresh
    }
}
