//! Repo discovery under the workspace root
//!
//! Seeds the model's repo list before any pass runs. A workspace is either a
//! single repository (the root itself is git-rooted) or a parent directory
//! holding several: git-rooted directories found by a depth-limited walk,
//! plus immediate children that carry a known manifest without version
//! control.

use crate::passes::manifest_scan::MANIFEST_KINDS;
use ignore::WalkBuilder;
use repoatlas_core::config::AtlasConfig;
use repoatlas_core::model::RepoInfo;
use std::fs;
use std::path::Path;
use tracing::debug;

fn has_git_root(path: &Path) -> bool {
    path.join(".git").exists()
}

fn has_known_manifest(path: &Path) -> bool {
    MANIFEST_KINDS
        .iter()
        .any(|kind| path.join(kind.file).is_file())
}

fn repo_name(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) if !relative.as_os_str().is_empty() => relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/"),
        _ => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "workspace".to_string()),
    }
}

pub fn discover_repos(root: &Path, config: &AtlasConfig) -> Vec<RepoInfo> {
    if has_git_root(root) {
        debug!(root = %root.display(), "workspace root is itself a repository");
        return vec![RepoInfo::new(repo_name(root, root), root, true)];
    }

    let mut repos = Vec::new();

    let walker = WalkBuilder::new(root)
        .max_depth(Some(config.discovery_depth))
        .build();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!("discovery walk error: {err}");
                continue;
            }
        };
        let path = entry.path();
        if path == root || !entry.file_type().is_some_and(|t| t.is_dir()) {
            continue;
        }
        if has_git_root(path) {
            repos.push(RepoInfo::new(repo_name(root, path), path, true));
        }
    }

    // Immediate children that look like projects but have no revision
    // control. They participate in the model but never get a cache entry.
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir()
                && !has_git_root(&path)
                && has_known_manifest(&path)
                && !repos.iter().any(|r| r.path == path)
            {
                repos.push(RepoInfo::new(repo_name(root, &path), &path, false));
            }
        }
    }

    repos.sort_by(|a, b| a.name.cmp(&b.name));
    repos
}
