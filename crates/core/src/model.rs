//! Shared analysis model populated by pipeline passes
//!
//! One `WorkspaceModel` exists per run. The run driver owns it and hands it to
//! every pass; passes append to the collection that matches their concern and
//! leave the rest alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One repository detected under the workspace root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoInfo {
    /// Workspace-unique name, derived from the path relative to the root.
    pub name: String,
    pub path: PathBuf,
    /// Whether the repository has a revision-control root. Repos without one
    /// never receive a cache entry.
    pub has_git_root: bool,
    pub primary_language: Option<String>,
    pub build_system: Option<String>,
    pub frameworks: Vec<String>,
    pub root_manifests: Vec<String>,
}

impl RepoInfo {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, has_git_root: bool) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            has_git_root,
            primary_language: None,
            build_system: None,
            frameworks: Vec::new(),
            root_manifests: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    pub repo: String,
    pub method: String,
    pub path: String,
    pub source_file: Option<PathBuf>,
}

/// A type definition exported by one repo and referenced from others.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedTypeDef {
    pub name: String,
    pub repo: String,
    pub source_file: PathBuf,
    pub referenced_by: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVarUsage {
    pub name: String,
    pub repo: String,
    pub source_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    DependsOn,
    SharesEnv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoRelationship {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Convention {
    /// `None` marks a workspace-wide convention.
    pub repo: Option<String>,
    pub topic: String,
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub topic: String,
    pub question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub generated_at: DateTime<Utc>,
    pub tool_version: String,
}

/// The single in-memory aggregate all passes read and write during one run.
///
/// Collections are append-oriented and partitioned by concern; concurrent
/// passes at one level must only touch the collections relevant to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceModel {
    pub metadata: RunMetadata,
    pub repos: Vec<RepoInfo>,
    pub endpoints: Vec<ApiEndpoint>,
    pub shared_types: Vec<SharedTypeDef>,
    pub env_vars: Vec<EnvVarUsage>,
    pub relationships: Vec<RepoRelationship>,
    pub conventions: Vec<Convention>,
    pub open_questions: Vec<OpenQuestion>,
    /// Free-form operator-supplied answers, keyed by question topic.
    pub answers: BTreeMap<String, String>,
}

impl WorkspaceModel {
    pub fn new(tool_version: &str) -> Self {
        Self {
            metadata: RunMetadata {
                generated_at: Utc::now(),
                tool_version: tool_version.to_string(),
            },
            repos: Vec::new(),
            endpoints: Vec::new(),
            shared_types: Vec::new(),
            env_vars: Vec::new(),
            relationships: Vec::new(),
            conventions: Vec::new(),
            open_questions: Vec::new(),
            answers: BTreeMap::new(),
        }
    }

    pub fn repo(&self, name: &str) -> Option<&RepoInfo> {
        self.repos.iter().find(|r| r.name == name)
    }

    pub fn repo_mut(&mut self, name: &str) -> Option<&mut RepoInfo> {
        self.repos.iter_mut().find(|r| r.name == name)
    }
}
