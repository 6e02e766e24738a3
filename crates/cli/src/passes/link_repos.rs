use anyhow::Result;
use async_trait::async_trait;
use repoatlas_core::logging::ScopedLogger;
use repoatlas_core::model::{OpenQuestion, RelationshipKind, RepoRelationship};
use repoatlas_pipeline::{ModelHandle, Pass};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;

/// Env vars read by at least this many repos get an open question about
/// ownership.
const SHARED_ENV_QUESTION_THRESHOLD: usize = 3;

/// Infers cross-repo relationships from manifest references and shared env
/// vars.
pub struct LinkReposPass;

/// The terminal path component is what other manifests would reference
/// (`services/api` is depended on as `api`).
fn short_name(repo_name: &str) -> &str {
    repo_name.rsplit('/').next().unwrap_or(repo_name)
}

fn manifest_references(content: &str, needle: &str) -> bool {
    content.contains(&format!("\"{needle}\""))
        || content.contains(&format!("{needle} ="))
        || content.contains(&format!("/{needle} "))
}

#[async_trait]
impl Pass for LinkReposPass {
    fn name(&self) -> &'static str {
        "link-repos"
    }

    fn description(&self) -> &'static str {
        "infer cross-repository relationships"
    }

    fn dependencies(&self) -> &[&'static str] {
        &["manifest-scan", "env-scan"]
    }

    async fn execute(&self, model: &ModelHandle, logger: &ScopedLogger) -> Result<()> {
        let (repos, env_vars) = {
            let model = model.lock().await;
            (model.repos.clone(), model.env_vars.clone())
        };

        let mut relationships = Vec::new();

        // Manifest references: repo A names repo B in one of its manifests.
        for a in &repos {
            for manifest in &a.root_manifests {
                let Ok(content) = fs::read_to_string(a.path.join(manifest)) else {
                    continue;
                };
                for b in &repos {
                    if a.name == b.name {
                        continue;
                    }
                    let needle = short_name(&b.name);
                    if needle.len() >= 3 && manifest_references(&content, needle) {
                        relationships.push(RepoRelationship {
                            source: a.name.clone(),
                            target: b.name.clone(),
                            kind: RelationshipKind::DependsOn,
                            evidence: format!("`{needle}` referenced in {manifest}"),
                        });
                    }
                }
            }
        }

        // Shared env vars: repos reading the same variable are coupled
        // through configuration.
        let mut readers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for usage in &env_vars {
            readers
                .entry(usage.name.as_str())
                .or_default()
                .insert(usage.repo.as_str());
        }

        let mut pair_vars: BTreeMap<(String, String), Vec<&str>> = BTreeMap::new();
        let mut questions = Vec::new();
        for (var, repos_reading) in &readers {
            if repos_reading.len() < 2 {
                continue;
            }
            let sorted: Vec<&str> = repos_reading.iter().copied().collect();
            for (i, &left) in sorted.iter().enumerate() {
                for &right in &sorted[i + 1..] {
                    pair_vars
                        .entry((left.to_string(), right.to_string()))
                        .or_default()
                        .push(var);
                }
            }
            if repos_reading.len() >= SHARED_ENV_QUESTION_THRESHOLD {
                questions.push(OpenQuestion {
                    topic: format!("env:{var}"),
                    question: format!(
                        "`{var}` is read by {} repositories ({}); which one owns its value?",
                        repos_reading.len(),
                        sorted.join(", ")
                    ),
                });
            }
        }

        for ((left, right), vars) in pair_vars {
            let shown: Vec<&str> = vars.iter().copied().take(3).collect();
            let suffix = if vars.len() > shown.len() {
                format!(" and {} more", vars.len() - shown.len())
            } else {
                String::new()
            };
            relationships.push(RepoRelationship {
                source: left,
                target: right,
                kind: RelationshipKind::SharesEnv,
                evidence: format!("both read {}{suffix}", shown.join(", ")),
            });
        }

        logger.info(&format!(
            "{} relationships, {} open questions",
            relationships.len(),
            questions.len()
        ));

        let mut model = model.lock().await;
        model.relationships.extend(relationships);
        model.open_questions.extend(questions);
        Ok(())
    }
}
