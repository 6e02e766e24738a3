use anyhow::Result;
use async_trait::async_trait;
use repoatlas_core::logging::ScopedLogger;
use repoatlas_core::model::Convention;
use repoatlas_pipeline::{ModelHandle, Pass};
use std::path::PathBuf;

/// (marker path, topic, detail)
const CONVENTION_MARKERS: &[(&str, &str, &str)] = &[
    ("package-lock.json", "lockfile", "npm lockfile committed"),
    ("yarn.lock", "lockfile", "yarn lockfile committed"),
    ("pnpm-lock.yaml", "lockfile", "pnpm lockfile committed"),
    ("Cargo.lock", "lockfile", "cargo lockfile committed"),
    (".editorconfig", "formatting", "editorconfig present"),
    (".prettierrc", "formatting", "prettier config present"),
    ("rustfmt.toml", "formatting", "rustfmt config present"),
    (".github/workflows", "ci", "github actions workflows"),
    (".gitlab-ci.yml", "ci", "gitlab ci pipeline"),
    ("Dockerfile", "packaging", "dockerfile present"),
    ("docker-compose.yml", "packaging", "compose file present"),
    ("tsconfig.json", "typing", "typescript configuration"),
];

/// Records per-repo conventions observable from marker files.
pub struct ConventionsPass;

#[async_trait]
impl Pass for ConventionsPass {
    fn name(&self) -> &'static str {
        "conventions"
    }

    fn description(&self) -> &'static str {
        "detect per-repository conventions from marker files"
    }

    fn dependencies(&self) -> &[&'static str] {
        &["manifest-scan"]
    }

    async fn execute(&self, model: &ModelHandle, logger: &ScopedLogger) -> Result<()> {
        let repos: Vec<(String, PathBuf)> = {
            let model = model.lock().await;
            model
                .repos
                .iter()
                .map(|r| (r.name.clone(), r.path.clone()))
                .collect()
        };

        let mut found = Vec::new();
        for (name, path) in &repos {
            for &(marker, topic, detail) in CONVENTION_MARKERS {
                if path.join(marker).exists() {
                    found.push(Convention {
                        repo: Some(name.clone()),
                        topic: topic.to_string(),
                        detail: detail.to_string(),
                    });
                }
            }
        }

        logger.info(&format!(
            "{} conventions across {} repositories",
            found.len(),
            repos.len()
        ));
        model.lock().await.conventions.extend(found);
        Ok(())
    }
}
