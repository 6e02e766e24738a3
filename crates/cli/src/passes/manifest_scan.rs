use anyhow::Result;
use async_trait::async_trait;
use repoatlas_core::logging::ScopedLogger;
use repoatlas_pipeline::{ModelHandle, Pass};
use std::fs;
use std::path::PathBuf;

pub struct ManifestKind {
    pub file: &'static str,
    pub language: &'static str,
    pub build_system: &'static str,
}

/// Root manifests we classify repos by, in priority order: the first match
/// decides the primary language.
pub const MANIFEST_KINDS: &[ManifestKind] = &[
    ManifestKind { file: "Cargo.toml", language: "rust", build_system: "cargo" },
    ManifestKind { file: "package.json", language: "javascript", build_system: "npm" },
    ManifestKind { file: "go.mod", language: "go", build_system: "go" },
    ManifestKind { file: "pyproject.toml", language: "python", build_system: "pip" },
    ManifestKind { file: "requirements.txt", language: "python", build_system: "pip" },
    ManifestKind { file: "pom.xml", language: "java", build_system: "maven" },
    ManifestKind { file: "build.gradle", language: "java", build_system: "gradle" },
    ManifestKind { file: "build.gradle.kts", language: "kotlin", build_system: "gradle" },
    ManifestKind { file: "Gemfile", language: "ruby", build_system: "bundler" },
    ManifestKind { file: "composer.json", language: "php", build_system: "composer" },
    ManifestKind { file: "mix.exs", language: "elixir", build_system: "mix" },
];

/// (manifest file, dependency needle, framework name)
const FRAMEWORK_HINTS: &[(&str, &str, &str)] = &[
    ("package.json", "\"react\"", "react"),
    ("package.json", "\"next\"", "next.js"),
    ("package.json", "\"express\"", "express"),
    ("package.json", "\"fastify\"", "fastify"),
    ("package.json", "\"@nestjs/core\"", "nestjs"),
    ("package.json", "\"vue\"", "vue"),
    ("package.json", "\"svelte\"", "svelte"),
    ("Cargo.toml", "axum", "axum"),
    ("Cargo.toml", "actix-web", "actix-web"),
    ("Cargo.toml", "rocket", "rocket"),
    ("pyproject.toml", "django", "django"),
    ("pyproject.toml", "fastapi", "fastapi"),
    ("pyproject.toml", "flask", "flask"),
    ("requirements.txt", "django", "django"),
    ("requirements.txt", "fastapi", "fastapi"),
    ("requirements.txt", "flask", "flask"),
    ("go.mod", "gin-gonic/gin", "gin"),
    ("go.mod", "labstack/echo", "echo"),
];

/// Classifies each repo from the manifests at its root.
pub struct ManifestScanPass;

#[async_trait]
impl Pass for ManifestScanPass {
    fn name(&self) -> &'static str {
        "manifest-scan"
    }

    fn description(&self) -> &'static str {
        "classify repositories from their root manifests"
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

        for (name, path) in &repos {
            let mut manifests = Vec::new();
            let mut language = None;
            let mut build_system = None;
            let mut frameworks: Vec<String> = Vec::new();

            for kind in MANIFEST_KINDS {
                let manifest_path = path.join(kind.file);
                if !manifest_path.is_file() {
                    continue;
                }
                manifests.push(kind.file.to_string());
                if language.is_none() {
                    language = Some(kind.language.to_string());
                    build_system = Some(kind.build_system.to_string());
                }

                if let Ok(content) = fs::read_to_string(&manifest_path) {
                    for &(manifest, needle, framework) in FRAMEWORK_HINTS {
                        if manifest == kind.file
                            && content.contains(needle)
                            && !frameworks.iter().any(|f| f == framework)
                        {
                            frameworks.push(framework.to_string());
                        }
                    }
                }
            }

            logger.debug(&format!(
                "{name}: language={:?} manifests={manifests:?}",
                language.as_deref().unwrap_or("unknown")
            ));

            let mut model = model.lock().await;
            if let Some(repo) = model.repo_mut(name) {
                repo.primary_language = language;
                repo.build_system = build_system;
                repo.frameworks = frameworks;
                repo.root_manifests = manifests;
            }
        }

        logger.info(&format!("classified {} repositories", repos.len()));
        Ok(())
    }
}
