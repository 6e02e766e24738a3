use anyhow::{Context, Result};
use async_trait::async_trait;
use ignore::WalkBuilder;
use regex::Regex;
use repoatlas_core::config::AtlasConfig;
use repoatlas_core::logging::ScopedLogger;
use repoatlas_core::model::EnvVarUsage;
use repoatlas_pipeline::{ModelHandle, Pass};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const SOURCE_EXTENSIONS: &[&str] = &[
    "js", "jsx", "ts", "tsx", "mjs", "cjs", "py", "rs", "go", "java", "kt", "rb", "php",
];

/// Per-language reference patterns. Each must capture the variable name in
/// group 1.
const ENV_PATTERNS: &[&str] = &[
    r#"process\.env\.([A-Z][A-Z0-9_]*)"#,
    r#"process\.env\[['"]([A-Z][A-Z0-9_]*)['"]\]"#,
    r#"os\.environ(?:\.get\(|\[)['"]([A-Z][A-Z0-9_]*)['"]"#,
    r#"os\.getenv\(['"]([A-Z][A-Z0-9_]*)['"]"#,
    r#"os\.Getenv\("([A-Z][A-Z0-9_]*)"\)"#,
    r#"env::var(?:_os)?\(\s*"([A-Z][A-Z0-9_]*)""#,
    r#"System\.getenv\("([A-Z][A-Z0-9_]*)"\)"#,
    r#"ENV\[['"]([A-Z][A-Z0-9_]*)['"]\]"#,
];

/// Finds environment variable references in each repo's source files.
pub struct EnvScanPass {
    max_scan_files: usize,
    max_file_size_bytes: u64,
}

impl EnvScanPass {
    pub fn new(config: &AtlasConfig) -> Self {
        Self {
            max_scan_files: config.max_scan_files,
            max_file_size_bytes: config.max_file_size_bytes,
        }
    }

    fn scan_repo(
        &self,
        name: &str,
        path: &Path,
        patterns: &[Regex],
        logger: &ScopedLogger,
    ) -> BTreeSet<(String, PathBuf)> {
        let mut found = BTreeSet::new();
        let mut scanned = 0usize;
        let mut truncated = false;

        for entry in WalkBuilder::new(path).build() {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let file = entry.path();
            let extension = file.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !SOURCE_EXTENSIONS.contains(&extension) {
                continue;
            }
            if entry
                .metadata()
                .map(|m| m.len() > self.max_file_size_bytes)
                .unwrap_or(true)
            {
                continue;
            }
            if scanned == self.max_scan_files {
                truncated = true;
                break;
            }
            scanned += 1;

            let Ok(content) = fs::read_to_string(file) else {
                continue;
            };
            let relative = file.strip_prefix(path).unwrap_or(file).to_path_buf();
            for pattern in patterns {
                for captures in pattern.captures_iter(&content) {
                    found.insert((captures[1].to_string(), relative.clone()));
                }
            }
        }

        if truncated {
            logger.warn(&format!(
                "{name}: stopped after {} files, results are partial",
                self.max_scan_files
            ));
        }
        found
    }
}

#[async_trait]
impl Pass for EnvScanPass {
    fn name(&self) -> &'static str {
        "env-scan"
    }

    fn description(&self) -> &'static str {
        "find environment variable references in source files"
    }

    fn dependencies(&self) -> &[&'static str] {
        &["manifest-scan"]
    }

    async fn execute(&self, model: &ModelHandle, logger: &ScopedLogger) -> Result<()> {
        let patterns: Vec<Regex> = ENV_PATTERNS
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<_, _>>()
            .context("invalid env reference pattern")?;

        let repos: Vec<(String, PathBuf)> = {
            let model = model.lock().await;
            model
                .repos
                .iter()
                .map(|r| (r.name.clone(), r.path.clone()))
                .collect()
        };

        let mut total = 0usize;
        for (name, path) in &repos {
            let found = self.scan_repo(name, path, &patterns, logger);
            logger.debug(&format!("{name}: {} env var references", found.len()));
            total += found.len();

            let mut model = model.lock().await;
            model
                .env_vars
                .extend(found.into_iter().map(|(var, source_file)| EnvVarUsage {
                    name: var,
                    repo: name.clone(),
                    source_file,
                }));
        }

        logger.info(&format!(
            "{total} env var references across {} repositories",
            repos.len()
        ));
        Ok(())
    }
}
