use std::env;
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_SCAN_FILES: usize = 2000;
const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 1_048_576; // 1MB
const DEFAULT_DISCOVERY_DEPTH: usize = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Runtime configuration, read from `REPOATLAS_*` environment variables with
/// validated defaults.
#[derive(Debug, Clone)]
pub struct AtlasConfig {
    /// Directory holding per-workspace cache snapshots.
    pub cache_dir: PathBuf,
    pub log_level: String,
    /// Upper bound on files any single scanning pass reads per repo.
    pub max_scan_files: usize,
    /// Files larger than this are skipped by scanning passes.
    pub max_file_size_bytes: u64,
    /// How deep repo discovery descends below the workspace root.
    pub discovery_depth: usize,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        let cache_dir = env::var("REPOATLAS_CACHE_DIR")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::cache_dir()
                    .unwrap_or_else(env::temp_dir)
                    .join("repoatlas")
            });

        let log_level = env::var("REPOATLAS_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        let max_scan_files = env::var("REPOATLAS_MAX_SCAN_FILES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_SCAN_FILES);

        let max_file_size_bytes = env::var("REPOATLAS_MAX_FILE_SIZE")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES);

        let discovery_depth = env::var("REPOATLAS_DISCOVERY_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(DEFAULT_DISCOVERY_DEPTH);

        Self {
            cache_dir,
            log_level,
            max_scan_files,
            max_file_size_bytes,
            discovery_depth,
        }
    }
}

impl AtlasConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        if self.max_scan_files == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max scan files must be at least 1".to_string(),
            ));
        }

        if self.max_file_size_bytes < 1024 {
            return Err(ConfigError::ValidationFailed(
                "Max file size must be at least 1KB".to_string(),
            ));
        }
        if self.max_file_size_bytes > 10_485_760 {
            return Err(ConfigError::ValidationFailed(
                "Max file size cannot exceed 10MB".to_string(),
            ));
        }

        if self.discovery_depth == 0 || self.discovery_depth > 16 {
            return Err(ConfigError::ValidationFailed(
                "Discovery depth must be between 1 and 16".to_string(),
            ));
        }

        Ok(())
    }

    /// Path of the cache snapshot for a workspace, with filesystem-unsafe
    /// characters in the name replaced.
    pub fn cache_path(&self, workspace_name: &str) -> PathBuf {
        let safe_name =
            workspace_name.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }
}
