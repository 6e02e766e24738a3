//! Built-in collaborator passes
//!
//! These stay at the manifest and text level, never AST, and exist to
//! populate the model end to end. Level structure:
//! `[[manifest-scan], [env-scan, conventions], [link-repos]]`.

pub mod conventions;
pub mod env_scan;
pub mod link_repos;
pub mod manifest_scan;

pub use conventions::ConventionsPass;
pub use env_scan::EnvScanPass;
pub use link_repos::LinkReposPass;
pub use manifest_scan::ManifestScanPass;

use repoatlas_core::config::AtlasConfig;
use repoatlas_pipeline::{PassRegistry, RegistryError};
use std::sync::Arc;

/// Registry holding every built-in pass, sealed and validated.
pub fn builtin_registry(config: &AtlasConfig) -> Result<PassRegistry, RegistryError> {
    let mut builder = PassRegistry::builder();
    builder.register(Arc::new(ManifestScanPass))?;
    builder.register(Arc::new(EnvScanPass::new(config)))?;
    builder.register(Arc::new(ConventionsPass))?;
    builder.register(Arc::new(LinkReposPass))?;
    builder.build()
}
