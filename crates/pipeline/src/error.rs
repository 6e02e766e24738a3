use thiserror::Error;

/// Errors raised while constructing or sealing a pass registry. All of these
/// are programming errors in the pass set, fatal to the run.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("pass `{0}` is already registered")]
    DuplicateName(String),

    #[error("pass `{pass}` depends on unregistered pass `{dependency}`")]
    UnknownDependency { pass: String, dependency: String },

    #[error("dependency cycle detected at pass `{0}`")]
    CircularDependency(String),
}

/// A failure thrown by a pass's execute, fatal to the current run. Carries the
/// pass name so the caller can report which of several independent stages
/// broke.
#[derive(Debug, Error)]
#[error("pass `{name}` failed")]
pub struct PassFailure {
    pub name: String,
    #[source]
    pub cause: anyhow::Error,
}
