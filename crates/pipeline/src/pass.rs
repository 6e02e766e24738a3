use anyhow::Result;
use async_trait::async_trait;
use repoatlas_core::logging::ScopedLogger;
use repoatlas_core::model::WorkspaceModel;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared model handle passed to every pass in a run.
///
/// Passes at the same level may execute concurrently, so the model sits behind
/// an async mutex; a pass takes the lock for each batch of reads or appends
/// and must not hold it across its own I/O.
pub type ModelHandle = Arc<Mutex<WorkspaceModel>>;

pub fn model_handle(model: WorkspaceModel) -> ModelHandle {
    Arc::new(Mutex::new(model))
}

/// One named computation stage over the shared model.
///
/// A pass may assume only that its declared dependencies have fully finished
/// before it starts; it has no ordering guarantee relative to any other pass.
#[async_trait]
pub trait Pass: Send + Sync {
    /// Unique within a registry. Registering the same name twice is an error.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Names of passes that must finish before this one starts.
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    async fn execute(&self, model: &ModelHandle, logger: &ScopedLogger) -> Result<()>;
}
