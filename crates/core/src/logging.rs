//! Name-scoped logging for pipeline passes
//!
//! The pipeline derives one child logger per pass from its own logger, so
//! every line a pass emits is attributed to it. Passes report progress only
//! through the logger they are handed.

/// A leveled logger carrying a hierarchical scope, backed by `tracing`.
#[derive(Debug, Clone)]
pub struct ScopedLogger {
    scope: String,
}

impl ScopedLogger {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    /// Derive a child logger whose scope is nested under this one.
    pub fn child(&self, name: &str) -> Self {
        let scope = if self.scope.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.scope, name)
        };
        Self { scope }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn error(&self, message: &str) {
        tracing::error!(scope = %self.scope, "{message}");
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(scope = %self.scope, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(scope = %self.scope, "{message}");
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(scope = %self.scope, "{message}");
    }
}
