pub mod config;
pub mod logging;
pub mod model;

pub use config::{AtlasConfig, ConfigError};
pub use logging::ScopedLogger;
pub use model::WorkspaceModel;
