pub mod discovery;
pub mod passes;

pub const NAME: &str = "repoatlas";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
