use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("`{path}` is not a git repository root")]
    NotARepository { path: PathBuf },

    #[error("git {command} failed in `{path}`: {stderr}")]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to encode cache snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
