//! Deterministic content hashing for repository fingerprints

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub fn hash_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 of one file's bytes, hex-encoded.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(hash_bytes(&bytes))
}

/// One hash summarizing a file set's contents.
///
/// Files are sorted by relative path before hashing, so the result is
/// independent of enumeration order. Each entry contributes its path and its
/// content hash, NUL-separated so path boundaries cannot collide.
pub fn aggregate_hash(root: &Path, files: &[PathBuf]) -> io::Result<String> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();

    let mut hasher = Sha256::new();
    for relative in sorted {
        let content_hash = hash_file(&root.join(relative))?;
        hasher.update(relative.to_string_lossy().as_bytes());
        hasher.update([0u8]);
        hasher.update(content_hash.as_bytes());
        hasher.update([0u8]);
    }
    Ok(hex::encode(hasher.finalize()))
}
