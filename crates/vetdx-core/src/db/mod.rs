//! Storage layer for the veterinary document index
//!
//! SQLite-backed persistent vector index: chunk rows plus embedding BLOBs,
//! with cosine similarity computed in Rust. Ingestion is the only writer;
//! the retrieval path is read-only.

mod chunks;
mod schema;
pub mod vectors;

pub use chunks::DocumentChunk;
pub use schema::Database;

use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Hash text content using SHA-256
pub fn hash_content(content: &str) -> String {
    hash_bytes(content.as_bytes())
}

/// Hash raw bytes using SHA-256
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

impl Database {
    /// Get the default database path
    pub fn default_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CACHE_DIR_NAME)
            .join("index.sqlite")
    }
}
