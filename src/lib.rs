//! Keystone - A project review tracking library.
//!
//! This library provides the core functionality for the `ks` CLI tool,
//! including the project/review data model, dual-tier persistence,
//! backup/restore and AI-assisted import.

pub mod ai;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod storage;

/// Test utilities for isolated test environments.
#[cfg(test)]
pub(crate) mod test_utils {
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    use crate::storage::{FileMirror, SqliteStore};

    /// Test environment with an isolated data directory.
    ///
    /// Storage tests build their stores from `data_path()` directly, so no
    /// environment variables are touched.
    pub struct TestEnv {
        pub data_dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            Self {
                data_dir: TempDir::new().unwrap(),
            }
        }

        /// Get the path to the isolated data directory.
        pub fn data_path(&self) -> &Path {
            self.data_dir.path()
        }

        /// Durable store rooted in this environment.
        pub fn durable(&self) -> Arc<SqliteStore> {
            Arc::new(SqliteStore::new(self.data_path().join("keystone.db")))
        }

        /// Fast mirror rooted in this environment.
        pub fn mirror(&self) -> Arc<FileMirror> {
            Arc::new(FileMirror::new(self.data_path().join("mirror")))
        }
    }

    impl Default for TestEnv {
        fn default() -> Self {
            Self::new()
        }
    }
}

/// Library-level error type for Keystone operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The durable store could not be opened.
    #[error("Durable storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A persistence write failed.
    #[error("Write failed: {0}")]
    Write(String),

    /// A restore input could not be read or parsed.
    #[error("Invalid file: {0}")]
    InvalidFile(String),

    /// AI extraction failed (credentials, transport or response format).
    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Project not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for Keystone operations.
pub type Result<T> = std::result::Result<T, Error>;
