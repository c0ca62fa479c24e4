//! Storage layer for Keystone data.
//!
//! Tracked state is kept in two tiers:
//!
//! - **Fast mirror** (`mirror/<key>.json`): pre-serialized JSON text, read
//!   synchronously on startup for an instant first view.
//! - **Durable store** (`keystone.db`): a SQLite key/value table, the system
//!   of record once it has answered.
//!
//! A [`Synchronizer`] owns the in-memory value for one key and keeps both
//! tiers current. [`backup`] writes and reads whole-state backup files,
//! independent of the synchronizer.

pub mod backend;
pub mod backup;
pub mod durable;
pub mod mirror;
pub mod sync;

pub use backend::{DurableStore, FastMirror};
pub use backup::{backup_filename, download_backup, upload_backup};
pub use durable::SqliteStore;
pub use mirror::FileMirror;
pub use sync::Synchronizer;

use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Key holding the project collection.
pub const PROJECTS_KEY: &str = "projects";

/// Key holding the id of the open project (or null).
pub const SELECTION_KEY: &str = "selected-project";

/// File name of the durable store inside the data directory.
pub const DATABASE_FILE: &str = "keystone.db";

/// Directory name of the fast mirror inside the data directory.
pub const MIRROR_DIR: &str = "mirror";

/// Default data directory: `~/.local/share/keystone/` on Linux.
pub fn default_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Config("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("keystone"))
}

/// Path of the durable store for a data directory.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

/// Path of the fast mirror for a data directory.
pub fn mirror_path(data_dir: &Path) -> PathBuf {
    data_dir.join(MIRROR_DIR)
}

/// Generate a project ID.
///
/// Format: `prj-<6 hex chars>`
pub fn generate_id(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(
        chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or(0)
            .to_le_bytes(),
    );
    let hash = hasher.finalize();
    let hash_hex = format!("{:x}", hash);
    format!("prj-{}", &hash_hex[..6])
}

/// Generate a project ID not present in `existing`.
pub fn generate_unique_id(seed: &str, existing: &[&str]) -> String {
    let mut attempt = 0u32;
    loop {
        let id = generate_id(&format!("{}:{}", seed, attempt));
        if !existing.contains(&id.as_str()) {
            return id;
        }
        attempt += 1;
    }
}
