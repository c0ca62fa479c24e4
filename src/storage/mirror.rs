//! File-backed fast mirror.

use super::backend::FastMirror;
use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// One JSON text file per key, replaced atomically on every write.
pub struct FileMirror {
    dir: PathBuf,
}

impl FileMirror {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Total size of all mirrored files in bytes.
    pub fn size_bytes(&self) -> u64 {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.metadata().ok())
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
            .sum()
    }
}

fn valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl FastMirror for FileMirror {
    fn get(&self, key: &str) -> Option<String> {
        if !valid_key(key) {
            return None;
        }
        fs::read_to_string(self.key_path(key)).ok()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        if !valid_key(key) {
            return Err(Error::InvalidInput(format!("Invalid storage key: {}", key)));
        }
        fs::create_dir_all(&self.dir)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.flush()?;
        tmp.persist(self.key_path(key)).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn location(&self) -> String {
        self.dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_missing() {
        let temp = TempDir::new().unwrap();
        let mirror = FileMirror::new(temp.path().join("mirror"));
        assert_eq!(mirror.get("projects"), None);
        assert_eq!(mirror.size_bytes(), 0);
    }

    #[test]
    fn test_set_creates_dir_and_overwrites() {
        let temp = TempDir::new().unwrap();
        let mirror = FileMirror::new(temp.path().join("mirror"));
        mirror.set("projects", "[]").unwrap();
        mirror.set("projects", r#"[{"id":"prj-1"}]"#).unwrap();
        assert_eq!(mirror.get("projects").unwrap(), r#"[{"id":"prj-1"}]"#);
        assert!(mirror.key_path("projects").exists());
        assert!(mirror.size_bytes() > 0);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp = TempDir::new().unwrap();
        let mirror = FileMirror::new(temp.path());
        mirror.set("projects", "[]").unwrap();
        mirror.set("selected-project", "null").unwrap();
        let count = fs::read_dir(temp.path()).unwrap().count();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let temp = TempDir::new().unwrap();
        let mirror = FileMirror::new(temp.path());
        assert!(mirror.set("../escape", "x").is_err());
        assert_eq!(mirror.get("../escape"), None);
    }
}
