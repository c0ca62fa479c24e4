//! Common test utilities for keystone integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/keystone/` directory.

#![allow(dead_code)]

use assert_cmd::Command;
pub use tempfile::TempDir;

/// A test environment with isolated data storage.
///
/// Each `TestEnv` creates two temporary directories:
/// - `work_dir`: The working directory (backups land here by default)
/// - `data_dir`: Holds keystone's data (via `KS_DATA_DIR` env var)
///
/// The `ks()` method returns a `Command` that sets `KS_DATA_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub work_dir: TempDir,
    pub data_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            work_dir: TempDir::new().unwrap(),
            data_dir: TempDir::new().unwrap(),
        }
    }

    /// Get a Command for the ks binary with isolated data directory.
    ///
    /// AI credentials from the caller's environment are removed.
    pub fn ks(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_ks"));
        cmd.current_dir(self.work_dir.path());
        cmd.env("KS_DATA_DIR", self.data_dir.path());
        cmd.env_remove("KS_CONFIG");
        cmd.env_remove("KEYSTONE_API_KEY");
        cmd.env_remove("API_KEY");
        cmd
    }

    /// Create a project and return its ID.
    pub fn create_project(&self, title: &str, students: &str, guide: &str) -> String {
        let output = self
            .ks()
            .args(["project", "create", title, "--students", students, "--guide", guide])
            .output()
            .unwrap();
        assert!(output.status.success(), "create failed: {:?}", output);
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        json["id"].as_str().unwrap().to_string()
    }

    /// Run a command expected to succeed and parse its JSON output.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.ks().args(args).output().unwrap();
        assert!(output.status.success(), "{:?} failed: {:?}", args, output);
        serde_json::from_slice(&output.stdout).unwrap()
    }

    /// Get the path to the working directory.
    pub fn work_path(&self) -> &std::path::Path {
        self.work_dir.path()
    }

    /// Get the path to the data directory.
    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
