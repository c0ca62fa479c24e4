//! Dashboard, catalog, backup and storage maintenance commands.

use super::{Output, Workspace, json_string};
use crate::models::{CATALOG_VERSION, PROJECT_STAGES, Project, ReviewStage, orphaned_keys};
use crate::storage::{PROJECTS_KEY, download_backup, upload_backup};
use crate::{Error, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
pub struct StageCatalog {
    pub version: u32,
    pub stages: &'static [ReviewStage],
}

impl Output for StageCatalog {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        for stage in self.stages {
            lines.push(format!("{} - {}", stage.id, stage.title));
            for q in stage.questions {
                lines.push(format!("  {:<4} {}", q.id, q.text));
            }
        }
        lines.join("\n")
    }
}

/// The built-in review stages and their questions.
pub fn stages() -> StageCatalog {
    StageCatalog {
        version: CATALOG_VERSION,
        stages: &PROJECT_STAGES,
    }
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub not_started: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl Output for Summary {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Total Projects: {}\nIn Progress:    {}\nCompleted:      {}\nStarting:       {}",
            self.total, self.in_progress, self.completed, self.not_started
        )
    }
}

/// Dashboard counts by progress.
pub fn summary(ws: &Workspace) -> Summary {
    let mut result = Summary {
        total: ws.projects().len(),
        not_started: 0,
        in_progress: 0,
        completed: 0,
    };
    for project in ws.projects() {
        match project.progress_percent() {
            0 => result.not_started += 1,
            100 => result.completed += 1,
            _ => result.in_progress += 1,
        }
    }
    result
}

#[derive(Debug, Serialize)]
pub struct BackupWritten {
    pub path: PathBuf,
    pub projects: usize,
}

impl Output for BackupWritten {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Backed up {} project(s) to {}",
            self.projects,
            self.path.display()
        )
    }
}

/// Write the full project collection to a dated backup file in `dir`.
pub fn backup_download(ws: &Workspace, dir: &Path) -> Result<BackupWritten> {
    let path = download_backup(&ws.projects(), PROJECTS_KEY, dir)?;
    Ok(BackupWritten {
        path,
        projects: ws.projects().len(),
    })
}

#[derive(Debug, Serialize)]
pub struct BackupRestored {
    pub path: PathBuf,
    pub projects: usize,
}

impl Output for BackupRestored {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Backup restored successfully! {} project(s) loaded from {}",
            self.projects,
            self.path.display()
        )
    }
}

/// Replace the whole project collection with the content of a backup file.
///
/// Nothing changes unless the file is a valid backup and the operator
/// confirmed.
pub fn backup_restore(ws: &mut Workspace, path: &Path, confirmed: bool) -> Result<BackupRestored> {
    let projects: Vec<Project> = upload_backup(Some(path))?;
    if !confirmed {
        return Err(Error::InvalidInput(format!(
            "Restoring replaces all {} current project(s) with {} from the backup. Re-run with --yes to confirm.",
            ws.projects().len(),
            projects.len()
        )));
    }

    let count = projects.len();
    ws.replace_projects(projects);
    tracing::info!(path = %path.display(), projects = count, "backup restored");
    Ok(BackupRestored {
        path: path.to_path_buf(),
        projects: count,
    })
}

#[derive(Debug, Serialize)]
pub struct StorageStatus {
    pub persistent: bool,
    pub durable_available: bool,
    pub database_path: PathBuf,
    pub database_bytes: u64,
    pub stored_keys: usize,
    pub mirror_path: PathBuf,
    pub mirror_bytes: u64,
    pub projects: usize,
}

impl Output for StorageStatus {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mb = |bytes: u64| bytes as f64 / 1024.0 / 1024.0;
        let mut lines = vec![
            format!(
                "Storage: {}",
                if self.persistent {
                    "Persistent"
                } else {
                    "Non-persistent"
                }
            ),
            format!(
                "Database: {} ({:.2} MB, {} key(s))",
                self.database_path.display(),
                mb(self.database_bytes),
                self.stored_keys
            ),
            format!(
                "Mirror:   {} ({:.2} MB)",
                self.mirror_path.display(),
                mb(self.mirror_bytes)
            ),
            format!("Projects: {}", self.projects),
        ];
        if !self.durable_available {
            lines.push(
                "Warning: durable storage could not be opened. Changes are only kept in the mirror."
                    .to_string(),
            );
        } else if !self.persistent {
            lines.push(
                "Warning: durable writes are not synchronous. Data may be lost on a crash."
                    .to_string(),
            );
        }
        lines.join("\n")
    }
}

fn file_len(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Durability and size information for both storage tiers.
pub fn storage_status(ws: &Workspace) -> StorageStatus {
    let durable_available = ws.is_durable();
    let db_path = ws.durable().path().to_path_buf();
    let mut wal = db_path.clone().into_os_string();
    wal.push("-wal");

    StorageStatus {
        persistent: durable_available && ws.durable().is_persistent(),
        durable_available,
        database_bytes: file_len(&db_path) + file_len(Path::new(&wal)),
        stored_keys: if durable_available {
            ws.durable().key_count().unwrap_or(0)
        } else {
            0
        },
        database_path: db_path,
        mirror_path: ws.mirror().dir().to_path_buf(),
        mirror_bytes: ws.mirror().size_bytes(),
        projects: ws.projects().len(),
    }
}

/// A stored key that the catalog no longer knows, with its project.
#[derive(Debug, Serialize)]
pub struct OrphanReport {
    pub project: String,
    pub stage: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub catalog_version: u32,
    pub healthy: bool,
    pub orphaned: Vec<OrphanReport>,
}

impl Output for DoctorResult {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.healthy {
            return format!(
                "No issues found (catalog version {}).",
                self.catalog_version
            );
        }
        let mut lines = vec![format!(
            "{} orphaned key(s) found (catalog version {}). They are kept as-is:",
            self.orphaned.len(),
            self.catalog_version
        )];
        for o in &self.orphaned {
            match o.question {
                Some(ref q) => lines.push(format!("  {} {}.{}", o.project, o.stage, q)),
                None => lines.push(format!("  {} {}", o.project, o.stage)),
            }
        }
        lines.join("\n")
    }
}

/// Report review data stored under stage or question ids the catalog
/// doesn't define.
pub fn doctor(ws: &Workspace) -> DoctorResult {
    let orphaned: Vec<OrphanReport> = ws
        .projects()
        .iter()
        .flat_map(|p| {
            orphaned_keys(&p.review_data)
                .into_iter()
                .map(move |o| OrphanReport {
                    project: p.id.clone(),
                    stage: o.stage_id,
                    question: o.question_id,
                })
        })
        .collect();
    DoctorResult {
        catalog_version: CATALOG_VERSION,
        healthy: orphaned.is_empty(),
        orphaned,
    }
}
