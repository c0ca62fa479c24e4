//! Command implementations for the Keystone CLI.
//!
//! This module contains the business logic for each CLI command.
//! Commands are organized by area:
//! - `project` - Project create, list, selection, delete and import
//! - `review` - Per-stage question entries, remarks and reports
//! - `data` - Dashboard summary, catalog, backups, storage status, doctor
//! - `config` - Show and update config.kdl

mod config;
mod data;
mod project;
mod review;

pub use config::*;
pub use data::*;
pub use project::*;
pub use review::*;

use crate::models::Project;
use crate::storage::{
    FileMirror, PROJECTS_KEY, SELECTION_KEY, SqliteStore, Synchronizer, database_path,
    mirror_path,
};
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// Serialize a result for JSON output. Serialization of plain result structs
/// cannot fail in practice; an error object is printed if it ever does.
pub(crate) fn json_string<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }).to_string())
}

/// Tracked state for one data directory.
///
/// Owns the single durable store handle for the command and shares it with
/// the project and selection synchronizers. Pending durable writes are
/// drained when the workspace is closed or dropped.
pub struct Workspace {
    data_dir: PathBuf,
    durable: Arc<SqliteStore>,
    mirror: Arc<FileMirror>,
    projects: Synchronizer<Vec<Project>>,
    selection: Synchronizer<Option<String>>,
}

impl Workspace {
    /// Open the workspace in `data_dir`. Storage problems degrade to the
    /// fast mirror rather than failing.
    pub fn open(data_dir: &Path) -> Self {
        let durable = Arc::new(SqliteStore::new(database_path(data_dir)));
        let mirror = Arc::new(FileMirror::new(mirror_path(data_dir)));
        let projects =
            Synchronizer::attach(PROJECTS_KEY, Vec::new(), mirror.clone(), durable.clone());
        let selection =
            Synchronizer::attach(SELECTION_KEY, None, mirror.clone(), durable.clone());

        tracing::debug!(
            data_dir = %data_dir.display(),
            projects = projects.get().len(),
            durable = projects.is_durable(),
            "workspace opened"
        );

        Self {
            data_dir: data_dir.to_path_buf(),
            durable,
            mirror,
            projects,
            selection,
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn durable(&self) -> &SqliteStore {
        &self.durable
    }

    pub fn mirror(&self) -> &FileMirror {
        &self.mirror
    }

    pub fn is_durable(&self) -> bool {
        self.projects.is_durable()
    }

    pub fn projects(&self) -> &[Project] {
        self.projects.get()
    }

    /// Id of the open project, if it still exists.
    pub fn selected_id(&self) -> Option<&str> {
        let id = self.selection.get().as_deref()?;
        self.projects().iter().any(|p| p.id == id).then_some(id)
    }

    pub fn find(&self, id: &str) -> Result<&Project> {
        self.projects()
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    /// The explicit id if given, otherwise the open project.
    pub fn resolve_id(&self, id: Option<&str>) -> Result<String> {
        match id {
            Some(id) => Ok(self.find(id)?.id.clone()),
            None => self.selected_id().map(String::from).ok_or_else(|| {
                Error::InvalidInput(
                    "No project selected. Pass a project ID or run `ks project open <ID>`."
                        .to_string(),
                )
            }),
        }
    }

    /// Append projects to the collection.
    pub fn add_projects(&mut self, new: Vec<Project>) {
        if new.is_empty() {
            return;
        }
        self.projects.update(|prev| {
            let mut next = prev.clone();
            next.extend(new);
            next
        });
    }

    /// Apply `f` to the project with `id` and persist the result.
    pub fn update_project<F>(&mut self, id: &str, f: F) -> Result<Project>
    where
        F: FnOnce(&mut Project),
    {
        let mut project = self.find(id)?.clone();
        f(&mut project);
        let updated = project.clone();
        self.projects.update(|prev| {
            prev.iter()
                .map(|p| if p.id == updated.id { updated.clone() } else { p.clone() })
                .collect()
        });
        Ok(project)
    }

    /// Remove a project, clearing the selection if it was open.
    pub fn delete_project(&mut self, id: &str) -> Result<Project> {
        let removed = self.find(id)?.clone();
        self.projects
            .update(|prev| prev.iter().filter(|p| p.id != id).cloned().collect());
        if self.selection.get().as_deref() == Some(id) {
            self.selection.set(None);
        }
        Ok(removed)
    }

    /// Replace the whole collection.
    pub fn replace_projects(&mut self, projects: Vec<Project>) {
        self.projects.set(projects);
        if self.selection.get().is_some() && self.selected_id().is_none() {
            self.selection.set(None);
        }
    }

    pub fn select(&mut self, id: Option<String>) {
        self.selection.set(id);
    }

    /// Drain pending durable writes.
    pub fn close(self) {
        let Workspace {
            projects,
            selection,
            ..
        } = self;
        projects.close();
        selection.close();
    }
}
