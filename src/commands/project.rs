//! Project commands.

use super::{Output, Workspace, json_string};
use crate::ai::AiGateway;
use crate::models::{NewProject, ParsedProjectEntry, Project, ProjectStatus, fold_entries};
use crate::storage::{generate_unique_id, upload_backup};
use crate::{Error, Result};
use serde::Serialize;
use std::path::Path;

/// One row of a project listing.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub students: Vec<String>,
    pub guide: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub co_guide: String,
    pub progress: u8,
    pub status: ProjectStatus,
    pub selected: bool,
}

impl ProjectSummary {
    fn new(project: &Project, selected: bool) -> Self {
        Self {
            id: project.id.clone(),
            title: project.title.clone(),
            students: project.students.clone(),
            guide: project.guide.clone(),
            co_guide: project.co_guide.clone(),
            progress: project.progress_percent(),
            status: project.status(),
            selected,
        }
    }

    fn human_line(&self) -> String {
        let marker = if self.selected { "*" } else { " " };
        format!(
            "{} {} {} [{}% {}] guide: {}, students: {}",
            marker,
            self.id,
            self.title,
            self.progress,
            self.status,
            self.guide,
            self.students.join(", ")
        )
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectCreated {
    pub id: String,
    pub title: String,
}

impl Output for ProjectCreated {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Created project {} \"{}\"", self.id, self.title)
    }
}

/// Create a project from form-style input.
pub fn project_create(
    ws: &mut Workspace,
    title: &str,
    students: &str,
    guide: &str,
    co_guide: Option<&str>,
) -> Result<ProjectCreated> {
    let draft = NewProject::from_form(title.trim(), students, guide.trim(), co_guide.map(str::trim));
    draft.validate().map_err(|e| {
        Error::InvalidInput(format!(
            "Please fill out Title, Students, and Guide fields ({})",
            e
        ))
    })?;

    let existing: Vec<&str> = ws.projects().iter().map(|p| p.id.as_str()).collect();
    let id = generate_unique_id(&draft.title, &existing);
    let project = draft.into_project(id);
    let result = ProjectCreated {
        id: project.id.clone(),
        title: project.title.clone(),
    };
    ws.add_projects(vec![project]);
    tracing::info!(id = %result.id, "project created");
    Ok(result)
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub count: usize,
    pub projects: Vec<ProjectSummary>,
}

impl Output for ProjectList {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects found.".to_string();
        }
        let mut lines = vec![format!("{} project(s):", self.count)];
        lines.extend(self.projects.iter().map(ProjectSummary::human_line));
        lines.join("\n")
    }
}

/// List projects, optionally filtered by a case-insensitive search term.
pub fn project_list(ws: &Workspace, search: Option<&str>) -> ProjectList {
    let selected = ws.selected_id();
    let projects: Vec<ProjectSummary> = ws
        .projects()
        .iter()
        .filter(|p| search.is_none_or(|term| p.matches(term)))
        .map(|p| ProjectSummary::new(p, selected == Some(p.id.as_str())))
        .collect();
    ProjectList {
        count: projects.len(),
        projects,
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub progress: u8,
    pub status: ProjectStatus,
    pub selected: bool,
}

impl Output for ProjectDetail {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let p = &self.project;
        let mut lines = vec![
            format!("{} {}", p.id, p.title),
            format!("  Students: {}", p.students.join(", ")),
            format!("  Guide:    {}", p.guide),
        ];
        if !p.co_guide.is_empty() {
            lines.push(format!("  Co-guide: {}", p.co_guide));
        }
        lines.push(format!("  Progress: {}% ({})", self.progress, self.status));
        if !p.review_data.is_empty() {
            let stages: Vec<&str> = p.review_data.keys().map(String::as_str).collect();
            lines.push(format!("  Stages:   {}", stages.join(", ")));
        }
        lines.join("\n")
    }
}

fn detail(ws: &Workspace, project: &Project) -> ProjectDetail {
    ProjectDetail {
        project: project.clone(),
        progress: project.progress_percent(),
        status: project.status(),
        selected: ws.selected_id() == Some(project.id.as_str()),
    }
}

/// Show a project, defaulting to the open one.
pub fn project_show(ws: &Workspace, id: Option<&str>) -> Result<ProjectDetail> {
    let id = ws.resolve_id(id)?;
    let project = ws.find(&id)?;
    Ok(detail(ws, project))
}

#[derive(Debug, Serialize)]
pub struct ProjectOpened {
    pub id: String,
    pub title: String,
}

impl Output for ProjectOpened {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Opened {} \"{}\"", self.id, self.title)
    }
}

/// Make a project the open one.
pub fn project_open(ws: &mut Workspace, id: &str) -> Result<ProjectOpened> {
    let project = ws.find(id)?;
    let result = ProjectOpened {
        id: project.id.clone(),
        title: project.title.clone(),
    };
    ws.select(Some(result.id.clone()));
    Ok(result)
}

#[derive(Debug, Serialize)]
pub struct ProjectClosed {
    pub closed: Option<String>,
}

impl Output for ProjectClosed {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        match self.closed {
            Some(ref id) => format!("Closed {}", id),
            None => "No project was open.".to_string(),
        }
    }
}

/// Return to the dashboard.
pub fn project_close(ws: &mut Workspace) -> ProjectClosed {
    let closed = ws.selected_id().map(String::from);
    ws.select(None);
    ProjectClosed { closed }
}

#[derive(Debug, Serialize)]
pub struct ProjectDeleted {
    pub id: String,
    pub title: String,
}

impl Output for ProjectDeleted {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Deleted {} \"{}\"", self.id, self.title)
    }
}

/// Delete a project permanently. Requires confirmation.
pub fn project_delete(ws: &mut Workspace, id: &str, confirmed: bool) -> Result<ProjectDeleted> {
    let project = ws.find(id)?;
    if !confirmed {
        return Err(Error::InvalidInput(format!(
            "Deleting \"{}\" removes all of its review data. Re-run with --yes to confirm.",
            project.title
        )));
    }
    let removed = ws.delete_project(id)?;
    tracing::info!(id = %removed.id, "project deleted");
    Ok(ProjectDeleted {
        id: removed.id,
        title: removed.title,
    })
}

/// Where imported rows come from.
pub enum ImportSource {
    /// Free text for AI extraction
    Text(String),
    /// Pre-parsed rows
    Entries(Vec<ParsedProjectEntry>),
}

impl ImportSource {
    /// Load pre-parsed rows from a JSON array file.
    pub fn entries_file(path: &Path) -> Result<Self> {
        Ok(Self::Entries(upload_backup(Some(path))?))
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectsImported {
    pub rows: usize,
    pub count: usize,
    pub projects: Vec<ProjectCreated>,
}

impl Output for ProjectsImported {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut lines = vec![format!(
            "Imported {} project(s) from {} row(s)",
            self.count, self.rows
        )];
        lines.extend(
            self.projects
                .iter()
                .map(|p| format!("  {} {}", p.id, p.title)),
        );
        lines.join("\n")
    }
}

/// Import projects by folding student rows into groups.
pub fn project_import(
    ws: &mut Workspace,
    gateway: &dyn AiGateway,
    source: ImportSource,
) -> Result<ProjectsImported> {
    let entries = match source {
        ImportSource::Text(text) => {
            if text.trim().is_empty() {
                return Err(Error::InvalidInput(
                    "Please paste the project list text to import.".to_string(),
                ));
            }
            gateway.extract_entries(&text)?
        }
        ImportSource::Entries(entries) => entries,
    };

    let mut ids: Vec<String> = ws.projects().iter().map(|p| p.id.clone()).collect();
    let mut projects = Vec::new();
    for draft in fold_entries(&entries) {
        let existing: Vec<&str> = ids.iter().map(String::as_str).collect();
        let id = generate_unique_id(&draft.title, &existing);
        ids.push(id.clone());
        projects.push(draft.into_project(id));
    }

    let created: Vec<ProjectCreated> = projects
        .iter()
        .map(|p| ProjectCreated {
            id: p.id.clone(),
            title: p.title.clone(),
        })
        .collect();
    ws.add_projects(projects);
    tracing::info!(rows = entries.len(), projects = created.len(), "projects imported");

    Ok(ProjectsImported {
        rows: entries.len(),
        count: created.len(),
        projects: created,
    })
}
