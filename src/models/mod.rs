//! Data models for Keystone entities.
//!
//! This module defines the core data structures:
//! - `Project` - A student project group and its review data
//! - `StageFormData` - Everything recorded for one review stage
//! - `QuestionEntry` - Date, grade and guide signature for one question
//! - `ParsedProjectEntry` - One student row produced by AI extraction
//! - `NewProject` - Validated input for creating a project

pub mod catalog;
pub mod fold;

pub use catalog::{
    CATALOG_VERSION, OrphanedKey, PROJECT_STAGES, ReviewQuestion, ReviewStage, STAGE_COUNT,
    find_stage, orphaned_keys,
};
pub use fold::fold_entries;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Review data keyed by stage id. A missing key means the stage is untouched.
pub type ProjectData = BTreeMap<String, StageFormData>;

/// A student project group tracked by Keystone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier (e.g., "prj-a1b2c3")
    pub id: String,

    /// Project title (the project domain for imported groups)
    #[serde(default)]
    pub title: String,

    /// Student names in entry order
    #[serde(default)]
    pub students: Vec<String>,

    /// Main guide
    #[serde(default)]
    pub guide: String,

    /// Co-guide, empty when there is none
    #[serde(default)]
    pub co_guide: String,

    /// Per-stage review records
    #[serde(default)]
    pub review_data: ProjectData,
}

impl Project {
    /// Completion fraction in `0.0..=1.0`.
    ///
    /// A stage counts as complete once it has been touched at all, and stray
    /// keys never push the value past 1.0.
    pub fn progress(&self) -> f64 {
        (self.review_data.len() as f64 / STAGE_COUNT as f64).min(1.0)
    }

    /// Completion as a rounded percentage.
    pub fn progress_percent(&self) -> u8 {
        (self.progress() * 100.0).round() as u8
    }

    pub fn status(&self) -> ProjectStatus {
        ProjectStatus::from_percent(self.progress_percent())
    }

    /// Case-insensitive match against title, guide and student names.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.title.to_lowercase().contains(&term)
            || self.guide.to_lowercase().contains(&term)
            || self
                .students
                .iter()
                .any(|s| s.to_lowercase().contains(&term))
    }

    /// Stage data for `stage_id`, or an empty form if untouched.
    pub fn stage(&self, stage_id: &str) -> StageFormData {
        self.review_data.get(stage_id).cloned().unwrap_or_default()
    }
}

/// Dashboard status derived from progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Starting,
    InProgress,
    Active,
    Completed,
}

impl ProjectStatus {
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            100..=u8::MAX => Self::Completed,
            60..=99 => Self::Active,
            20..=59 => Self::InProgress,
            _ => Self::Starting,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "Starting",
            Self::InProgress => "In Progress",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything recorded for a single review stage.
///
/// Serialized flat: the three scalar fields sit next to one object per
/// answered question, keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFormData {
    #[serde(default)]
    pub remarks: String,

    #[serde(default)]
    pub reviewer1: String,

    #[serde(default)]
    pub reviewer2: String,

    /// Answers keyed by question id
    #[serde(flatten)]
    pub answers: BTreeMap<String, QuestionEntry>,
}

/// Review record for one question. Any subset of fields may be filled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionEntry {
    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub grade: String,

    #[serde(default)]
    pub guide_sign: String,
}

impl QuestionEntry {
    /// Overlay the given fields, leaving the others as they are.
    pub fn apply(&mut self, patch: &QuestionPatch) {
        if let Some(ref date) = patch.date {
            self.date = date.clone();
        }
        if let Some(ref grade) = patch.grade {
            self.grade = grade.clone();
        }
        if let Some(ref sign) = patch.guide_sign {
            self.guide_sign = sign.clone();
        }
    }
}

/// Partial update for a `QuestionEntry`.
#[derive(Debug, Clone, Default)]
pub struct QuestionPatch {
    pub date: Option<String>,
    pub grade: Option<String>,
    pub guide_sign: Option<String>,
}

impl QuestionPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.grade.is_none() && self.guide_sign.is_none()
    }
}

/// One student row extracted from pasted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedProjectEntry {
    #[serde(default)]
    pub grp_no: String,

    #[serde(default)]
    pub student_name: String,

    #[serde(default)]
    pub project_domain: String,

    #[serde(default)]
    pub guide: String,

    #[serde(default)]
    pub co_guide: String,
}

/// A project before it has an id or review data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub title: String,
    pub students: Vec<String>,
    pub guide: String,
    pub co_guide: String,
}

impl NewProject {
    /// Build from form-style input, splitting `students` on commas.
    pub fn from_form(title: &str, students: &str, guide: &str, co_guide: Option<&str>) -> Self {
        Self {
            title: title.to_string(),
            students: split_students(students),
            guide: guide.to_string(),
            co_guide: co_guide.unwrap_or_default().to_string(),
        }
    }

    /// Title, at least one student and a guide are required.
    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.students.is_empty() {
            return Err("at least one student is required".to_string());
        }
        if self.guide.trim().is_empty() {
            return Err("guide must not be empty".to_string());
        }
        Ok(())
    }

    pub fn into_project(self, id: String) -> Project {
        Project {
            id,
            title: self.title,
            students: self.students,
            guide: self.guide,
            co_guide: self.co_guide,
            review_data: ProjectData::new(),
        }
    }
}

/// Split a comma-separated list of names, trimming and dropping blanks.
pub fn split_students(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project_with_stages(stages: &[&str]) -> Project {
        let mut project = NewProject::from_form("Robot", "A", "G", None).into_project("prj-1".into());
        for stage in stages {
            project
                .review_data
                .insert(stage.to_string(), StageFormData::default());
        }
        project
    }

    #[test]
    fn test_progress_three_of_five() {
        let project = project_with_stages(&["review-1", "dev-start", "mid-dev"]);
        assert!((project.progress() - 0.6).abs() < f64::EPSILON);
        assert_eq!(project.progress_percent(), 60);
        assert_eq!(project.status(), ProjectStatus::Active);
    }

    #[test]
    fn test_progress_untouched() {
        let project = project_with_stages(&[]);
        assert_eq!(project.progress(), 0.0);
        assert_eq!(project.status(), ProjectStatus::Starting);
    }

    #[test]
    fn test_progress_caps_with_stray_keys() {
        let project = project_with_stages(&[
            "review-1",
            "dev-start",
            "mid-dev",
            "dev-complete",
            "final-pres",
            "legacy-stage",
        ]);
        assert_eq!(project.progress(), 1.0);
        assert_eq!(project.progress_percent(), 100);
        assert_eq!(project.status(), ProjectStatus::Completed);
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(ProjectStatus::from_percent(0), ProjectStatus::Starting);
        assert_eq!(ProjectStatus::from_percent(19), ProjectStatus::Starting);
        assert_eq!(ProjectStatus::from_percent(20), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::from_percent(40), ProjectStatus::InProgress);
        assert_eq!(ProjectStatus::from_percent(60), ProjectStatus::Active);
        assert_eq!(ProjectStatus::from_percent(100), ProjectStatus::Completed);
    }

    #[test]
    fn test_stage_form_data_flat_wire_format() {
        let json = r#"{
            "remarks": "Good start",
            "reviewer1": "Dr. Rao",
            "reviewer2": "",
            "q1": { "date": "2024-08-01", "grade": "A", "guideSign": "Rao" },
            "q2": { "grade": "B" }
        }"#;
        let stage: StageFormData = serde_json::from_str(json).unwrap();
        assert_eq!(stage.remarks, "Good start");
        assert_eq!(stage.reviewer1, "Dr. Rao");
        assert_eq!(stage.answers.len(), 2);
        assert_eq!(stage.answers["q1"].guide_sign, "Rao");
        assert_eq!(stage.answers["q2"].date, "");

        let value = serde_json::to_value(&stage).unwrap();
        assert_eq!(value["q1"]["guideSign"], "Rao");
        assert_eq!(value["remarks"], "Good start");
        assert!(value.get("answers").is_none());
    }

    #[test]
    fn test_project_camel_case_fields() {
        let mut project = project_with_stages(&["review-1"]);
        project.co_guide = "Prof. X".into();
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["coGuide"], "Prof. X");
        assert!(value["reviewData"]["review-1"].is_object());
    }

    #[test]
    fn test_question_entry_apply_partial() {
        let mut entry = QuestionEntry {
            date: "2024-01-01".into(),
            grade: "B".into(),
            guide_sign: String::new(),
        };
        entry.apply(&QuestionPatch {
            grade: Some("A".into()),
            ..Default::default()
        });
        assert_eq!(entry.date, "2024-01-01");
        assert_eq!(entry.grade, "A");
    }

    #[test]
    fn test_new_project_from_form_splits_students() {
        let draft = NewProject::from_form("Title", " Ann , ,Bob,", "Guide", Some("Co"));
        assert_eq!(draft.students, vec!["Ann", "Bob"]);
        assert_eq!(draft.co_guide, "Co");
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_new_project_validation() {
        assert!(NewProject::from_form(" ", "A", "G", None).validate().is_err());
        assert!(NewProject::from_form("T", " , ", "G", None).validate().is_err());
        assert!(NewProject::from_form("T", "A", "", None).validate().is_err());
    }

    #[test]
    fn test_matches_is_case_insensitive() {
        let project = NewProject::from_form("Smart Irrigation", "Asha Patil", "Dr. Kulkarni", None)
            .into_project("prj-1".into());
        assert!(project.matches("irrig"));
        assert!(project.matches("KULKARNI"));
        assert!(project.matches("patil"));
        assert!(!project.matches("blockchain"));
    }
}
