//! Review commands: per-stage question entries, remarks, reviewers and the
//! printable report.

use super::{Output, Workspace, json_string};
use crate::ai::AiGateway;
use crate::models::{
    PROJECT_STAGES, ProjectStatus, QuestionPatch, ReviewStage, StageFormData, find_stage,
};
use crate::{Error, Result};
use serde::Serialize;

fn lookup_stage(stage_id: &str) -> Result<&'static ReviewStage> {
    find_stage(stage_id).ok_or_else(|| {
        let known: Vec<&str> = PROJECT_STAGES.iter().map(|s| s.id).collect();
        Error::InvalidInput(format!(
            "Unknown stage '{}'. Valid stages: {}",
            stage_id,
            known.join(", ")
        ))
    })
}

/// Replace the stored form for one stage, creating it if untouched.
fn write_stage<F>(
    ws: &mut Workspace,
    project_id: Option<&str>,
    stage: &ReviewStage,
    f: F,
) -> Result<StageUpdated>
where
    F: FnOnce(&mut StageFormData),
{
    let id = ws.resolve_id(project_id)?;
    let mut form = ws.find(&id)?.stage(stage.id);
    f(&mut form);
    let data = form.clone();
    let project = ws.update_project(&id, |p| {
        p.review_data.insert(stage.id.to_string(), form);
    })?;
    tracing::debug!(project = %id, stage = stage.id, "stage data updated");
    Ok(StageUpdated {
        id,
        stage: stage.id.to_string(),
        data,
        progress: project.progress_percent(),
    })
}

#[derive(Debug, Serialize)]
pub struct StageUpdated {
    pub id: String,
    pub stage: String,
    pub data: StageFormData,
    pub progress: u8,
}

impl Output for StageUpdated {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!(
            "Updated {} stage {} (progress {}%)",
            self.id, self.stage, self.progress
        )
    }
}

/// Record date, grade and/or guide signature for one question.
pub fn review_set(
    ws: &mut Workspace,
    project_id: Option<&str>,
    stage_id: &str,
    question_id: &str,
    patch: &QuestionPatch,
) -> Result<StageUpdated> {
    let stage = lookup_stage(stage_id)?;
    if !stage.has_question(question_id) {
        let known: Vec<&str> = stage.questions.iter().map(|q| q.id).collect();
        return Err(Error::InvalidInput(format!(
            "Unknown question '{}' for stage {}. Valid questions: {}",
            question_id,
            stage.id,
            known.join(", ")
        )));
    }
    if patch.is_empty() {
        return Err(Error::InvalidInput(
            "Nothing to set. Pass at least one of --date, --grade or --sign.".to_string(),
        ));
    }

    write_stage(ws, project_id, stage, |form| {
        form.answers
            .entry(question_id.to_string())
            .or_default()
            .apply(patch);
    })
}

/// Replace the remarks for a stage.
pub fn review_remarks(
    ws: &mut Workspace,
    project_id: Option<&str>,
    stage_id: &str,
    remarks: &str,
) -> Result<StageUpdated> {
    let stage = lookup_stage(stage_id)?;
    write_stage(ws, project_id, stage, |form| {
        form.remarks = remarks.to_string();
    })
}

/// Set one or both reviewer names for a stage.
pub fn review_reviewers(
    ws: &mut Workspace,
    project_id: Option<&str>,
    stage_id: &str,
    reviewer1: Option<&str>,
    reviewer2: Option<&str>,
) -> Result<StageUpdated> {
    let stage = lookup_stage(stage_id)?;
    if reviewer1.is_none() && reviewer2.is_none() {
        return Err(Error::InvalidInput(
            "Nothing to set. Pass --reviewer1 and/or --reviewer2.".to_string(),
        ));
    }
    write_stage(ws, project_id, stage, |form| {
        if let Some(name) = reviewer1 {
            form.reviewer1 = name.to_string();
        }
        if let Some(name) = reviewer2 {
            form.reviewer2 = name.to_string();
        }
    })
}

#[derive(Debug, Serialize)]
pub struct RemarksRefined {
    pub id: String,
    pub stage: String,
    pub original: String,
    pub remarks: String,
}

impl Output for RemarksRefined {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        format!("Remarks for {} stage {}:\n\n{}", self.id, self.stage, self.remarks)
    }
}

/// Ask the AI gateway to expand the stage remarks and store the result.
///
/// The gateway never fails; whatever text it returns replaces the remarks.
pub fn review_refine(
    ws: &mut Workspace,
    gateway: &dyn AiGateway,
    project_id: Option<&str>,
    stage_id: &str,
) -> Result<RemarksRefined> {
    let stage = lookup_stage(stage_id)?;
    let id = ws.resolve_id(project_id)?;
    let original = ws.find(&id)?.stage(stage.id).remarks;

    let refined = gateway.refine_remarks(&original);
    let updated = write_stage(ws, Some(&id), stage, |form| {
        form.remarks = refined;
    })?;

    Ok(RemarksRefined {
        id,
        stage: updated.stage,
        original,
        remarks: updated.data.remarks,
    })
}

/// One catalog question with its recorded answer.
#[derive(Debug, Serialize)]
pub struct QuestionRow {
    pub number: usize,
    pub id: &'static str,
    pub text: &'static str,
    pub date: String,
    pub grade: String,
    pub guide_sign: String,
}

#[derive(Debug, Serialize)]
pub struct StageReport {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub touched: bool,
    pub questions: Vec<QuestionRow>,
    pub remarks: String,
    pub reviewer1: String,
    pub reviewer2: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewReport {
    pub id: String,
    pub title: String,
    pub students: Vec<String>,
    pub guide: String,
    pub co_guide: String,
    pub progress: u8,
    pub status: ProjectStatus,
    pub stages: Vec<StageReport>,
}

impl Output for ReviewReport {
    fn to_json(&self) -> String {
        json_string(self)
    }

    fn to_human(&self) -> String {
        let mut out = vec![
            format!("Project Review Report: {}", self.title),
            format!("Students: {}", self.students.join(", ")),
            format!("Guide: {}", self.guide),
        ];
        if !self.co_guide.is_empty() {
            out.push(format!("Co-Guide: {}", self.co_guide));
        }
        out.push(format!("Progress: {}% ({})", self.progress, self.status));

        for stage in &self.stages {
            out.push(String::new());
            out.push(format!("== {} ==", stage.title));
            out.push(stage.description.to_string());
            for q in &stage.questions {
                out.push(format!("{:>3}. {}", q.number, q.text));
                if !(q.date.is_empty() && q.grade.is_empty() && q.guide_sign.is_empty()) {
                    out.push(format!(
                        "     Date: {}  Grade: {}  Guide: {}",
                        q.date, q.grade, q.guide_sign
                    ));
                }
            }
            if !stage.remarks.is_empty() {
                out.push(format!("Remarks: {}", stage.remarks));
            }
            if !(stage.reviewer1.is_empty() && stage.reviewer2.is_empty()) {
                out.push(format!(
                    "Reviewers: 1. {}  2. {}",
                    stage.reviewer1, stage.reviewer2
                ));
            }
        }
        out.join("\n")
    }
}

/// Full per-stage report for a project, in catalog order.
pub fn review_report(ws: &Workspace, project_id: Option<&str>) -> Result<ReviewReport> {
    let id = ws.resolve_id(project_id)?;
    let project = ws.find(&id)?;

    let stages = PROJECT_STAGES
        .iter()
        .map(|stage| {
            let form = project.stage(stage.id);
            let questions = stage
                .questions
                .iter()
                .enumerate()
                .map(|(i, q)| {
                    let entry = form.answers.get(q.id).cloned().unwrap_or_default();
                    QuestionRow {
                        number: i + 1,
                        id: q.id,
                        text: q.text,
                        date: entry.date,
                        grade: entry.grade,
                        guide_sign: entry.guide_sign,
                    }
                })
                .collect();
            StageReport {
                id: stage.id,
                title: stage.title,
                description: stage.description,
                touched: project.review_data.contains_key(stage.id),
                questions,
                remarks: form.remarks,
                reviewer1: form.reviewer1,
                reviewer2: form.reviewer2,
            }
        })
        .collect();

    Ok(ReviewReport {
        id: project.id.clone(),
        title: project.title.clone(),
        students: project.students.clone(),
        guide: project.guide.clone(),
        co_guide: project.co_guide.clone(),
        progress: project.progress_percent(),
        status: project.status(),
        stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{project_create, project_open};
    use crate::models::ParsedProjectEntry;
    use crate::test_utils::TestEnv;

    struct EchoGateway;

    impl AiGateway for EchoGateway {
        fn refine_remarks(&self, remarks: &str) -> String {
            format!("Expanded feedback based on: {}", remarks)
        }

        fn extract_entries(&self, _raw_text: &str) -> Result<Vec<ParsedProjectEntry>> {
            Ok(Vec::new())
        }
    }

    fn open_workspace(env: &TestEnv) -> (Workspace, String) {
        let mut ws = Workspace::open(env.data_path());
        let id = project_create(&mut ws, "Smart Grid", "Ann, Bob", "Dr. Rao", None)
            .unwrap()
            .id;
        project_open(&mut ws, &id).unwrap();
        (ws, id)
    }

    fn grade(g: &str) -> QuestionPatch {
        QuestionPatch {
            grade: Some(g.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_set_question_entry() {
        let env = TestEnv::new();
        let (mut ws, id) = open_workspace(&env);

        let patch = QuestionPatch {
            date: Some("2024-08-12".into()),
            grade: Some("A".into()),
            guide_sign: Some("Rao".into()),
        };
        let updated = review_set(&mut ws, None, "review-1", "q3", &patch).unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.progress, 20);
        assert_eq!(updated.data.answers["q3"].guide_sign, "Rao");

        review_set(&mut ws, None, "review-1", "q3", &grade("B+")).unwrap();
        let entry = &ws.find(&id).unwrap().review_data["review-1"].answers["q3"];
        assert_eq!(entry.grade, "B+");
        assert_eq!(entry.date, "2024-08-12");
    }

    #[test]
    fn test_set_rejects_unknown_stage_and_question() {
        let env = TestEnv::new();
        let (mut ws, id) = open_workspace(&env);

        assert!(matches!(
            review_set(&mut ws, None, "review-9", "q1", &grade("A")),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            review_set(&mut ws, None, "dev-start", "q1", &grade("A")),
            Err(Error::InvalidInput(_))
        ));
        assert!(review_set(&mut ws, None, "dev-start", "ds1", &QuestionPatch::default()).is_err());
        assert!(ws.find(&id).unwrap().review_data.is_empty());
    }

    #[test]
    fn test_remarks_and_reviewers_keep_answers() {
        let env = TestEnv::new();
        let (mut ws, id) = open_workspace(&env);

        review_set(&mut ws, None, "mid-dev", "md1", &grade("A")).unwrap();
        review_remarks(&mut ws, None, "mid-dev", "Good pace").unwrap();
        review_reviewers(&mut ws, Some(&id), "mid-dev", Some("Dr. Shah"), None).unwrap();

        let form = &ws.find(&id).unwrap().review_data["mid-dev"];
        assert_eq!(form.remarks, "Good pace");
        assert_eq!(form.reviewer1, "Dr. Shah");
        assert_eq!(form.reviewer2, "");
        assert_eq!(form.answers["md1"].grade, "A");
        assert!(review_reviewers(&mut ws, None, "mid-dev", None, None).is_err());
    }

    #[test]
    fn test_refine_replaces_remarks() {
        let env = TestEnv::new();
        let (mut ws, id) = open_workspace(&env);
        review_remarks(&mut ws, None, "final-pres", "Demo was short").unwrap();

        let refined = review_refine(&mut ws, &EchoGateway, None, "final-pres").unwrap();
        assert_eq!(refined.original, "Demo was short");
        assert_eq!(refined.remarks, "Expanded feedback based on: Demo was short");
        assert_eq!(
            ws.find(&id).unwrap().review_data["final-pres"].remarks,
            refined.remarks
        );
    }

    #[test]
    fn test_report_lists_every_stage() {
        let env = TestEnv::new();
        let (mut ws, _) = open_workspace(&env);
        review_set(&mut ws, None, "review-1", "q10", &grade("A")).unwrap();

        let report = review_report(&ws, None).unwrap();
        assert_eq!(report.stages.len(), 5);
        assert!(report.stages[0].touched);
        assert!(!report.stages[1].touched);
        assert_eq!(report.stages[0].questions.len(), 10);
        assert_eq!(report.stages[0].questions[9].grade, "A");
        assert_eq!(report.stages[4].questions[0].number, 1);
        assert!(report.to_human().contains("Project Review Report: Smart Grid"));
    }

    #[test]
    fn test_edits_without_selection_fail() {
        let env = TestEnv::new();
        let mut ws = Workspace::open(env.data_path());
        assert!(review_remarks(&mut ws, None, "review-1", "x").is_err());
    }
}
