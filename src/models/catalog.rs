//! Built-in review stage catalog.
//!
//! Stage and question ids are used as map keys in stored review data.
//! Renaming or removing one leaves existing data under the old key; those
//! keys are kept as-is and reported by [`orphaned_keys`].

use super::ProjectData;
use serde::Serialize;

/// Bumped whenever a stage or question id changes.
pub const CATALOG_VERSION: u32 = 1;

/// Number of built-in stages.
pub const STAGE_COUNT: usize = 5;

/// A single question within a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewQuestion {
    pub id: &'static str,
    pub text: &'static str,
}

/// A fixed review stage and its questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReviewStage {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub questions: &'static [ReviewQuestion],
}

impl ReviewStage {
    pub fn question(&self, question_id: &str) -> Option<&'static ReviewQuestion> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn has_question(&self, question_id: &str) -> bool {
        self.question(question_id).is_some()
    }
}

const fn q(id: &'static str, text: &'static str) -> ReviewQuestion {
    ReviewQuestion { id, text }
}

pub static PROJECT_STAGES: [ReviewStage; STAGE_COUNT] = [
    ReviewStage {
        id: "review-1",
        title: "Project Review I (Semester I)",
        description: "Problem Statement, Motivation, objectives and Literature Review. Student is expected to deliver presentation covering these aspects.",
        questions: &[
            q("q1", "Do Research gap identified lead to find motivation of project?"),
            q("q2", "Does the statement give clear identification about what your project will accomplish?"),
            q("q3", "Is the statement short and concise?"),
            q("q4", "Do similar type of methodology / model exists?"),
            q("q5", "Is the studied literature sufficient to decide scope of the project?"),
            q("q6", "Are the objectives clearly and unambiguously listed?"),
            q("q7", "Can a person who is not familiar with the project understand scope of the project by reading the project problem statement?"),
            q("q8", "Are project objectives of study (what product, process, resource etc.) clearly defined?"),
            q("q9", "Are the objectives set helpful to achieve goal of the project?"),
            q("q10", "Does the project contribute to our society by any means?"),
        ],
    },
    ReviewStage {
        id: "dev-start",
        title: "Development Start",
        description: "Review of project architecture, technology stack, and initial setup.",
        questions: &[
            q("ds1", "Is the system architecture well-defined and documented?"),
            q("ds2", "Has the technology stack been finalized and justified?"),
            q("ds3", "Is the project repository set up with version control?"),
            q("ds4", "Are the initial modules and components planned out?"),
        ],
    },
    ReviewStage {
        id: "mid-dev",
        title: "Mid-Development Review",
        description: "Assessing the progress of the development phase and identifying any blockers.",
        questions: &[
            q("md1", "Is the project progress on track with the proposed timeline?"),
            q("md2", "Has a significant portion of the core functionality been implemented?"),
            q("md3", "Are there any major technical challenges or roadblocks?"),
            q("md4", "Is the code quality satisfactory and well-documented?"),
        ],
    },
    ReviewStage {
        id: "dev-complete",
        title: "Development Complete & Testing",
        description: "Verifying the completion of all features and the status of testing.",
        questions: &[
            q("dc1", "Are all the proposed features implemented?"),
            q("dc2", "Has unit and integration testing been performed?"),
            q("dc3", "Is the project ready for deployment/demonstration?"),
            q("dc4", "Is the final project report in preparation?"),
        ],
    },
    ReviewStage {
        id: "final-pres",
        title: "Final Presentation Prep",
        description: "Final checks before the project presentation and viva.",
        questions: &[
            q("fp1", "Is the presentation content complete and well-structured?"),
            q("fp2", "Has the project demonstration been rehearsed?"),
            q("fp3", "Are all project artifacts (report, code, presentation) ready for submission?"),
        ],
    },
];

/// Look up a stage by id.
pub fn find_stage(stage_id: &str) -> Option<&'static ReviewStage> {
    PROJECT_STAGES.iter().find(|s| s.id == stage_id)
}

/// A stored key that no longer matches the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanedKey {
    pub stage_id: String,
    /// `None` when the whole stage is unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<String>,
}

/// Collect stage and question keys in `data` that the catalog doesn't know.
pub fn orphaned_keys(data: &ProjectData) -> Vec<OrphanedKey> {
    let mut orphans = Vec::new();
    for (stage_id, form) in data {
        match find_stage(stage_id) {
            None => orphans.push(OrphanedKey {
                stage_id: stage_id.clone(),
                question_id: None,
            }),
            Some(stage) => {
                for question_id in form.answers.keys() {
                    if !stage.has_question(question_id) {
                        orphans.push(OrphanedKey {
                            stage_id: stage_id.clone(),
                            question_id: Some(question_id.clone()),
                        });
                    }
                }
            }
        }
    }
    orphans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionEntry, StageFormData};
    use std::collections::HashSet;

    #[test]
    fn test_stage_ids_are_unique() {
        let ids: HashSet<_> = PROJECT_STAGES.iter().map(|s| s.id).collect();
        assert_eq!(ids.len(), STAGE_COUNT);
    }

    #[test]
    fn test_question_ids_unique_within_stage() {
        for stage in &PROJECT_STAGES {
            let ids: HashSet<_> = stage.questions.iter().map(|q| q.id).collect();
            assert_eq!(ids.len(), stage.questions.len(), "stage {}", stage.id);
        }
    }

    #[test]
    fn test_question_counts() {
        let counts: Vec<_> = PROJECT_STAGES.iter().map(|s| s.questions.len()).collect();
        assert_eq!(counts, vec![10, 4, 4, 4, 3]);
    }

    #[test]
    fn test_find_stage() {
        let stage = find_stage("mid-dev").unwrap();
        assert_eq!(stage.title, "Mid-Development Review");
        assert!(stage.has_question("md3"));
        assert!(!stage.has_question("q1"));
        assert!(find_stage("review-2").is_none());
    }

    #[test]
    fn test_orphaned_keys() {
        let mut data = ProjectData::new();
        let mut form = StageFormData::default();
        form.answers.insert("q1".into(), QuestionEntry::default());
        form.answers.insert("q99".into(), QuestionEntry::default());
        data.insert("review-1".into(), form);
        data.insert("old-stage".into(), StageFormData::default());

        let orphans = orphaned_keys(&data);
        assert_eq!(orphans.len(), 2);
        assert!(orphans.contains(&OrphanedKey {
            stage_id: "old-stage".into(),
            question_id: None,
        }));
        assert!(orphans.contains(&OrphanedKey {
            stage_id: "review-1".into(),
            question_id: Some("q99".into()),
        }));
    }
}
