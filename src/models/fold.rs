//! Folding of parsed student rows into project drafts.

use super::{NewProject, ParsedProjectEntry};

/// Group rows into one draft per group key, in first-seen key order.
///
/// The key is `grp_no`, falling back to `project_domain`; rows with neither
/// are dropped. The first row under a key supplies title, guide and
/// co-guide, and every row contributes its student name.
pub fn fold_entries(entries: &[ParsedProjectEntry]) -> Vec<NewProject> {
    let mut keys: Vec<&str> = Vec::new();
    let mut drafts: Vec<NewProject> = Vec::new();

    for entry in entries {
        let key = if !entry.grp_no.is_empty() {
            entry.grp_no.as_str()
        } else if !entry.project_domain.is_empty() {
            entry.project_domain.as_str()
        } else {
            continue;
        };

        let index = match keys.iter().position(|k| *k == key) {
            Some(index) => index,
            None => {
                keys.push(key);
                drafts.push(NewProject {
                    title: entry.project_domain.clone(),
                    students: Vec::new(),
                    guide: entry.guide.clone(),
                    co_guide: entry.co_guide.clone(),
                });
                drafts.len() - 1
            }
        };
        drafts[index].students.push(entry.student_name.clone());
    }

    drafts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(grp: &str, student: &str, domain: &str) -> ParsedProjectEntry {
        ParsedProjectEntry {
            grp_no: grp.into(),
            student_name: student.into(),
            project_domain: domain.into(),
            guide: format!("guide of {}", domain),
            co_guide: String::new(),
        }
    }

    #[test]
    fn test_fold_groups_in_first_seen_order() {
        let drafts = fold_entries(&[
            row("P1", "A", "IoT"),
            row("P1", "B", "IoT"),
            row("P2", "C", "ML"),
        ]);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].students, vec!["A", "B"]);
        assert_eq!(drafts[0].title, "IoT");
        assert_eq!(drafts[1].students, vec!["C"]);
    }

    #[test]
    fn test_fold_interleaved_keys() {
        let drafts = fold_entries(&[
            row("P2", "A", "ML"),
            row("P1", "B", "IoT"),
            row("P2", "C", "ML"),
        ]);
        assert_eq!(drafts[0].title, "ML");
        assert_eq!(drafts[0].students, vec!["A", "C"]);
        assert_eq!(drafts[1].students, vec!["B"]);
    }

    #[test]
    fn test_fold_falls_back_to_domain() {
        let drafts = fold_entries(&[row("", "A", "Blockchain"), row("", "B", "Blockchain")]);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].students, vec!["A", "B"]);
    }

    #[test]
    fn test_fold_drops_keyless_rows() {
        let drafts = fold_entries(&[row("", "Lost", ""), row("P1", "A", "IoT")]);
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].students, vec!["A"]);
    }

    #[test]
    fn test_fold_first_row_seeds_metadata() {
        let mut second = row("P1", "B", "Other");
        second.guide = "Someone else".into();
        let drafts = fold_entries(&[row("P1", "A", "IoT"), second]);
        assert_eq!(drafts[0].title, "IoT");
        assert_eq!(drafts[0].guide, "guide of IoT");
    }

    #[test]
    fn test_fold_empty() {
        assert!(fold_entries(&[]).is_empty());
    }
}
