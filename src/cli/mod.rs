//! CLI argument definitions for Keystone.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Keystone - Track final year project reviews across five review stages.
///
/// Start with `ks project list` to see tracked projects, then `ks project open <ID>`
/// to make one the target of `ks review` commands.
#[derive(Parser, Debug)]
#[command(name = "ks")]
#[command(author, version, about = "Track final year project reviews from the command line", long_about = None)]
#[command(long_version = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ", env!("KS_GIT_COMMIT"),
    "\nbuilt:  ", env!("KS_BUILD_TIMESTAMP"),
))]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Directory holding the database and mirror.
    /// Falls back to the KS_DATA_DIR environment variable.
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Review data for a project's stages
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },

    /// List the review stages and their questions
    Stages,

    /// Dashboard counts: total, starting, in progress, completed
    Summary,

    /// Backup and restore the whole project collection
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },

    /// Storage tier information
    Storage {
        #[command(subcommand)]
        command: StorageCommands,
    },

    /// Report review data stored under unknown stage or question ids
    Doctor,

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a new project
    Create {
        /// Project title
        title: String,

        /// Student names, comma-separated (e.g., "Asha Patil, Ravi Kumar")
        #[arg(short, long)]
        students: String,

        /// Main guide
        #[arg(short, long)]
        guide: String,

        /// Co-guide
        #[arg(long)]
        co_guide: Option<String>,
    },

    /// List projects
    List {
        /// Case-insensitive filter on title, guide and student names
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Show project details (defaults to the open project)
    Show {
        /// Project ID (e.g., prj-a1b2c3)
        id: Option<String>,
    },

    /// Make a project the target of review commands
    Open {
        /// Project ID
        id: String,
    },

    /// Close the open project
    Close,

    /// Delete a project and all of its review data
    Delete {
        /// Project ID
        id: String,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Import projects from a pasted student list
    ///
    /// Rows are extracted with the AI gateway (requires KEYSTONE_API_KEY), or
    /// read pre-parsed from a JSON array with --entries. Students sharing a
    /// group number (or project domain) become one project.
    Import {
        /// Text file with the raw list (reads stdin when omitted)
        #[arg(conflicts_with = "entries")]
        file: Option<PathBuf>,

        /// JSON array of rows with grpNo, studentName, projectDomain, guide, coGuide
        #[arg(long)]
        entries: Option<PathBuf>,
    },
}

/// Review subcommands
#[derive(Subcommand, Debug)]
pub enum ReviewCommands {
    /// Record date, grade and/or guide signature for a question
    Set {
        /// Stage ID (e.g., review-1, dev-start)
        stage: String,

        /// Question ID (e.g., q1, ds2)
        question: String,

        /// Review date
        #[arg(long)]
        date: Option<String>,

        /// Remark or grade (e.g., A, B+, Satisfactory)
        #[arg(long)]
        grade: Option<String>,

        /// Guide's signature
        #[arg(long)]
        sign: Option<String>,

        /// Project ID (defaults to the open project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Replace the remarks for a stage
    Remarks {
        /// Stage ID
        stage: String,

        /// Overall feedback
        text: String,

        /// Project ID (defaults to the open project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Set reviewer names for a stage
    Reviewers {
        /// Stage ID
        stage: String,

        /// First reviewer
        #[arg(long)]
        reviewer1: Option<String>,

        /// Second reviewer
        #[arg(long)]
        reviewer2: Option<String>,

        /// Project ID (defaults to the open project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Expand the stage remarks with AI suggestions
    Refine {
        /// Stage ID
        stage: String,

        /// Project ID (defaults to the open project)
        #[arg(short, long)]
        project: Option<String>,
    },

    /// Full per-stage report
    Report {
        /// Project ID (defaults to the open project)
        id: Option<String>,
    },
}

/// Backup subcommands
#[derive(Subcommand, Debug)]
pub enum BackupCommands {
    /// Write all projects to projects-backup-<date>.json
    Download {
        /// Target directory (defaults to backup-dir from config, then the current directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Replace all projects with the content of a backup file
    Restore {
        /// Backup file
        file: PathBuf,

        /// Confirm replacing current data
        #[arg(long)]
        yes: bool,
    },
}

/// Storage subcommands
#[derive(Subcommand, Debug)]
pub enum StorageCommands {
    /// Show durability and size of both storage tiers
    Status,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,

    /// Set a configuration value
    Set {
        /// Key (output-format, backup-dir, ai-model, ai-timeout-secs)
        key: String,

        /// Value
        value: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_review_set() {
        let cli = Cli::try_parse_from([
            "ks", "-H", "review", "set", "review-1", "q2", "--grade", "A", "-p", "prj-abc123",
        ])
        .unwrap();
        assert!(cli.human_readable);
        match cli.command {
            Commands::Review {
                command:
                    ReviewCommands::Set {
                        stage,
                        question,
                        grade,
                        date,
                        project,
                        ..
                    },
            } => {
                assert_eq!(stage, "review-1");
                assert_eq!(question, "q2");
                assert_eq!(grade.as_deref(), Some("A"));
                assert!(date.is_none());
                assert_eq!(project.as_deref(), Some("prj-abc123"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_import_file_conflicts_with_entries() {
        let result = Cli::try_parse_from([
            "ks", "project", "import", "list.txt", "--entries", "rows.json",
        ]);
        assert!(result.is_err());
    }
}
