//! Keystone CLI - Track final year project reviews.

use clap::Parser;
use keystone::ai::GeminiGateway;
use keystone::cli::{
    BackupCommands, Cli, Commands, ConfigCommands, ProjectCommands, ReviewCommands,
    StorageCommands,
};
use keystone::commands::{self, ImportSource, Output, Workspace};
use keystone::config::{ConfigOverrides, OutputFormat, ResolvedConfig, resolve_config};
use keystone::models::QuestionPatch;
use std::io::Read;
use std::path::Path;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "KS_LOG";

fn main() {
    let cli = Cli::parse();
    init_logging();

    let mut overrides = ConfigOverrides::new();
    if let Some(ref dir) = cli.data_dir {
        overrides = overrides.with_data_dir(dir);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }

    let config = match resolve_config(&overrides) {
        Ok(config) => config,
        Err(e) => {
            report_error(&e, cli.human_readable);
            process::exit(1);
        }
    };

    let human = config.is_human();
    if let Err(e) = run_command(cli.command, &config, human) {
        report_error(&e, human);
        process::exit(1);
    }
}

/// Log to stderr so stdout stays machine-readable.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_error(e: &keystone::Error, human: bool) {
    if human {
        eprintln!("Error: {}", e);
    } else {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    }
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn gateway(config: &ResolvedConfig) -> GeminiGateway {
    GeminiGateway::new(
        config.api_key().map(String::from),
        config.ai_model.value.clone(),
        Duration::from_secs(config.ai_timeout_secs.value),
    )
}

fn read_import_text(file: Option<&Path>) -> keystone::Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn run_command(
    command: Commands,
    config: &ResolvedConfig,
    human: bool,
) -> Result<(), keystone::Error> {
    match command {
        Commands::Project { command } => {
            let mut ws = Workspace::open(config.data_dir());
            match command {
                ProjectCommands::Create {
                    title,
                    students,
                    guide,
                    co_guide,
                } => {
                    let result = commands::project_create(
                        &mut ws,
                        &title,
                        &students,
                        &guide,
                        co_guide.as_deref(),
                    )?;
                    output(&result, human);
                }
                ProjectCommands::List { search } => {
                    let result = commands::project_list(&ws, search.as_deref());
                    output(&result, human);
                }
                ProjectCommands::Show { id } => {
                    let result = commands::project_show(&ws, id.as_deref())?;
                    output(&result, human);
                }
                ProjectCommands::Open { id } => {
                    let result = commands::project_open(&mut ws, &id)?;
                    output(&result, human);
                }
                ProjectCommands::Close => {
                    let result = commands::project_close(&mut ws);
                    output(&result, human);
                }
                ProjectCommands::Delete { id, yes } => {
                    let result = commands::project_delete(&mut ws, &id, yes)?;
                    output(&result, human);
                }
                ProjectCommands::Import { file, entries } => {
                    let source = match entries {
                        Some(path) => ImportSource::entries_file(&path)?,
                        None => ImportSource::Text(read_import_text(file.as_deref())?),
                    };
                    let result = commands::project_import(&mut ws, &gateway(config), source)?;
                    output(&result, human);
                }
            }
            ws.close();
        }

        Commands::Review { command } => {
            let mut ws = Workspace::open(config.data_dir());
            match command {
                ReviewCommands::Set {
                    stage,
                    question,
                    date,
                    grade,
                    sign,
                    project,
                } => {
                    let patch = QuestionPatch {
                        date,
                        grade,
                        guide_sign: sign,
                    };
                    let result =
                        commands::review_set(&mut ws, project.as_deref(), &stage, &question, &patch)?;
                    output(&result, human);
                }
                ReviewCommands::Remarks {
                    stage,
                    text,
                    project,
                } => {
                    let result =
                        commands::review_remarks(&mut ws, project.as_deref(), &stage, &text)?;
                    output(&result, human);
                }
                ReviewCommands::Reviewers {
                    stage,
                    reviewer1,
                    reviewer2,
                    project,
                } => {
                    let result = commands::review_reviewers(
                        &mut ws,
                        project.as_deref(),
                        &stage,
                        reviewer1.as_deref(),
                        reviewer2.as_deref(),
                    )?;
                    output(&result, human);
                }
                ReviewCommands::Refine { stage, project } => {
                    let result = commands::review_refine(
                        &mut ws,
                        &gateway(config),
                        project.as_deref(),
                        &stage,
                    )?;
                    output(&result, human);
                }
                ReviewCommands::Report { id } => {
                    let result = commands::review_report(&ws, id.as_deref())?;
                    output(&result, human);
                }
            }
            ws.close();
        }

        Commands::Stages => {
            output(&commands::stages(), human);
        }

        Commands::Summary => {
            let ws = Workspace::open(config.data_dir());
            output(&commands::summary(&ws), human);
            ws.close();
        }

        Commands::Backup { command } => {
            let mut ws = Workspace::open(config.data_dir());
            match command {
                BackupCommands::Download { dir } => {
                    let dir = dir.unwrap_or_else(|| config.backup_dir.value.clone());
                    let result = commands::backup_download(&ws, &dir)?;
                    output(&result, human);
                }
                BackupCommands::Restore { file, yes } => {
                    let result = commands::backup_restore(&mut ws, &file, yes)?;
                    output(&result, human);
                }
            }
            ws.close();
        }

        Commands::Storage { command } => match command {
            StorageCommands::Status => {
                let ws = Workspace::open(config.data_dir());
                output(&commands::storage_status(&ws), human);
                ws.close();
            }
        },

        Commands::Doctor => {
            let ws = Workspace::open(config.data_dir());
            output(&commands::doctor(&ws), human);
            ws.close();
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                output(&commands::config_show(config), human);
            }
            ConfigCommands::Set { key, value } => {
                let result = commands::config_set(&config.config_path, &key, &value)?;
                output(&result, human);
            }
        },
    }
    Ok(())
}
