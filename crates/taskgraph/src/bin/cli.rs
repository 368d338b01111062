//! Taskgraph CLI - dependency validation and complexity analysis.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::disallowed_macros)]
#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use taskgraph::ai::PromptMode;
use taskgraph::domain::{
    AnalysisOutcome, AnalyzeOptions, ComplexityDomain, ConfigDomain, DependencyDomain,
    TaskSelection,
};
use taskgraph::entities::{parse_identifier, ModelRole, ModelSettings, TasksConfig};
use taskgraph::errors::{TasksError, TasksResult};
use taskgraph::storage::{FileStorage, Storage};
use taskgraph::ui;

#[derive(Parser)]
#[command(name = "taskgraph")]
#[command(about = "Task dependency graphs and AI complexity analysis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory
    #[arg(long, global = true)]
    project: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze task complexity and update the complexity report
    AnalyzeComplexity {
        /// Task IDs to analyze, comma-separated
        #[arg(short, long)]
        id: Option<String>,

        /// First task ID of a range (inclusive)
        #[arg(long)]
        from: Option<u32>,

        /// Last task ID of a range (inclusive)
        #[arg(long)]
        to: Option<u32>,

        /// Complexity threshold (1-10) for expansion recommendations
        #[arg(short, long)]
        threshold: Option<f64>,

        /// Use the research model
        #[arg(short, long)]
        research: bool,

        /// Tasks file (defaults to .tasks/tasks/tasks.json)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Output file for the report
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Prompt tier: standard, balanced or advanced
        #[arg(long)]
        prompt_mode: Option<String>,

        /// AI model to use
        #[arg(long)]
        model: Option<String>,

        /// Tag to read from tagged tasks files
        #[arg(long)]
        tag: Option<String>,

        /// Extra project context passed to the model
        #[arg(long)]
        context: Option<String>,

        /// Generation timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// View the complexity report
    ComplexityReport {
        /// Report file path
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Check dependencies for cycles and missing tasks
    ValidateDeps {
        /// Tasks file (defaults to .tasks/tasks/tasks.json)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Tag to read from tagged tasks files
        #[arg(long)]
        tag: Option<String>,
    },

    /// Check whether a new dependency would be valid
    CheckDep {
        /// Dependent task or subtask ID
        #[arg(long)]
        from: String,

        /// Dependency task or subtask ID
        #[arg(long)]
        to: String,

        /// Tasks file (defaults to .tasks/tasks/tasks.json)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Show or change the configured AI models
    Models {
        /// Set main model (`provider:model_id`)
        #[arg(long)]
        set_main: Option<String>,

        /// Set research model (`provider:model_id`)
        #[arg(long)]
        set_research: Option<String>,

        /// Endpoint override stored with the models being set
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Show how a task identifier is interpreted
    ParseId {
        /// Identifier such as 5, 5.3 or 5.3.1
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn get_project_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path.unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// RUST_LOG wins; otherwise --verbose, then the configured level.
fn init_tracing(verbose: bool, json: bool, config_level: Option<&str>) {
    let default_level = if verbose {
        "debug"
    } else {
        config_level.unwrap_or("warn")
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn project_name(project_path: &Path, config: &TasksConfig) -> Option<String> {
    config.global.project_name.clone().or_else(|| {
        project_path
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    })
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let project_path = get_project_path(cli.project.clone());

    let config = ConfigDomain::new(&project_path).load().await;
    init_tracing(
        cli.verbose,
        cli.log_json,
        config.as_ref().ok().map(|c| c.global.log_level.as_str()),
    );

    let result = match config {
        Ok(config) => run(cli, project_path, config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        ui::print_error(&e.to_string());
        if let Some(hint) = e.remediation_hint() {
            ui::print_info(hint);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli, project_path: PathBuf, config: TasksConfig) -> TasksResult<()> {
    let storage = FileStorage::new(&project_path);

    match cli.command {
        Commands::AnalyzeComplexity {
            id,
            from,
            to,
            threshold,
            research,
            file,
            output,
            prompt_mode,
            model,
            tag,
            context,
            timeout,
        } => {
            let storage = match tag {
                Some(tag) => storage.with_tag(tag),
                None => storage,
            };
            let tasks_path = file.map_or_else(|| storage.tasks_file(), |f| storage.resolve(f));
            let report_path = output.map_or_else(|| storage.report_file(), |f| storage.resolve(f));

            let mut options = AnalyzeOptions::new(tasks_path, &report_path)
                .with_selection(TaskSelection::from_cli(id.as_deref(), from, to)?);
            options.threshold = threshold;
            options.use_research = research;
            options.prompt_mode = prompt_mode.as_deref().map(PromptMode::parse_or_default);
            options.model = model;
            options.project_name = project_name(&project_path, &config);
            options.project_context = context.unwrap_or_default();
            options.timeout = timeout.map(Duration::from_secs);

            let domain = ComplexityDomain::new(Arc::new(storage), config);

            let pb = spinner(if research {
                "Analyzing task complexity (research mode)..."
            } else {
                "Analyzing task complexity..."
            });
            let run = domain.analyze(&options).await;
            pb.finish_and_clear();
            let run = run?;

            if !run.missing_ids.is_empty() {
                ui::print_warning(&format!(
                    "Skipped task IDs that are missing or not pending/in-progress/blocked: {}",
                    join_ids(&run.missing_ids)
                ));
            }
            if !run.synthesized_ids.is_empty() {
                ui::print_warning(&format!(
                    "The model skipped tasks {}; default entries were added",
                    join_ids(&run.synthesized_ids)
                ));
            }

            match &run.outcome {
                AnalysisOutcome::Unchanged(_) => {
                    ui::print_info("No active tasks matched; the existing report was left unchanged");
                }
                AnalysisOutcome::Updated(report) if report.meta.tasks_analyzed == 0 => {
                    ui::print_info("No active tasks matched; wrote an empty report");
                    ui::print_success(&format!("Saved complexity report to: {}", report_path.display()));
                }
                AnalysisOutcome::Updated(report) => {
                    ui::print_success(&format!(
                        "Analyzed {} of {} tasks",
                        report.meta.tasks_analyzed, report.meta.total_tasks
                    ));
                    if !run.reanalyzed_ids.is_empty() {
                        ui::print_info(&format!(
                            "Replaced previous analyses for tasks {}",
                            join_ids(&run.reanalyzed_ids)
                        ));
                    }
                    ui::print_success(&format!("Saved complexity report to: {}", report_path.display()));
                }
            }

            if let Some(usage) = run.usage {
                ui::print_info(&format!(
                    "Tokens used: {} in, {} out",
                    usage.input_tokens, usage.output_tokens
                ));
            }

            let needing_expansion = run.outcome.report().tasks_needing_expansion();
            if needing_expansion.is_empty() {
                ui::print_info("No tasks require expansion");
            } else {
                println!();
                println!("{}", "Tasks needing expansion:".bold());
                for analysis in needing_expansion {
                    println!(
                        "  {} Task {}: {} (score: {:.1}, suggested: {} subtasks)",
                        "•".cyan(),
                        analysis.task_id,
                        analysis.task_title,
                        analysis.complexity_score,
                        analysis.recommended_subtasks
                    );
                }
            }
        }

        Commands::ComplexityReport { file } => {
            let report_path = file.map_or_else(|| storage.report_file(), |f| storage.resolve(f));

            match storage.load_report(&report_path).await? {
                Some(report) => ui::display_complexity_report(&report),
                None => {
                    ui::print_warning(&format!(
                        "Complexity report not found: {}",
                        report_path.display()
                    ));
                    ui::print_info("Run 'taskgraph analyze-complexity' first to generate a report");
                }
            }
        }

        Commands::ValidateDeps { file, tag } => {
            let storage = match tag {
                Some(tag) => storage.with_tag(tag),
                None => storage,
            };
            let tasks_path = file.map_or_else(|| storage.tasks_file(), |f| storage.resolve(f));
            let deps_domain = DependencyDomain::new(Arc::new(storage) as Arc<dyn Storage>);

            let report = deps_domain.validate(&tasks_path).await?;
            ui::display_dependency_report(&report);
            if !report.is_valid() {
                std::process::exit(1);
            }
        }

        Commands::CheckDep { from, to, file } => {
            let tasks_path = file.map_or_else(|| storage.tasks_file(), |f| storage.resolve(f));
            let deps_domain = DependencyDomain::new(Arc::new(storage) as Arc<dyn Storage>);

            deps_domain
                .check_new_dependency(&tasks_path, &from, &to)
                .await?;
            ui::print_success(&format!("Task {from} can depend on {to}"));
        }

        Commands::Models {
            set_main,
            set_research,
            base_url,
        } => {
            let config_domain = ConfigDomain::new(&project_path);

            if set_main.is_none() && set_research.is_none() {
                if base_url.is_some() {
                    ui::print_warning("--base-url only applies together with --set-main or --set-research");
                }

                println!("{}", "Model Configuration".bold().underline());
                println!();
                for role in [ModelRole::Main, ModelRole::Research] {
                    let settings = config_domain.model_for(role).await?;
                    println!(
                        "  {}: {}:{}{}",
                        role.to_string().cyan(),
                        settings.provider,
                        settings.model_id,
                        settings
                            .base_url
                            .map(|url| format!(" ({url})").dimmed().to_string())
                            .unwrap_or_default()
                    );
                }
            } else {
                for (role, spec) in [
                    (ModelRole::Main, set_main),
                    (ModelRole::Research, set_research),
                ] {
                    let Some(spec) = spec else { continue };
                    let mut settings: ModelSettings = spec.parse()?;
                    settings.base_url.clone_from(&base_url);
                    config_domain.set_model(role, settings).await?;
                    ui::print_success(&format!("Set {role} model to: {spec}"));
                }
            }
        }

        Commands::ParseId { id, json } => {
            let info = parse_identifier(&id);
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else if info.is_valid {
                ui::display_identifier(&id, &info);
            } else {
                return Err(TasksError::InvalidId { id });
            }
        }
    }

    Ok(())
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
