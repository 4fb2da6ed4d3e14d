pub mod cli;
pub mod color;
pub mod config;
pub mod decoration;
pub mod engine;
pub mod filter;
pub mod focus;
pub mod project;
pub mod render;
pub mod store;

use crate::config::AppConfig;
use crate::decoration::DecorationRegistry;
use crate::engine::AnalysisService;
use crate::engine::service::document_identity;
use crate::filter::{FilterId, FilterSpec, GroupSpec};
use crate::project::Project;
use anyhow::{Context, Result, bail};
use std::io::IsTerminal;
use std::path::Path;
use tracing_subscriber::EnvFilter;

pub use cli::{ColorMode, Commands, cli_parse};
pub use engine::{Classification, CombinedMatcher, classify};
pub use filter::{Disposition, Filter, FilterError, PatternMode};
pub use focus::FocusView;

/// Load a project file with the configured hue allocator
fn open_project(path: &Path, config: &AppConfig) -> Result<Project> {
    store::load_project(path, config.hue_allocator())
        .with_context(|| format!("Failed to open project '{}'", path.display()))
}

/// Load a project file, or start an empty project named after the file
fn open_or_create_project(path: &Path, config: &AppConfig) -> Result<Project> {
    if path.exists() {
        return open_project(path, config);
    }
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    tracing::info!(path = %path.display(), "creating new project");
    Ok(Project::new(&name).with_hue_allocator(config.hue_allocator()))
}

fn save(path: &Path, project: &Project) -> Result<()> {
    store::save_project(path, project)
        .with_context(|| format!("Failed to save project '{}'", path.display()))
}

/// Resolve a filter by id or, failing that, by name
fn find_filter(project: &Project, target: &str) -> Result<FilterId> {
    if let Some(filter) = project
        .filters()
        .iter()
        .find(|f| f.id().to_string() == target)
    {
        return Ok(filter.id());
    }

    let matches: Vec<&Filter> = project
        .filters()
        .iter()
        .filter(|f| f.name() == target)
        .collect();
    match matches.as_slice() {
        [only] => Ok(only.id()),
        [] => bail!("No filter named '{target}'"),
        _ => bail!("Several filters are named '{target}', use the id instead"),
    }
}

fn init_tracing(verbose: u8, use_color: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // a second init (tests driving `run` twice) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(use_color)
        .try_init();
}

pub fn run() -> Result<()> {
    let cli = cli_parse();
    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {}
    }
    let (use_color, color_logs) = match cli.color {
        ColorMode::Always => (true, true),
        ColorMode::Never => (false, false),
        ColorMode::Auto => (
            std::io::stdout().is_terminal(),
            std::io::stderr().is_terminal(),
        ),
    };
    init_tracing(cli.verbose, color_logs);
    let config = config::load_config(cli.config.as_deref()).context("Failed to load config")?;

    match &cli.command {
        Commands::Highlight {
            project,
            file,
            summary,
        } => {
            let project = open_project(project, &config)?;
            let text = engine::service::read_document(file)?;
            let service = AnalysisService::new(project, config.engine_options());

            let classification = match service.highlight(&document_identity(file), &text) {
                Ok(classification) => classification,
                Err(e) => {
                    if !matches!(e, engine::AnalysisError::FilteringDisabled) {
                        tracing::warn!(error = %e, "highlighting failed, showing the document as is");
                    }
                    print!("{text}");
                    return Ok(());
                }
            };

            let project = service.read()?;
            if *summary {
                print!("{}", render::format_summary(&classification, &project));
            } else {
                let matcher = CombinedMatcher::from_filters(project.highlight_filters())?;
                print!(
                    "{}",
                    render::format_highlight(&text, &classification, &matcher, &project, use_color)
                );
            }
        }
        Commands::Focus {
            project,
            file,
            line_numbers,
            output,
        } => {
            let project = open_project(project, &config)?;
            let text = engine::service::read_document(file)?;
            let service = AnalysisService::new(project, config.engine_options());
            let document = document_identity(file);

            let view = service.focus(&document, &text).unwrap_or_else(|e| {
                if !matches!(e, engine::AnalysisError::FilteringDisabled) {
                    tracing::warn!(error = %e, "focus view failed, showing the document unfiltered");
                }
                FocusView::unfiltered(&document, &text)
            });
            let rendered = render::format_focus(&view, *line_numbers);

            match output {
                Some(path) => std::fs::write(path, rendered)
                    .with_context(|| format!("Failed to write '{}'", path.display()))?,
                None => print!("{rendered}"),
            }
        }
        Commands::List { project } => {
            let project = open_project(project, &config)?;
            println!(
                "{} ({} filters, filtering {})",
                project.name(),
                project.filters().len(),
                if project.filtering_enabled() { "on" } else { "off" }
            );
            println!("{}", render::filters_table(&project));
        }
        Commands::Add {
            project: path,
            pattern,
            mode,
            regex,
            ignore_case,
            name,
            priority,
            disposition,
            no_highlight,
            group,
        } => {
            let mut project = open_or_create_project(path, &config)?;
            let mut host = DecorationRegistry::new();

            let mut spec = FilterSpec::text(pattern);
            spec.mode = if *regex { PatternMode::Regex } else { *mode };
            spec.case_sensitive = config.classifier.case_sensitive && !*ignore_case;
            if let Some(name) = name {
                spec.name = name.clone();
            }

            if let Some(group_name) = group {
                let existing = project
                    .groups()
                    .iter()
                    .find(|g| &g.name == group_name)
                    .map(|g| g.id());
                let group_id = match existing {
                    Some(id) => id,
                    None => project.add_group(GroupSpec::named(group_name))?,
                };
                if let Some(group) = project.group(group_id) {
                    group.apply_defaults(&mut spec);
                }
            }
            apply_overrides(&mut spec, *priority, *disposition, *no_highlight);
            let id = project.add_filter(spec, &mut host)?;

            save(path, &project)?;
            println!("Added filter {id}");
        }
        Commands::Remove {
            project: path,
            target,
            group,
        } => {
            let mut project = open_project(path, &config)?;
            let mut host = DecorationRegistry::new();

            if *group {
                let Some(group_id) = project
                    .groups()
                    .iter()
                    .find(|g| &g.name == target)
                    .map(|g| g.id())
                else {
                    bail!("No group named '{target}'");
                };
                let removed = project.remove_group(group_id, &mut host)?;
                println!("Removed group '{target}' and {} filters", removed.len());
            } else {
                let id = find_filter(&project, target)?;
                let removed = project.remove_filter(id, &mut host)?;
                println!("Removed filter '{}'", removed.name);
            }
            save(path, &project)?;
        }
        Commands::Filtering {
            project: path,
            state,
        } => {
            let mut project = open_project(path, &config)?;
            project.set_filtering_enabled(*state == cli::Switch::On);
            save(path, &project)?;
        }
        Commands::Check {
            project: path,
            write,
        } => {
            let project = open_project(path, &config)?;
            println!(
                "{}: {} filters in {} groups, all patterns valid",
                project.name(),
                project.filters().len(),
                project.groups().len()
            );
            if *write {
                save(path, &project)?;
            }
        }
    }

    Ok(())
}

fn apply_overrides(
    spec: &mut FilterSpec,
    priority: Option<i64>,
    disposition: Option<Disposition>,
    no_highlight: bool,
) {
    if let Some(priority) = priority {
        spec.priority = priority;
    }
    if let Some(disposition) = disposition {
        spec.disposition = disposition;
    }
    if no_highlight {
        spec.highlight_enabled = false;
    }
}
