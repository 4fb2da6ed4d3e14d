use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::filter::{Disposition, PatternMode};

/// Highlight log files with prioritized filters and render focused views of them
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, env = "LOG_FOCUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// When to use terminal colors
    #[arg(long, global = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a log file with matched lines colored by their winning filter
    Highlight {
        /// Project file with filter definitions
        #[arg(short, long)]
        project: PathBuf,

        /// Log file to highlight
        file: PathBuf,

        /// Print per-filter match counts instead of the document
        #[arg(short, long)]
        summary: bool,
    },
    /// Print only the lines selected by the filters' focus dispositions
    Focus {
        /// Project file with filter definitions
        #[arg(short, long)]
        project: PathBuf,

        /// Log file to focus
        file: PathBuf,

        /// Prefix each line with its line number in the original file
        #[arg(short = 'n', long)]
        line_numbers: bool,

        /// Write the focus view to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the filters of a project
    List {
        #[arg(short, long)]
        project: PathBuf,
    },
    /// Add a filter to a project (the file is created if missing)
    Add {
        #[arg(short, long)]
        project: PathBuf,

        /// Text to match (literal unless --mode regex)
        pattern: String,

        /// How the pattern is read: text or regex
        #[arg(short, long, default_value_t = PatternMode::Text)]
        mode: PatternMode,

        /// Shorthand for --mode regex
        #[arg(short, long, conflicts_with = "mode")]
        regex: bool,

        /// Match regardless of case
        #[arg(short, long)]
        ignore_case: bool,

        /// Display name (defaults to the pattern)
        #[arg(long)]
        name: Option<String>,

        /// Priority from 0 to 100; higher wins shared lines
        #[arg(long)]
        priority: Option<i64>,

        /// Effect on focus views: included, excluded or none
        #[arg(short, long)]
        disposition: Option<Disposition>,

        /// Do not highlight matches
        #[arg(long)]
        no_highlight: bool,

        /// Add to this group, created if missing, seeding defaults from it
        #[arg(short, long)]
        group: Option<String>,
    },
    /// Remove a filter (by name or id) or a group with all its filters
    Remove {
        #[arg(short, long)]
        project: PathBuf,

        /// Filter name or id
        target: String,

        /// Treat the target as a group name
        #[arg(long)]
        group: bool,
    },
    /// Turn highlighting for the whole project on or off
    Filtering {
        #[arg(short, long)]
        project: PathBuf,

        #[arg(value_enum)]
        state: Switch,
    },
    /// Validate a project file and optionally rewrite it in canonical form
    Check {
        #[arg(short, long)]
        project: PathBuf,

        /// Rewrite the file with normalized values and generated ids
        #[arg(short, long)]
        write: bool,
    },
}

pub fn cli_parse() -> Cli {
    Cli::parse()
}
