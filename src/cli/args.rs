//! CLI argument definitions
//!
//! All Clap derive structs for `bookwright` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::observability::LogFormat;

// ============================================================================
// Root CLI
// ============================================================================

/// Builds word-processor and PDF volumes from markdown fragments.
#[derive(Parser, Debug)]
#[command(name = "bookwright", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "BOOKWRIGHT_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: LogFormat,

    /// Also write the log, uncolored, to this file.
    #[arg(long, global = true, env = "BOOKWRIGHT_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole pipeline: merge, entities, styles, export.
    Build(BuildArgs),

    /// Merge volume fragments into one markdown document per volume.
    Merge(MergeArgs),

    /// Replace `&name;` entity references with Unicode characters.
    Entitize(EntitizeArgs),

    /// Apply regex style rules outside `:::` fence blocks.
    Customize(CustomizeArgs),

    /// Convert transformed documents with the external tools.
    Export(ExportArgs),

    /// Validate configuration files without building.
    Validate(ValidateArgs),

    /// Generate shell completion scripts.
    Completions(CompletionsArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Pipeline Commands
// ============================================================================

/// Arguments for `build`.
#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Volumes configuration file.
    pub volumes: PathBuf,

    /// Styles configuration file.
    pub styles: PathBuf,

    /// Entity definitions file.
    pub entities: PathBuf,

    /// Build only this volume.
    #[arg(long)]
    pub volume: Option<String>,

    /// Directory holding the per-volume source directories.
    #[arg(short, long, default_value = ".")]
    pub input: PathBuf,

    /// Directory for intermediate documents.
    #[arg(short, long, default_value = "obj", env = "BOOKWRIGHT_TEMP_DIR")]
    pub temp: PathBuf,

    /// Directory for the exported documents.
    #[arg(short, long, default_value = "build", env = "BOOKWRIGHT_OUTPUT_DIR")]
    pub output: PathBuf,

    /// Stop after the style stage.
    #[arg(long)]
    pub skip_export: bool,

    /// Summary format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `merge`.
#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Volumes configuration file.
    pub volumes: PathBuf,

    /// Merge only this volume.
    #[arg(long)]
    pub volume: Option<String>,

    /// Directory holding the per-volume source directories.
    #[arg(short, long, default_value = ".")]
    pub input: PathBuf,

    /// Directory for the merged documents.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Arguments for `entitize`.
#[derive(Args, Debug)]
pub struct EntitizeArgs {
    /// Entity definitions file.
    pub entities: PathBuf,

    /// Markdown files to process.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output directory.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Arguments for `customize`.
#[derive(Args, Debug)]
pub struct CustomizeArgs {
    /// Styles configuration file.
    pub styles: PathBuf,

    /// Markdown files to process.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output directory.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

/// Arguments for `export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Volumes configuration file.
    pub volumes: PathBuf,

    /// Export only this volume.
    #[arg(long)]
    pub volume: Option<String>,

    /// Directory holding `<volume>.md` documents.
    #[arg(short, long, default_value = "obj/custom")]
    pub input: PathBuf,

    /// Directory for the exported documents.
    #[arg(short, long, default_value = "build", env = "BOOKWRIGHT_OUTPUT_DIR")]
    pub output: PathBuf,
}

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Volumes configuration file.
    pub volumes: PathBuf,

    /// Styles configuration file to check as well.
    #[arg(long)]
    pub styles: Option<PathBuf>,

    /// Entity definitions file to check as well.
    #[arg(long)]
    pub entities: Option<PathBuf>,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Completions / Version
// ============================================================================

/// Arguments for shell completion generation.
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell for completion script.
    pub shell: Shell,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

/// Supported shells for completion generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bourne Again Shell.
    Bash,
    /// Z Shell.
    Zsh,
    /// Fish shell.
    Fish,
    /// `PowerShell`.
    #[value(name = "powershell")]
    PowerShell,
    /// Elvish shell.
    Elvish,
}

// ============================================================================
// Tests
// ============================================================================
