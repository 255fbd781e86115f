//! Error types for `bookwright`
//!
//! Fatal conditions surface through [`BookwrightError`] and map to a
//! process exit code. Per-volume and per-rule problems are [`StageError`]
//! values that the pipeline reports as warnings and then moves past.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for `bookwright` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// Configuration error (missing file, invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (permission denied, unwritable output directory)
    pub const IO_ERROR: i32 = 3;

    /// A pipeline stage produced no documents
    pub const STAGE_ERROR: i32 = 4;

    /// Export failed for every selected volume
    pub const EXPORT_ERROR: i32 = 5;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for `bookwright` operations.
#[derive(Debug, Error)]
pub enum BookwrightError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A pipeline stage could not continue
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Export of the final documents failed
    #[error(transparent)]
    Export(#[from] ExportError),

    /// Invalid command-line usage
    #[error("usage error: {0}")]
    Usage(#[from] clap::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BookwrightError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) => ExitCode::CONFIG_ERROR,
            Self::Stage(_) => ExitCode::STAGE_ERROR,
            Self::Export(_) => ExitCode::EXPORT_ERROR,
            Self::Usage(_) => ExitCode::USAGE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
///
/// All of these are fatal for the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration or definitions file does not exist or cannot be read
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Line number where the error occurred (if available)
        line: Option<usize>,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}: {}", summarize(.errors))]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },

    /// Field has an invalid value
    #[error("invalid value for '{field}': got '{value}', expected {expected}")]
    InvalidValue {
        /// Name of the field with invalid value
        field: String,
        /// The actual value provided
        value: String,
        /// Description of what was expected
        expected: String,
    },

    /// Environment variable referenced in configuration is not set
    #[error("environment variable '{var}' not set (referenced at {location})")]
    EnvVarNotSet {
        /// Name of the environment variable
        var: String,
        /// Location in the configuration where it was referenced
        location: String,
    },

    /// A volume requested on the command line is not configured
    #[error("volume '{name}' not found in configuration{}", suggestion_suffix(.suggestion.as_deref()))]
    UnknownVolume {
        /// Requested volume name
        name: String,
        /// Closest configured name, if any is near enough
        suggestion: Option<String>,
    },
}

fn summarize(errors: &[ValidationIssue]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn format_timeout(timeout: &Duration) -> humantime::FormattedDuration {
    humantime::format_duration(*timeout)
}

fn suggestion_suffix(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "volumes.volume-001.title")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Prevents the configuration from being used
    Error,
    /// Reported, but the configuration is still usable
    Warning,
}

// ============================================================================
// Stage Errors
// ============================================================================

/// Problems raised by the text-transformation stages.
///
/// Every variant except [`StageError::NothingProduced`] is recoverable:
/// the offending volume, entity or rule is skipped and the batch continues.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StageError {
    /// A volume's source subdirectory is absent
    #[error("input directory {} does not exist, skipping {volume}", .path.display())]
    VolumeInputMissing {
        /// Volume being merged
        volume: String,
        /// Expected input directory
        path: PathBuf,
    },

    /// A volume directory holds no eligible markdown files
    #[error("no markdown files found in {}, skipping {volume}", .path.display())]
    NoInputFiles {
        /// Volume being merged
        volume: String,
        /// Directory that was scanned
        path: PathBuf,
    },

    /// A stage was asked to process a file that does not exist
    #[error("file {} not found, skipping", .path.display())]
    InputFileMissing {
        /// Missing file
        path: PathBuf,
    },

    /// An entity definition line carries a malformed hex code
    #[error("invalid hex code {code} for entity {name} (line {line})")]
    InvalidEntityDefinition {
        /// Entity name from the definition line
        name: String,
        /// Offending code field
        code: String,
        /// One-based line number in the definitions file
        line: usize,
    },

    /// An entity definition names something no `&name;` reference can match
    #[error("invalid entity name {name} (line {line})")]
    InvalidEntityName {
        /// Offending name field
        name: String,
        /// One-based line number in the definitions file
        line: usize,
    },

    /// A document references an entity that is not in the table
    #[error("unknown entity &{name};")]
    UnknownEntityReference {
        /// Referenced entity name
        name: String,
    },

    /// A style rule's pattern could not be compiled
    #[error("invalid regex pattern in style '{style}': {pattern} - {message}")]
    InvalidStylePattern {
        /// Style the rule belongs to
        style: String,
        /// Offending pattern text
        pattern: String,
        /// Compiler message
        message: String,
    },

    /// A stage produced no output documents at all
    #[error("{stage} stage produced no documents")]
    NothingProduced {
        /// Stage name
        stage: &'static str,
    },
}

// ============================================================================
// Export Errors
// ============================================================================

/// Errors from the external conversion tools.
#[derive(Debug, Error)]
pub enum ExportError {
    /// No candidate invocation of a tool could be spawned
    #[error("{tool} not found (tried: {})", .tried.join(", "))]
    ToolNotFound {
        /// Tool role ("converter" or "rasterizer")
        tool: &'static str,
        /// Candidate programs that were attempted
        tried: Vec<String>,
    },

    /// Every candidate ran but none produced the expected artifact
    #[error("{tool} failed with every candidate: {}", .failures.join("; "))]
    AllCandidatesFailed {
        /// Tool role
        tool: &'static str,
        /// One message per failed candidate
        failures: Vec<String>,
    },

    /// The tool exited with a non-zero status
    #[error("{program} exited with status {code:?}: {stderr}")]
    NonZeroExit {
        /// Program that was run
        program: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The tool did not finish within the configured timeout
    #[error("{program} timed out after {}", format_timeout(.timeout))]
    Timeout {
        /// Program that was run
        program: String,
        /// Configured limit
        timeout: Duration,
    },

    /// The reference template for a volume does not exist
    #[error("template file {} not found", .path.display())]
    TemplateMissing {
        /// Expected template path
        path: PathBuf,
    },

    /// The transformed markdown for a volume does not exist
    #[error("input file {} not found", .path.display())]
    InputMissing {
        /// Expected input path
        path: PathBuf,
    },

    /// Export produced nothing for any selected volume
    #[error("no volumes were exported")]
    NothingExported,

    /// I/O error while preparing the export
    #[error("export I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for `bookwright` operations.
pub type Result<T> = std::result::Result<T, BookwrightError>;

// ============================================================================
// Tests
// ============================================================================
