//! Markdown transformation stages
//!
//! Three file-to-file stages run in order for every volume:
//!
//! 1. [`merge`] - concatenates a volume's fragments and demotes headings
//! 2. [`entities`] - resolves `&name;` references to Unicode characters
//! 3. [`styles`] - applies regex rewrite rules outside `:::` fence blocks
//!
//! The text transforms themselves are pure functions over `&str`. The
//! `*_file` / `*_volume` wrappers add file I/O and report recoverable
//! problems through a [`Reporter`](crate::observability::Reporter).

pub mod entities;
pub mod merge;
pub mod styles;

use crate::error::StageError;
use std::path::{Path, PathBuf};

pub use entities::{EntityTable, Substitution, entitize_file, substitute};
pub use merge::{collect_sources, demote_headings, merge_documents, merge_volume};
pub use styles::{Segment, StyleRule, StyleRuleSet, compile_rule, customize, customize_file, segments};

/// Result of running one stage over one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage wrote a document.
    Written(PathBuf),
    /// The item was skipped; the reason has already been reported.
    Skipped(StageError),
}

impl StageOutcome {
    /// The written document, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Written(path) => Some(path),
            Self::Skipped(_) => None,
        }
    }
}

/// Destination for `input` when re-emitted into `output_dir` under the same name.
pub(crate) fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    input
        .file_name()
        .map_or_else(|| output_dir.join(input), |name| output_dir.join(name))
}

/// Reads a stage input, turning a missing file into a skip.
pub(crate) fn read_stage_input(path: &Path) -> std::io::Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Writes a stage output, creating the directory first.
pub(crate) fn write_stage_output(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)
}
