//! Volume merging.
//!
//! A volume is assembled from the `*.md` fragments of its input directory,
//! in file-name order, under a single `# <title>` heading. Every fragment's
//! headings are pushed one level down so they nest beneath that title.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::config::schema::Volume;
use crate::error::{BookwrightError, StageError};
use crate::observability::Reporter;

use super::{StageOutcome, write_stage_output};

/// Fragments ending in this suffix are scratch files and never merged.
const SCRATCH_SUFFIX: &str = ".tmp.md";

// ============================================================================
// Heading Demotion
// ============================================================================

/// Level an underline promotes the preceding line to, once demoted.
///
/// `===` marks a level-one heading and `---` a level-two heading.
fn setext_level(line: &str) -> Option<usize> {
    let trimmed = line.trim();
    let first = trimmed.chars().next()?;
    if !trimmed.chars().all(|c| c == first) {
        return None;
    }
    match first {
        '=' => Some(2),
        '-' => Some(3),
        _ => None,
    }
}

/// Shifts every heading in `fragment` one level deeper.
///
/// ATX headings gain a leading `#`. A non-blank line followed by an
/// underline of `=` or `-` becomes an ATX heading of level two or three,
/// and the underline is replaced by a blank line. Lines are split on `\n`
/// and rejoined with `\n`, so any `\r` stays on its line.
#[must_use]
pub fn demote_headings(fragment: &str) -> String {
    let lines: Vec<&str> = fragment.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if line.trim_start().starts_with('#') {
            out.push(format!("#{line}"));
            i += 1;
            continue;
        }

        let underline = lines.get(i + 1).and_then(|next| setext_level(next));
        match underline {
            Some(level) if !line.trim().is_empty() => {
                out.push(format!("{} {line}", "#".repeat(level)));
                out.push(String::new());
                i += 2;
            }
            _ => {
                out.push(line.to_string());
                i += 1;
            }
        }
    }

    out.join("\n")
}

/// Joins demoted fragments under a top-level title heading.
#[must_use]
pub fn merge_documents<S: AsRef<str>>(title: &str, fragments: &[S]) -> String {
    let mut parts = Vec::with_capacity(fragments.len() + 1);
    parts.push(format!("# {title}\n"));
    parts.extend(fragments.iter().map(|f| demote_headings(f.as_ref())));
    parts.join("\n\n")
}

// ============================================================================
// Sources
// ============================================================================

/// Lists the fragments of a volume directory, sorted by file name.
///
/// Every `*.md` file is included, dot-prefixed ones too, except `*.tmp.md`
/// scratch files.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be listed.
pub fn collect_sources(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.md", Pattern::escape(&dir.to_string_lossy()));
    let entries = glob::glob(&pattern)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let mut sources = Vec::new();
    for entry in entries {
        let path = entry.map_err(std::io::Error::from)?;
        let scratch = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(SCRATCH_SUFFIX));
        if path.is_file() && !scratch {
            sources.push(path);
        }
    }

    sources.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(sources)
}

/// Merges one volume into `<output_dir>/<volume name>.md`.
///
/// A missing input directory or an empty one is reported and skipped.
///
/// # Errors
///
/// Returns an I/O error if a fragment cannot be read or the merged
/// document cannot be written.
pub fn merge_volume(
    volume: &Volume,
    input_root: &Path,
    output_dir: &Path,
    reporter: &dyn Reporter,
) -> Result<StageOutcome, BookwrightError> {
    let input_dir = input_root.join(&volume.input_name);
    if !input_dir.is_dir() {
        return Ok(skip(
            reporter,
            StageError::VolumeInputMissing {
                volume: volume.name.clone(),
                path: input_dir,
            },
        ));
    }

    let sources = collect_sources(&input_dir)?;
    if sources.is_empty() {
        return Ok(skip(
            reporter,
            StageError::NoInputFiles {
                volume: volume.name.clone(),
                path: input_dir,
            },
        ));
    }

    let fragments = sources
        .iter()
        .map(std::fs::read_to_string)
        .collect::<std::io::Result<Vec<_>>>()?;

    let output = output_dir.join(volume.document_file_name());
    write_stage_output(&output, &merge_documents(&volume.title, &fragments))?;
    reporter.info(&format!(
        "Merged {} files into {}",
        sources.len(),
        output.display()
    ));

    Ok(StageOutcome::Written(output))
}

fn skip(reporter: &dyn Reporter, reason: StageError) -> StageOutcome {
    reporter.warn(&reason.to_string());
    StageOutcome::Skipped(reason)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::VolumeConfig;
    use crate::observability::{RecordingReporter, ReportLevel};
    use proptest::prelude::*;

    fn volume(name: &str, title: &str) -> Volume {
        Volume::resolve(
            name,
            &VolumeConfig {
                title: Some(title.to_string()),
                ..VolumeConfig::default()
            },
        )
    }

    #[test]
    fn atx_headings_gain_a_level() {
        assert_eq!(
            demote_headings("# One\ntext\n## Two\n  ### Three"),
            "## One\ntext\n### Two\n#  ### Three"
        );
    }

    #[test]
    fn setext_headings_become_atx() {
        assert_eq!(
            demote_headings("Title\n=====\nbody\nSection\n---\nmore"),
            "## Title\n\nbody\n### Section\n\nmore"
        );
    }

    #[test]
    fn underline_is_consumed_once() {
        // The second underline follows a consumed one, so it stays content.
        assert_eq!(demote_headings("Title\n===\n===\n"), "## Title\n\n===\n");
    }

    #[test]
    fn underline_needs_a_text_line() {
        assert_eq!(demote_headings("---\ntext"), "---\ntext");
        assert_eq!(demote_headings("\n---\ntext"), "\n---\ntext");
    }

    #[test]
    fn mixed_underline_is_not_setext() {
        assert_eq!(demote_headings("Title\n=-=\n"), "Title\n=-=\n");
    }

    #[test]
    fn underline_may_be_indented() {
        assert_eq!(demote_headings("Title\n  ---  "), "### Title\n");
    }

    #[test]
    fn merge_layout() {
        let merged = merge_documents("Book", &["# A\na", "b"]);
        assert_eq!(merged, "# Book\n\n\n## A\na\n\nb");
    }

    #[test]
    fn collect_sources_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.md", "a.md", "c.tmp.md", ".hidden.md", "notes.txt", "10.md"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }
        std::fs::create_dir(dir.path().join("dir.md")).unwrap();

        let names: Vec<String> = collect_sources(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![".hidden.md", "10.md", "a.md", "b.md"]);
    }

    #[test]
    fn collect_sources_escapes_directory() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("vol[1]");
        std::fs::create_dir(&dir).unwrap();
        std::fs::write(dir.join("a.md"), "x").unwrap();

        assert_eq!(collect_sources(&dir).unwrap().len(), 1);
    }

    #[test]
    fn merge_volume_orders_fragments() {
        let root = tempfile::tempdir().unwrap();
        let input = root.path().join("volume-001");
        std::fs::create_dir(&input).unwrap();
        std::fs::write(input.join("b.md"), "# Second").unwrap();
        std::fs::write(input.join("a.md"), "# First").unwrap();

        let reporter = RecordingReporter::new();
        let out_dir = root.path().join("obj");
        let outcome = merge_volume(
            &volume("volume-001", "Volume One"),
            root.path(),
            &out_dir,
            &reporter,
        )
        .unwrap();

        let written = out_dir.join("volume-001.md");
        assert_eq!(outcome, StageOutcome::Written(written.clone()));
        assert_eq!(
            std::fs::read_to_string(written).unwrap(),
            "# Volume One\n\n\n## First\n\n## Second"
        );
    }

    #[test]
    fn merge_volume_skips_missing_directory() {
        let root = tempfile::tempdir().unwrap();
        let reporter = RecordingReporter::new();
        let outcome =
            merge_volume(&volume("ghost", "Ghost"), root.path(), root.path(), &reporter).unwrap();

        assert!(matches!(
            outcome,
            StageOutcome::Skipped(StageError::VolumeInputMissing { .. })
        ));
        assert_eq!(reporter.messages(ReportLevel::Warn).len(), 1);
    }

    #[test]
    fn merge_volume_skips_empty_directory() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("empty")).unwrap();
        std::fs::write(root.path().join("empty").join("draft.tmp.md"), "x").unwrap();

        let reporter = RecordingReporter::new();
        let outcome =
            merge_volume(&volume("empty", "Empty"), root.path(), root.path(), &reporter).unwrap();
        assert!(matches!(
            outcome,
            StageOutcome::Skipped(StageError::NoInputFiles { .. })
        ));
    }

    fn count_hashes(text: &str) -> usize {
        text.split('\n')
            .map(|l| l.trim_start().chars().take_while(|c| *c == '#').count())
            .sum()
    }

    proptest! {
        #[test]
        fn demotion_adds_one_level_per_heading(
            lines in proptest::collection::vec("(#{1,4} [a-z]{1,6})|([a-z ]{0,8})", 0..12)
        ) {
            let text = lines.join("\n");
            let headings = lines.iter().filter(|l| l.starts_with('#')).count();

            let once = demote_headings(&text);
            let twice = demote_headings(&once);
            prop_assert_eq!(count_hashes(&once), count_hashes(&text) + headings);
            prop_assert_eq!(count_hashes(&twice), count_hashes(&text) + 2 * headings);
            if headings > 0 {
                prop_assert_ne!(once, twice);
            }
        }

        #[test]
        fn plain_text_is_unchanged(text in "[a-z \n]{0,64}") {
            prop_assert_eq!(demote_headings(&text), text);
        }
    }
}
