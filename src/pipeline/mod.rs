//! Build orchestration.
//!
//! Runs the stages strictly in order: merge into the temp directory,
//! entity substitution into `<temp>/unicode`, style customization into
//! `<temp>/custom`, then export. Each stage consumes exactly the documents
//! the previous one wrote, and a stage that writes nothing ends the run.

pub mod summary;

use std::path::{Path, PathBuf};

use crate::config::schema::{Volume, VolumesConfig};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{BookwrightError, ConfigError, StageError};
use crate::export::{Converter, Exporter};
use crate::observability::{RecordingReporter, Reporter};
use crate::transform::{
    EntityTable, StageOutcome, StyleRuleSet, entitize_file, customize_file, merge_volume,
};

pub use summary::{BuildSummary, VolumeReport, VolumeStatus};

// ============================================================================
// Configuration Helpers
// ============================================================================

/// Picks the volumes to build: all of them, or the one requested.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownVolume`] with the closest configured name
/// when `requested` is not configured.
pub fn select_volumes(
    config: &VolumesConfig,
    requested: Option<&str>,
) -> Result<Vec<Volume>, ConfigError> {
    let Some(name) = requested else {
        return Ok(config.resolved());
    };

    config
        .volume(name)
        .map(|volume| vec![volume])
        .ok_or_else(|| ConfigError::UnknownVolume {
            name: name.to_string(),
            suggestion: suggest_volume(config, name),
        })
}

/// Closest configured volume name within edit distance 3.
#[must_use]
pub fn suggest_volume(config: &VolumesConfig, input: &str) -> Option<String> {
    config
        .names()
        .map(|name| (name, strsim::damerau_levenshtein(input, name)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.to_string())
}

/// Loads the volumes file and reports its warnings.
///
/// # Errors
///
/// Returns any loading or validation error.
pub fn load_volumes(path: &Path, reporter: &dyn Reporter) -> Result<VolumesConfig, ConfigError> {
    let loaded = ConfigLoader::with_defaults().load_volumes(path)?;
    report_load_warnings(&loaded.warnings, reporter);
    Ok(loaded.config)
}

/// Loads and compiles the styles file, reporting skipped rules.
///
/// # Errors
///
/// Returns any loading or validation error.
pub fn load_style_rules(path: &Path, reporter: &dyn Reporter) -> Result<StyleRuleSet, ConfigError> {
    let loaded = ConfigLoader::with_defaults().load_styles(path)?;
    // Validation compiles every rule too, so rejected rules already
    // appear among the load warnings.
    report_load_warnings(&loaded.warnings, reporter);
    let (rules, rejected) = StyleRuleSet::compile(&loaded.config);
    tracing::debug!(
        rules = rules.len(),
        rejected = rejected.len(),
        "compiled style rules"
    );
    Ok(rules)
}

/// Loads the entity table, reporting malformed definitions.
///
/// # Errors
///
/// Returns [`ConfigError::MissingFile`] if the definitions file is absent.
pub fn load_entities(path: &Path, reporter: &dyn Reporter) -> Result<EntityTable, ConfigError> {
    let (table, rejected) = EntityTable::load(path)?;
    for problem in rejected {
        reporter.warn(&problem.to_string());
    }
    reporter.info(&format!(
        "Loaded {} entities from {}",
        table.len(),
        path.display()
    ));
    Ok(table)
}

fn report_load_warnings(warnings: &[LoadWarning], reporter: &dyn Reporter) {
    for warning in warnings {
        match &warning.location {
            Some(location) => reporter.warn(&format!("{} at {location}", warning.message)),
            None => reporter.warn(&warning.message),
        }
    }
}

// ============================================================================
// Stage Runners
// ============================================================================

/// Documents written by one stage run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageReport {
    /// Written documents, in processing order.
    pub written: Vec<PathBuf>,
    /// Skipped items with their reasons.
    pub skipped: Vec<StageError>,
}

impl StageReport {
    fn push(&mut self, outcome: StageOutcome) {
        match outcome {
            StageOutcome::Written(path) => self.written.push(path),
            StageOutcome::Skipped(reason) => self.skipped.push(reason),
        }
    }

    /// Fails with [`StageError::NothingProduced`] when nothing was written.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn require_output(self, stage: &'static str) -> Result<Self, StageError> {
        if self.written.is_empty() {
            Err(StageError::NothingProduced { stage })
        } else {
            Ok(self)
        }
    }
}

/// Merges each volume into `output_dir`.
///
/// # Errors
///
/// Returns an I/O error on unreadable fragments or unwritable output.
pub fn run_merge(
    volumes: &[Volume],
    input_root: &Path,
    output_dir: &Path,
    reporter: &dyn Reporter,
) -> Result<StageReport, BookwrightError> {
    let mut report = StageReport::default();
    for volume in volumes {
        report.push(merge_volume(volume, input_root, output_dir, reporter)?);
    }
    Ok(report)
}

/// Substitutes entities in each file into `output_dir`.
///
/// # Errors
///
/// Returns an I/O error on unreadable input or unwritable output.
pub fn run_entitize(
    files: &[PathBuf],
    output_dir: &Path,
    table: &EntityTable,
    reporter: &dyn Reporter,
) -> Result<StageReport, BookwrightError> {
    let mut report = StageReport::default();
    for file in files {
        report.push(entitize_file(file, output_dir, table, reporter)?);
    }
    Ok(report)
}

/// Customizes each file into `output_dir`.
///
/// # Errors
///
/// Returns an I/O error on unreadable input or unwritable output.
pub fn run_customize(
    files: &[PathBuf],
    output_dir: &Path,
    rules: &StyleRuleSet,
    reporter: &dyn Reporter,
) -> Result<StageReport, BookwrightError> {
    let mut report = StageReport::default();
    for file in files {
        report.push(customize_file(file, output_dir, rules, reporter)?);
    }
    Ok(report)
}

// ============================================================================
// Pipeline
// ============================================================================

/// Directories a build reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildDirs {
    /// Parent of the per-volume source directories.
    pub input_root: PathBuf,
    /// Intermediate documents; stage outputs live here and below.
    pub temp_dir: PathBuf,
    /// Final artifacts.
    pub output_dir: PathBuf,
    /// Anchor for relative template, filter and resource paths.
    pub base_dir: PathBuf,
}

impl BuildDirs {
    /// Output of the entity substitution stage.
    #[must_use]
    pub fn unicode_dir(&self) -> PathBuf {
        self.temp_dir.join("unicode")
    }

    /// Output of the style customization stage.
    #[must_use]
    pub fn custom_dir(&self) -> PathBuf {
        self.temp_dir.join("custom")
    }
}

/// A full build over a set of volumes.
pub struct Pipeline<'a> {
    config: &'a VolumesConfig,
    volumes: Vec<Volume>,
    entities: &'a EntityTable,
    rules: &'a StyleRuleSet,
    dirs: BuildDirs,
    reporter: RecordingReporter,
}

impl std::fmt::Debug for Pipeline<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("volumes", &self.volumes.len())
            .field("entities", &self.entities.len())
            .field("rules", &self.rules.len())
            .field("dirs", &self.dirs)
            .finish_non_exhaustive()
    }
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline; every report is forwarded to `reporter` and
    /// counted for the summary.
    #[must_use]
    pub fn new(
        config: &'a VolumesConfig,
        volumes: Vec<Volume>,
        entities: &'a EntityTable,
        rules: &'a StyleRuleSet,
        dirs: BuildDirs,
        reporter: impl Reporter + 'static,
    ) -> Self {
        Self {
            config,
            volumes,
            entities,
            rules,
            dirs,
            reporter: RecordingReporter::forwarding(reporter),
        }
    }

    /// Runs every stage; export is skipped when `converter` is `None`.
    ///
    /// The returned summary may contain no successful volume; callers
    /// decide how to treat that.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::NothingProduced`] when a transformation stage
    /// writes nothing, or an I/O error from any stage.
    pub async fn run(
        &self,
        converter: Option<&dyn Converter>,
    ) -> Result<BuildSummary, BookwrightError> {
        let mut summary = BuildSummary::start();
        let reporter = &self.reporter;

        let mut documents = Vec::new();
        for volume in &self.volumes {
            match merge_volume(volume, &self.dirs.input_root, &self.dirs.temp_dir, reporter)? {
                StageOutcome::Written(path) => documents.push((volume, path)),
                StageOutcome::Skipped(reason) => summary.record(
                    &volume.name,
                    VolumeStatus::Skipped {
                        reason: reason.to_string(),
                    },
                ),
            }
        }
        require_documents("merge", &documents)?;

        let unicode_dir = self.dirs.unicode_dir();
        let documents = self.advance(documents, "entitize", &mut summary, |path| {
            entitize_file(path, &unicode_dir, self.entities, reporter)
        })?;

        let custom_dir = self.dirs.custom_dir();
        let documents = self.advance(documents, "customize", &mut summary, |path| {
            customize_file(path, &custom_dir, self.rules, reporter)
        })?;

        match converter {
            Some(converter) => {
                let exporter = Exporter::new(
                    converter,
                    &self.config.export,
                    &self.dirs.base_dir,
                    &self.dirs.output_dir,
                );
                for (volume, path) in documents {
                    let status = match exporter.export_volume(volume, &path, reporter).await {
                        Ok(exported) => VolumeStatus::Built {
                            artifacts: exported.artifacts(),
                        },
                        Err(e) => {
                            reporter.error(&format!("Export failed for {}: {e}", volume.name));
                            VolumeStatus::ExportFailed {
                                reason: e.to_string(),
                            }
                        }
                    };
                    summary.record(&volume.name, status);
                }
            }
            None => {
                for (volume, document) in documents {
                    summary.record(&volume.name, VolumeStatus::Prepared { document });
                }
            }
        }

        let order = |name: &str| self.volumes.iter().position(|v| v.name == name);
        summary.volumes.sort_by_key(|report| order(&report.name));
        summary.finish(reporter.problem_count());
        Ok(summary)
    }

    /// Runs one per-file stage over the surviving documents.
    fn advance<'v, F>(
        &self,
        documents: Vec<(&'v Volume, PathBuf)>,
        stage: &'static str,
        summary: &mut BuildSummary,
        mut run: F,
    ) -> Result<Vec<(&'v Volume, PathBuf)>, BookwrightError>
    where
        F: FnMut(&Path) -> Result<StageOutcome, BookwrightError>,
    {
        let mut next = Vec::with_capacity(documents.len());
        for (volume, path) in documents {
            match run(&path)? {
                StageOutcome::Written(written) => next.push((volume, written)),
                StageOutcome::Skipped(reason) => summary.record(
                    &volume.name,
                    VolumeStatus::Skipped {
                        reason: reason.to_string(),
                    },
                ),
            }
        }
        require_documents(stage, &next)?;
        Ok(next)
    }
}

fn require_documents<T>(stage: &'static str, documents: &[T]) -> Result<(), StageError> {
    if documents.is_empty() {
        Err(StageError::NothingProduced { stage })
    } else {
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
