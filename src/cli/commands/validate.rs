//! Configuration validation without building.

use std::path::PathBuf;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::{ConfigLoader, LoadWarning};
use crate::error::{BookwrightError, ConfigError, Severity, ValidationIssue};
use crate::transform::EntityTable;

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    kind: &'static str,
    summary: String,
    warnings: Vec<String>,
}

/// Loads every given artifact and reports what it found.
///
/// # Errors
///
/// Returns the first loading or validation error, or, with `--strict`,
/// a validation error listing every warning.
pub fn run(args: &ValidateArgs) -> Result<(), BookwrightError> {
    let loader = ConfigLoader::with_defaults();
    let mut reports = Vec::new();

    tracing::info!(file = %args.volumes.display(), "validating volumes");
    let volumes = loader.load_volumes(&args.volumes)?;
    reports.push(FileReport {
        path: args.volumes.clone(),
        kind: "volumes",
        summary: format!("{} volumes", volumes.config.volumes.len()),
        warnings: render_warnings(&volumes.warnings),
    });

    if let Some(path) = &args.styles {
        tracing::info!(file = %path.display(), "validating styles");
        let styles = loader.load_styles(path)?;
        let rules: usize = styles.config.styles.values().map(|s| s.patterns.len()).sum();
        reports.push(FileReport {
            path: path.clone(),
            kind: "styles",
            summary: format!("{} styles, {rules} rules", styles.config.styles.len()),
            warnings: render_warnings(&styles.warnings),
        });
    }

    if let Some(path) = &args.entities {
        tracing::info!(file = %path.display(), "validating entities");
        let (table, rejected) = EntityTable::load(path)?;
        reports.push(FileReport {
            path: path.clone(),
            kind: "entities",
            summary: format!("{} entities", table.len()),
            warnings: rejected.iter().map(ToString::to_string).collect(),
        });
    }

    let strict_result = if args.strict {
        strict_check(&reports)
    } else {
        Ok(())
    };
    print_reports(&reports, args.format, strict_result.is_ok())?;
    strict_result.map_err(BookwrightError::from)
}

fn render_warnings(warnings: &[LoadWarning]) -> Vec<String> {
    warnings
        .iter()
        .map(|w| match &w.location {
            Some(location) => format!("{} at {location}", w.message),
            None => w.message.clone(),
        })
        .collect()
}

fn print_reports(
    reports: &[FileReport],
    format: OutputFormat,
    valid: bool,
) -> Result<(), BookwrightError> {
    match format {
        OutputFormat::Human => {
            for report in reports {
                println!(
                    "{} ({}): {}, {} warnings",
                    report.path.display(),
                    report.kind,
                    report.summary,
                    report.warnings.len()
                );
                for warning in &report.warnings {
                    println!("  warning: {warning}");
                }
            }
        }
        OutputFormat::Json => {
            let body = serde_json::json!({ "valid": valid, "files": reports });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}

fn strict_check(reports: &[FileReport]) -> Result<(), ConfigError> {
    let offending: Vec<&FileReport> = reports.iter().filter(|r| !r.warnings.is_empty()).collect();
    if offending.is_empty() {
        return Ok(());
    }

    let errors = offending
        .iter()
        .flat_map(|report| {
            report.warnings.iter().map(|message| ValidationIssue {
                path: report.kind.to_string(),
                message: message.clone(),
                severity: Severity::Error,
            })
        })
        .collect();

    Err(ConfigError::ValidationError {
        path: offending
            .iter()
            .map(|r| r.path.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
        errors,
    })
}
