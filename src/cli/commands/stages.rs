//! Single-stage commands.
//!
//! Each runs one pipeline stage on its own, for rebuilding part of a
//! volume set by hand.

use crate::cli::args::{CustomizeArgs, EntitizeArgs, ExportArgs, MergeArgs};
use crate::error::{BookwrightError, ExportError};
use crate::export::{CommandConverter, Exporter};
use crate::observability::{Reporter, TracingReporter};
use crate::pipeline::{
    load_entities, load_style_rules, load_volumes, run_customize, run_entitize, run_merge,
    select_volumes,
};

/// Merges the selected volumes.
///
/// # Errors
///
/// Returns an error if the volumes file is invalid, the volume is unknown,
/// or no volume was merged.
pub fn merge(args: &MergeArgs) -> Result<(), BookwrightError> {
    let reporter = TracingReporter;
    let config = load_volumes(&args.volumes, &reporter)?;
    let volumes = select_volumes(&config, args.volume.as_deref())?;

    let report = run_merge(&volumes, &args.input, &args.output, &reporter)?.require_output("merge")?;
    tracing::info!(
        merged = report.written.len(),
        skipped = report.skipped.len(),
        "merge finished"
    );
    Ok(())
}

/// Substitutes entities in the given files.
///
/// # Errors
///
/// Returns an error if the definitions file is missing or no file was
/// processed.
pub fn entitize(args: &EntitizeArgs) -> Result<(), BookwrightError> {
    let reporter = TracingReporter;
    let table = load_entities(&args.entities, &reporter)?;

    let report =
        run_entitize(&args.files, &args.output, &table, &reporter)?.require_output("entitize")?;
    tracing::info!(
        processed = report.written.len(),
        skipped = report.skipped.len(),
        "entity substitution finished"
    );
    Ok(())
}

/// Applies the style rules to the given files.
///
/// # Errors
///
/// Returns an error if the styles file is missing or invalid, or no file
/// was processed.
pub fn customize(args: &CustomizeArgs) -> Result<(), BookwrightError> {
    let reporter = TracingReporter;
    let rules = load_style_rules(&args.styles, &reporter)?;

    let report =
        run_customize(&args.files, &args.output, &rules, &reporter)?.require_output("customize")?;
    tracing::info!(
        processed = report.written.len(),
        skipped = report.skipped.len(),
        "style customization finished"
    );
    Ok(())
}

/// Exports `<input>/<volume>.md` for each selected volume.
///
/// # Errors
///
/// Returns an error if the volumes file is invalid, the volume is unknown,
/// or no volume was exported.
pub async fn export(args: &ExportArgs) -> Result<(), BookwrightError> {
    let reporter = TracingReporter;
    let config = load_volumes(&args.volumes, &reporter)?;
    let volumes = select_volumes(&config, args.volume.as_deref())?;

    let base_dir = std::env::current_dir()?;
    let converter = CommandConverter::from_settings(&config.export, &base_dir)?;
    let exporter = Exporter::new(&converter, &config.export, base_dir, &args.output);

    let mut exported = 0_usize;
    for volume in &volumes {
        let input = args.input.join(volume.document_file_name());
        match exporter.export_volume(volume, &input, &reporter).await {
            Ok(_) => exported += 1,
            Err(e) => reporter.error(&format!("Export failed for {}: {e}", volume.name)),
        }
    }

    if exported == 0 {
        return Err(ExportError::NothingExported.into());
    }
    tracing::info!(exported, total = volumes.len(), "export finished");
    Ok(())
}
