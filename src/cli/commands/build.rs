//! Full pipeline build.

use crate::cli::args::{BuildArgs, OutputFormat};
use crate::error::{BookwrightError, ExportError};
use crate::export::{CommandConverter, Converter};
use crate::observability::TracingReporter;
use crate::pipeline::{
    BuildDirs, Pipeline, load_entities, load_style_rules, load_volumes, select_volumes,
};

/// Runs merge, entity substitution, style customization and export, then
/// prints the build summary to stdout.
///
/// # Errors
///
/// Returns an error if a configuration artifact is missing or invalid, a
/// stage produces nothing, or export succeeds for no volume.
pub async fn run(args: &BuildArgs) -> Result<(), BookwrightError> {
    let reporter = TracingReporter;

    let config = load_volumes(&args.volumes, &reporter)?;
    let volumes = select_volumes(&config, args.volume.as_deref())?;
    let rules = load_style_rules(&args.styles, &reporter)?;
    let entities = load_entities(&args.entities, &reporter)?;

    let base_dir = std::env::current_dir()?;
    let converter = if args.skip_export {
        None
    } else {
        Some(CommandConverter::from_settings(&config.export, &base_dir)?)
    };

    let dirs = BuildDirs {
        input_root: args.input.clone(),
        temp_dir: args.temp.clone(),
        output_dir: args.output.clone(),
        base_dir,
    };
    tracing::info!(
        volumes = volumes.len(),
        rules = rules.len(),
        entities = entities.len(),
        "starting build"
    );

    let pipeline = Pipeline::new(&config, volumes, &entities, &rules, dirs, reporter);
    let summary = pipeline
        .run(converter.as_ref().map(|c| c as &dyn Converter))
        .await?;

    match args.format {
        OutputFormat::Human => print!("{}", summary.to_text()),
        OutputFormat::Json => println!("{}", summary.to_json()?),
    }

    if summary.succeeded() == 0 {
        return Err(ExportError::NothingExported.into());
    }
    Ok(())
}
