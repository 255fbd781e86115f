//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod build;
pub mod completions;
pub mod stages;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::BookwrightError;

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<(), BookwrightError> {
    match cli.command {
        Commands::Build(args) => build::run(&args).await,
        Commands::Merge(args) => stages::merge(&args),
        Commands::Entitize(args) => stages::entitize(&args),
        Commands::Customize(args) => stages::customize(&args),
        Commands::Export(args) => stages::export(&args).await,
        Commands::Validate(args) => validate::run(&args),
        Commands::Completions(args) => {
            completions::run(&args);
            Ok(())
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}
