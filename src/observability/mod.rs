//! Observability module
//!
//! Logging setup and the reporting collaborator used by the pipeline stages.

pub mod logging;
pub mod reporter;

pub use logging::{LogFormat, init_logging};
pub use reporter::{RecordingReporter, Report, ReportLevel, Reporter, TracingReporter};
