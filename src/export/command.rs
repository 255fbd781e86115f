//! Subprocess-backed [`Converter`].
//!
//! Each conversion walks an ordered list of candidate invocations. A
//! candidate whose program cannot be found is skipped; every invocation is
//! bounded by the configured timeout.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::schema::ExportSettings;
use crate::error::{ConfigError, ExportError};

use super::Converter;

/// Runs the configured converter and rasterizer programs.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    converter: Vec<Vec<String>>,
    rasterizer: Vec<Vec<String>>,
    document_args: Vec<OsString>,
    timeout: Duration,
}

/// Outcome of a single spawn attempt.
enum RunError {
    NotFound,
    Failed(ExportError),
}

impl CommandConverter {
    /// Builds the adapter from export settings.
    ///
    /// Filter scripts and the resource path are resolved against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the timeout cannot be parsed.
    pub fn from_settings(settings: &ExportSettings, base_dir: &Path) -> Result<Self, ConfigError> {
        let timeout = settings
            .timeout()
            .map_err(|e| ConfigError::InvalidValue {
                field: "export.timeout".to_string(),
                value: settings.timeout.clone(),
                expected: format!("a duration such as 90s or 5m ({e})"),
            })?;

        let mut document_args = Vec::new();
        if let Some(resources) = &settings.resource_path {
            document_args.push(flag_with_path("--resource-path=", &base_dir.join(resources)));
        }
        for filter in &settings.filters {
            let script = base_dir.join(&settings.filters_dir).join(filter);
            document_args.push(flag_with_path("--lua-filter=", &script));
        }
        document_args.extend(settings.extra_args.iter().map(OsString::from));

        Ok(Self {
            converter: settings.converter.iter().map(|c| c.argv()).collect(),
            rasterizer: settings.rasterizer.iter().map(|c| c.argv()).collect(),
            document_args,
            timeout,
        })
    }

    /// Per-invocation timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Tries each candidate until one leaves `artifact` behind.
    ///
    /// With `accept_failed_exit`, a non-zero exit still counts as success
    /// when the artifact exists.
    async fn run_candidates(
        &self,
        tool: &'static str,
        candidates: &[Vec<String>],
        args: &[OsString],
        artifact: &Path,
        accept_failed_exit: bool,
    ) -> Result<(), ExportError> {
        remove_stale(artifact).await?;

        let mut tried = Vec::new();
        let mut failures = Vec::new();

        for candidate in candidates {
            let Some((program, prefix)) = candidate.split_first() else {
                continue;
            };
            let argv: Vec<OsString> = prefix
                .iter()
                .map(OsString::from)
                .chain(args.iter().cloned())
                .collect();

            debug!(tool, command = %render_command(program, &argv), "running external tool");

            match self.run(program, &argv).await {
                Ok(output) => {
                    log_output(program, &output);
                    if output.status.success() {
                        if artifact.exists() {
                            return Ok(());
                        }
                        failures.push(format!(
                            "{program} exited successfully but did not create {}",
                            artifact.display()
                        ));
                        continue;
                    }

                    let failure = ExportError::NonZeroExit {
                        program: program.clone(),
                        code: output.status.code(),
                        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    };
                    if accept_failed_exit && artifact.exists() {
                        warn!(tool, "{failure}, but {} was created", artifact.display());
                        return Ok(());
                    }
                    failures.push(failure.to_string());
                }
                Err(RunError::NotFound) => {
                    debug!(tool, program = %program, "candidate not found");
                    tried.push(program.clone());
                }
                Err(RunError::Failed(e)) => failures.push(e.to_string()),
            }
        }

        if failures.is_empty() {
            Err(ExportError::ToolNotFound { tool, tried })
        } else {
            Err(ExportError::AllCandidatesFailed { tool, failures })
        }
    }

    async fn run(&self, program: &str, args: &[OsString]) -> Result<Output, RunError> {
        let mut command = tokio::process::Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                RunError::NotFound
            } else {
                RunError::Failed(ExportError::Io(e))
            }
        })?;

        tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                RunError::Failed(ExportError::Timeout {
                    program: program.to_string(),
                    timeout: self.timeout,
                })
            })?
            .map_err(|e| RunError::Failed(ExportError::Io(e)))
    }
}

#[async_trait]
impl Converter for CommandConverter {
    async fn to_document(
        &self,
        input: &Path,
        output: &Path,
        template: &Path,
    ) -> Result<(), ExportError> {
        let mut args = vec![
            input.as_os_str().to_os_string(),
            flag_with_path("--reference-doc=", template),
            flag_with_path("--output=", output),
            OsString::from("--verbose"),
            OsString::from("--embed-resources"),
        ];
        args.extend(self.document_args.iter().cloned());

        self.run_candidates("converter", &self.converter, &args, output, false)
            .await
    }

    async fn to_pdf(&self, document: &Path, out_dir: &Path) -> Result<PathBuf, ExportError> {
        let stem = document.file_stem().unwrap_or_else(|| document.as_os_str());
        let mut pdf_name = stem.to_os_string();
        pdf_name.push(".pdf");
        let pdf = out_dir.join(pdf_name);

        let args = vec![
            OsString::from("--headless"),
            OsString::from("--convert-to"),
            OsString::from("pdf:writer_pdf_Export"),
            document.as_os_str().to_os_string(),
            OsString::from("--outdir"),
            out_dir.as_os_str().to_os_string(),
        ];

        self.run_candidates("rasterizer", &self.rasterizer, &args, &pdf, true)
            .await?;
        Ok(pdf)
    }
}

fn flag_with_path(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path);
    arg
}

async fn remove_stale(artifact: &Path) -> Result<(), ExportError> {
    match tokio::fs::remove_file(artifact).await {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(ExportError::Io(e)),
        _ => Ok(()),
    }
}

/// Shell-quoted rendering of a command line, for logs.
fn render_command(program: &str, args: &[OsString]) -> String {
    let words: Vec<String> = std::iter::once(program.to_string())
        .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
        .collect();
    shlex::try_join(words.iter().map(String::as_str)).unwrap_or_else(|_| words.join(" "))
}

fn log_output(program: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        debug!(program, "{}", stdout.trim_end());
    }
    if !stderr.trim().is_empty() {
        debug!(program, stderr = true, "{}", stderr.trim_end());
    }
}
