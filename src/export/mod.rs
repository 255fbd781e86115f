//! Export to word-processor documents and PDF.
//!
//! The [`Converter`] trait is the seam to the external tools: one method per
//! conversion. [`CommandConverter`] drives real programs; tests substitute a
//! fake. [`Exporter`] owns the per-volume flow and its failure policy.

pub mod command;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use crate::config::schema::{ExportSettings, Volume};
use crate::error::ExportError;
use crate::observability::Reporter;

pub use command::CommandConverter;

/// External conversion capability.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Converts markdown into a word-processor document styled by `template`.
    ///
    /// # Errors
    ///
    /// Returns an error if no candidate tool produced `output`.
    async fn to_document(
        &self,
        input: &Path,
        output: &Path,
        template: &Path,
    ) -> Result<(), ExportError>;

    /// Renders `document` as a PDF inside `out_dir`, returning its path.
    ///
    /// # Errors
    ///
    /// Returns an error if no candidate tool produced the PDF.
    async fn to_pdf(&self, document: &Path, out_dir: &Path) -> Result<PathBuf, ExportError>;
}

/// Artifacts produced for one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedVolume {
    /// Word-processor document.
    pub document: PathBuf,
    /// PDF, when the rasterizer succeeded.
    pub pdf: Option<PathBuf>,
}

impl ExportedVolume {
    /// Every artifact that exists, document first.
    #[must_use]
    pub fn artifacts(&self) -> Vec<PathBuf> {
        std::iter::once(self.document.clone())
            .chain(self.pdf.clone())
            .collect()
    }
}

/// Per-volume export flow over a [`Converter`].
pub struct Exporter<'a> {
    converter: &'a dyn Converter,
    settings: &'a ExportSettings,
    base_dir: PathBuf,
    output_dir: PathBuf,
}

impl std::fmt::Debug for Exporter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("base_dir", &self.base_dir)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl<'a> Exporter<'a> {
    /// Creates an exporter writing into `output_dir`.
    ///
    /// Relative template paths are resolved against `base_dir`.
    #[must_use]
    pub fn new(
        converter: &'a dyn Converter,
        settings: &'a ExportSettings,
        base_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            converter,
            settings,
            base_dir: base_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Exports one volume from its transformed markdown at `input`.
    ///
    /// A PDF failure is reported as a warning; the volume still counts as
    /// exported with its document.
    ///
    /// # Errors
    ///
    /// Returns an error if the template or input is missing, the output
    /// directory cannot be created, or document conversion fails.
    pub async fn export_volume(
        &self,
        volume: &Volume,
        input: &Path,
        reporter: &dyn Reporter,
    ) -> Result<ExportedVolume, ExportError> {
        let template = self.settings.template_for(volume, &self.base_dir);
        if !template.is_file() {
            return Err(ExportError::TemplateMissing { path: template });
        }
        if !input.is_file() {
            return Err(ExportError::InputMissing {
                path: input.to_path_buf(),
            });
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;

        let document = self
            .output_dir
            .join(format!("{}.{}", volume.output_name, self.settings.format));
        self.converter
            .to_document(input, &document, &template)
            .await?;
        reporter.info(&format!("Created {}", document.display()));

        let pdf = match self.converter.to_pdf(&document, &self.output_dir).await {
            Ok(pdf) => {
                reporter.info(&format!("Created {}", pdf.display()));
                Some(pdf)
            }
            Err(e) => {
                reporter.warn(&format!(
                    "PDF conversion failed for {}: {e}",
                    volume.name
                ));
                None
            }
        };

        Ok(ExportedVolume { document, pdf })
    }
}
