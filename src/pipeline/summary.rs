//! Build summary.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VolumeStatus {
    /// Exported; artifacts listed document first.
    Built {
        /// Produced files.
        artifacts: Vec<PathBuf>,
    },
    /// Transformed, export not requested.
    Prepared {
        /// Ready-to-convert markdown.
        document: PathBuf,
    },
    /// Dropped by a transformation stage.
    Skipped {
        /// Reported reason.
        reason: String,
    },
    /// Transformed but the document conversion failed.
    ExportFailed {
        /// Reported reason.
        reason: String,
    },
}

impl VolumeStatus {
    /// Returns `true` for outcomes that count towards a successful run.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Built { .. } | Self::Prepared { .. })
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::Built { .. } => "built",
            Self::Prepared { .. } => "prepared",
            Self::Skipped { .. } => "skipped",
            Self::ExportFailed { .. } => "export failed",
        }
    }
}

/// Outcome of one volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeReport {
    /// Volume name.
    pub name: String,
    /// Outcome.
    #[serde(flatten)]
    pub status: VolumeStatus,
}

/// Outcome of a build run.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Per-volume outcomes, in declaration order.
    pub volumes: Vec<VolumeReport>,
    /// Warnings and errors reported during the run.
    pub warnings: usize,
}

impl BuildSummary {
    /// Starts an empty summary stamped with the current time.
    #[must_use]
    pub fn start() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            volumes: Vec::new(),
            warnings: 0,
        }
    }

    /// Records the outcome of a volume.
    pub fn record(&mut self, name: &str, status: VolumeStatus) {
        self.volumes.push(VolumeReport {
            name: name.to_string(),
            status,
        });
    }

    /// Stamps the finish time and the warning count.
    pub fn finish(&mut self, warnings: usize) {
        self.finished_at = Utc::now();
        self.warnings = warnings;
    }

    /// Number of volumes that built or were prepared.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.volumes.iter().filter(|v| v.status.is_success()).count()
    }

    /// Renders a short human-readable report.
    #[must_use]
    pub fn to_text(&self) -> String {
        let elapsed = (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default();
        // Trim to milliseconds.
        let elapsed = std::time::Duration::from_millis(
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        );

        let mut out = format!(
            "Build finished in {}: {} of {} volumes succeeded, {} warnings\n",
            humantime::format_duration(elapsed),
            self.succeeded(),
            self.volumes.len(),
            self.warnings
        );

        let width = self.volumes.iter().map(|v| v.name.len()).max().unwrap_or(0);
        for volume in &self.volumes {
            let detail = match &volume.status {
                VolumeStatus::Built { artifacts } => artifacts
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                VolumeStatus::Prepared { document } => document.display().to_string(),
                VolumeStatus::Skipped { reason } | VolumeStatus::ExportFailed { reason } => {
                    reason.clone()
                }
            };
            let _ = writeln!(
                out,
                "  {:<width$}  {:<13}  {detail}",
                volume.name,
                volume.status.label()
            );
        }

        out
    }

    /// Renders the summary as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
