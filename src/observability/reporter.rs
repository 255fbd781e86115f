//! Reporting collaborator threaded through every pipeline stage.
//!
//! Stages never log directly; they hand messages to a [`Reporter`]. The
//! build summary counts warnings through a [`RecordingReporter`].

use std::sync::Mutex;

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReportLevel {
    /// Progress information.
    Info,
    /// Recoverable problem; the item was skipped or left unchanged.
    Warn,
    /// Failure of a whole item.
    Error,
}

/// Sink for stage progress and per-item problems.
pub trait Reporter: Send + Sync {
    /// Records a message at the given level.
    fn report(&self, level: ReportLevel, message: &str);

    /// Records progress information.
    fn info(&self, message: &str) {
        self.report(ReportLevel::Info, message);
    }

    /// Records a recoverable problem.
    fn warn(&self, message: &str) {
        self.report(ReportLevel::Warn, message);
    }

    /// Records a failed item.
    fn error(&self, message: &str) {
        self.report(ReportLevel::Error, message);
    }
}

/// Forwards reports to the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        match level {
            ReportLevel::Info => tracing::info!("{message}"),
            ReportLevel::Warn => tracing::warn!("{message}"),
            ReportLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// A message retained by a [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Severity.
    pub level: ReportLevel,
    /// Rendered message.
    pub message: String,
}

/// Retains every report and optionally forwards it to another reporter.
#[derive(Default)]
pub struct RecordingReporter {
    inner: Option<Box<dyn Reporter>>,
    reports: Mutex<Vec<Report>>,
}

impl std::fmt::Debug for RecordingReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingReporter")
            .field("forwarding", &self.inner.is_some())
            .field("reports", &self.reports().len())
            .finish()
    }
}

impl RecordingReporter {
    /// Creates a reporter that only records.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reporter that records and forwards to `inner`.
    #[must_use]
    pub fn forwarding(inner: impl Reporter + 'static) -> Self {
        Self {
            inner: Some(Box::new(inner)),
            reports: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of every report so far.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.reports
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Messages reported at the given level, in order.
    #[must_use]
    pub fn messages(&self, level: ReportLevel) -> Vec<String> {
        self.reports()
            .into_iter()
            .filter(|r| r.level == level)
            .map(|r| r.message)
            .collect()
    }

    /// Number of reports at `Warn` level or above.
    #[must_use]
    pub fn problem_count(&self) -> usize {
        self.reports()
            .iter()
            .filter(|r| r.level >= ReportLevel::Warn)
            .count()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, level: ReportLevel, message: &str) {
        if let Some(inner) = &self.inner {
            inner.report(level, message);
        }
        if let Ok(mut reports) = self.reports.lock() {
            reports.push(Report {
                level,
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_order() {
        let reporter = RecordingReporter::new();
        reporter.info("one");
        reporter.warn("two");
        reporter.error("three");

        let reports = reporter.reports();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].level, ReportLevel::Info);
        assert_eq!(reports[1].message, "two");
        assert_eq!(reporter.problem_count(), 2);
        assert_eq!(reporter.messages(ReportLevel::Warn), vec!["two".to_string()]);
    }

    #[test]
    fn forwards_to_inner() {
        let outer = RecordingReporter::forwarding(TracingReporter);
        outer.warn("forwarded");
        assert_eq!(outer.messages(ReportLevel::Warn), vec!["forwarded".to_string()]);
    }

    #[test]
    fn levels_are_ordered() {
        assert!(ReportLevel::Info < ReportLevel::Warn);
        assert!(ReportLevel::Warn < ReportLevel::Error);
    }
}
