//! Renders and emits a window's statistics, then resets the window.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat};
use log::info;
use uuid::Uuid;

use super::window::AggregationWindow;
use crate::error_handling::types::ReportError;

/// Snapshot of one flushed interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowReport {
    pub target_host: String,
    pub interval_start: Option<i64>,
    pub interval_end: Option<i64>,
    pub top_client: Option<(String, u64)>,
    /// Most recent first.
    pub toward_host: Vec<String>,
    /// Most recent first.
    pub from_host: Vec<String>,
}

impl WindowReport {
    pub fn from_window(window: &AggregationWindow, target_host: &str) -> Self {
        Self {
            target_host: target_host.to_string(),
            interval_start: window.interval_start(),
            interval_end: window.interval_end(),
            top_client: window
                .top_client()
                .map(|(client, count)| (client.to_string(), count)),
            toward_host: window.toward_host().map(str::to_string).collect(),
            from_host: window.from_host().map(str::to_string).collect(),
        }
    }
}

fn fmt_timestamp(f: &mut fmt::Formatter<'_>, ts: Option<i64>) -> fmt::Result {
    match ts {
        Some(ms) => match DateTime::from_timestamp_millis(ms) {
            Some(utc) => write!(
                f,
                "{} ({})",
                ms,
                utc.to_rfc3339_opts(SecondsFormat::Millis, true)
            ),
            None => write!(f, "{}", ms),
        },
        None => write!(f, "-"),
    }
}

impl fmt::Display for WindowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Results for hour ")?;
        fmt_timestamp(f, self.interval_start)?;
        write!(f, " to ")?;
        fmt_timestamp(f, self.interval_end)?;
        writeln!(f, ":")?;

        match &self.top_client {
            Some((client, count)) => {
                writeln!(f, "\tMost connections generated by: {}({})", client, count)?
            }
            None => writeln!(f, "\tMost connections generated by: none(0)")?,
        }

        writeln!(f, "\tClients who connected to: {}:", self.target_host)?;
        for client in &self.toward_host {
            writeln!(f, "\t\t- {}", client)?;
        }
        writeln!(f, "\tHosts who {} connected to:", self.target_host)?;
        for host in &self.from_host {
            writeln!(f, "\t\t- {}", host)?;
        }
        writeln!(f)
    }
}

/// Destination of flushed reports.
pub trait ReportSink: Send + Sync {
    fn emit(&self, report: &WindowReport) -> Result<(), ReportError>;
}

/// Writes reports to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleSink;

impl ReportSink for ConsoleSink {
    fn emit(&self, report: &WindowReport) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write!(out, "{}", report)?;
        out.flush()?;
        Ok(())
    }
}

pub struct Reporter {
    session_id: Uuid,
    target_host: String,
    sink: Arc<dyn ReportSink>,
}

impl Reporter {
    pub fn new(session_id: Uuid, target_host: impl Into<String>, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            session_id,
            target_host: target_host.into(),
            sink,
        }
    }

    /// Emits the window's report, then replaces the window with an empty one
    /// starting at the timestamp that triggered the flush.
    ///
    /// The window is left untouched if the sink fails.
    pub fn flush(&self, window: &mut AggregationWindow) -> Result<WindowReport, ReportError> {
        let report = WindowReport::from_window(window, &self.target_host);
        self.sink.emit(&report)?;

        info!(
            "[{}] flushed window {:?}..{:?}: {} inbound, {} outbound",
            self.session_id,
            report.interval_start,
            report.interval_end,
            report.toward_host.len(),
            report.from_host.len()
        );

        *window = AggregationWindow::starting_at(window.interval_end());
        Ok(report)
    }
}

/// Keeps every emitted report in memory.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct MemorySink {
    pub(crate) reports: std::sync::Mutex<Vec<WindowReport>>,
}

#[cfg(test)]
impl ReportSink for MemorySink {
    fn emit(&self, report: &WindowReport) -> Result<(), ReportError> {
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_log::ConnectionRecord;

    struct FailingSink;

    impl ReportSink for FailingSink {
        fn emit(&self, _report: &WindowReport) -> Result<(), ReportError> {
            Err(ReportError::WriteFailed(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "closed",
            )))
        }
    }

    fn filled_window() -> AggregationWindow {
        let mut window = AggregationWindow::new();
        window.record(&ConnectionRecord::new(1000, "alice", "Rehgan"), "Rehgan");
        window.record(&ConnectionRecord::new(1500, "Rehgan", "db"), "Rehgan");
        window.record(&ConnectionRecord::new(2000, "bob", "Rehgan"), "Rehgan");
        window.record(&ConnectionRecord::new(2500, "bob", "other"), "Rehgan");
        window
    }

    #[test]
    fn flush_emits_and_resets() {
        let sink = Arc::new(MemorySink::default());
        let reporter = Reporter::new(Uuid::new_v4(), "Rehgan", sink.clone());
        let mut window = filled_window();

        let report = reporter.flush(&mut window).unwrap();

        assert_eq!(report.interval_start, Some(1000));
        assert_eq!(report.interval_end, Some(2500));
        assert_eq!(report.top_client, Some(("bob".to_string(), 2)));
        assert_eq!(report.toward_host, vec!["bob", "alice"]);
        assert_eq!(report.from_host, vec!["db"]);
        assert_eq!(sink.reports.lock().unwrap().as_slice(), &[report]);

        assert!(window.is_empty());
        assert_eq!(window.toward_host().count(), 0);
        assert_eq!(window.from_host().count(), 0);
        assert_eq!(window.interval_start(), Some(2500));
    }

    #[test]
    fn failed_emit_keeps_window() {
        let reporter = Reporter::new(Uuid::new_v4(), "Rehgan", Arc::new(FailingSink));
        let mut window = filled_window();
        assert!(reporter.flush(&mut window).is_err());
        assert_eq!(window.count_for("bob"), 2);
    }

    #[test]
    fn renders_report_block() {
        let report = WindowReport {
            target_host: "Rehgan".to_string(),
            interval_start: Some(0),
            interval_end: Some(3_600_000),
            top_client: Some(("alice".to_string(), 3)),
            toward_host: vec!["bob".to_string(), "alice".to_string()],
            from_host: vec!["db".to_string()],
        };
        let expected = "Results for hour 0 (1970-01-01T00:00:00.000Z) to 3600000 (1970-01-01T01:00:00.000Z):\n\
                        \tMost connections generated by: alice(3)\n\
                        \tClients who connected to: Rehgan:\n\
                        \t\t- bob\n\
                        \t\t- alice\n\
                        \tHosts who Rehgan connected to:\n\
                        \t\t- db\n\
                        \n";
        assert_eq!(report.to_string(), expected);
    }

    #[test]
    fn renders_empty_window() {
        let report = WindowReport::from_window(&AggregationWindow::new(), "h");
        let text = report.to_string();
        assert!(text.starts_with("Results for hour - to -:\n"));
        assert!(text.contains("Most connections generated by: none(0)"));
    }
}
