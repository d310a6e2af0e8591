//! Control loop of a tailing session.
//!
//! Each tick, in order:
//! 1. flush the window if it spans more than the interval,
//! 2. sleep for the poll duration (unconditionally),
//! 3. compare the file length with the cursor: reset on truncation, read on
//!    growth,
//! 4. refill the idle budget if the length changed since the last tick, spend
//!    one idle retry if it did not,
//! 5. stop if termination was requested.
//!
//! A trailing line without its newline is left for a later tick. It keeps the
//! session alive only while it keeps growing.
//!
//! Termination is cooperative. The cancellation token is only looked at once
//! the in-flight sleep and read have completed. When the session stops, the
//! window accumulated since the last flush is dropped without being reported.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, info, trace, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::chunk_reader::ChunkReader;
use super::cursor::{Cursor, CursorMove};
use super::reporter::{ReportSink, Reporter};
use super::types::*;
use super::window::AggregationWindow;
use crate::configuration::types::TailSettings;
use crate::error_handling::types::TailError;

/// All mutable state of one follow-mode invocation.
///
/// A session is owned by exactly one task; nothing in it is shared. Use
/// [`TailSession::start`] to spawn it and get a [`SessionHandle`].
pub struct TailSession {
    id: Uuid,
    path: PathBuf,
    target_host: String,
    settings: TailSettings,
    cursor: Cursor,
    last_len: u64,
    window: AggregationWindow,
    idle_retries_left: u32,
    state: SessionState,
    reader: ChunkReader,
    reporter: Reporter,
    cancel: CancellationToken,
    status: watch::Sender<SessionStatus>,
    records_read: u64,
    reports_emitted: u64,
    truncations: u64,
}

impl TailSession {
    pub fn new<P: AsRef<Path>>(
        path: P,
        target_host: impl Into<String>,
        settings: TailSettings,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let id = Uuid::new_v4();
        let path = path.as_ref().to_path_buf();
        let target_host = target_host.into();
        let window = AggregationWindow::new();

        let (status, _) = watch::channel(SessionStatus {
            session_id: id,
            state: SessionState::Running,
            cursor: 0,
            idle_retries_left: settings.max_idle_retries,
            records_read: 0,
            reports_emitted: 0,
            interval_start: None,
            clients_seen: 0,
        });

        debug!(
            "[{}] TailSession created for {} (host {})",
            id,
            path.display(),
            target_host
        );

        Self {
            id,
            reader: ChunkReader::new(id, &path, target_host.clone(), settings.interval_ms()),
            reporter: Reporter::new(id, target_host.clone(), sink),
            path,
            target_host,
            settings,
            cursor: Cursor::default(),
            last_len: 0,
            window,
            idle_retries_left: settings.max_idle_retries,
            state: SessionState::Running,
            cancel: CancellationToken::new(),
            status,
            records_read: 0,
            reports_emitted: 0,
            truncations: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target_host(&self) -> &str {
        &self.target_host
    }

    /// Token that asks the session to stop at its next safe point.
    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id,
            state: self.state,
            cursor: self.cursor.offset(),
            idle_retries_left: self.idle_retries_left,
            records_read: self.records_read,
            reports_emitted: self.reports_emitted,
            interval_start: self.window.interval_start(),
            clients_seen: self.window.client_count(),
        }
    }

    /// Copies the whole session state, window contents included.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            state: self.state,
            cursor: self.cursor.offset(),
            idle_retries_left: self.idle_retries_left,
            reports_emitted: self.reports_emitted,
            window: self.window.snapshot(),
        }
    }

    /// Runs one iteration of the poll loop.
    ///
    /// Calling `tick` on a stopped session does nothing and reports it idle.
    pub(crate) async fn tick(&mut self) -> Result<TickOutcome, TailError> {
        if !self.state.is_running() {
            return Ok(TickOutcome {
                flushed: None,
                activity: PollActivity::Idle {
                    retries_left: self.idle_retries_left,
                },
                state: self.state,
            });
        }

        let mut flushed = None;
        if self.window.exceeds(self.settings.interval_ms()) {
            flushed = Some(self.reporter.flush(&mut self.window)?);
            self.reports_emitted += 1;
        }

        tokio::time::sleep(self.settings.poll_sleep).await;

        let file_len = tokio::fs::metadata(&self.path).await?.len();
        let len_changed = file_len != self.last_len;
        self.last_len = file_len;
        let activity = match self.cursor.observe(file_len) {
            CursorMove::Truncated { from, to } => {
                warn!(
                    "[{}] {} shrank from {} to {} bytes; log was reset, continuing from the new end",
                    self.id,
                    self.path.display(),
                    from,
                    to
                );
                self.cursor.reset_to(to);
                self.truncations += 1;
                PollActivity::Truncated { from, to }
            }
            CursorMove::Grown { from, .. } => {
                let outcome = self.reader.read_chunk(from, &mut self.window).await?;
                if outcome.cursor > from {
                    self.cursor.advance_to(outcome.cursor);
                    self.records_read += outcome.records as u64;
                    self.idle_retries_left = self.settings.max_idle_retries;
                    PollActivity::Read(outcome)
                } else if len_changed {
                    self.idle_retries_left = self.settings.max_idle_retries;
                    trace!(
                        "[{}] waiting for the newline of a {} byte partial line",
                        self.id,
                        file_len - from
                    );
                    PollActivity::PartialLine {
                        pending: file_len - from,
                    }
                } else {
                    self.spend_idle_retry()
                }
            }
            CursorMove::Unchanged if len_changed => {
                self.idle_retries_left = self.settings.max_idle_retries;
                PollActivity::Idle {
                    retries_left: self.idle_retries_left,
                }
            }
            CursorMove::Unchanged => self.spend_idle_retry(),
        };

        if self.state.is_running() && self.cancel.is_cancelled() {
            info!("[{}] termination requested", self.id);
            self.state = SessionState::Stopped(StopReason::Terminated);
        }

        self.publish();
        Ok(TickOutcome {
            flushed,
            activity,
            state: self.state,
        })
    }

    fn spend_idle_retry(&mut self) -> PollActivity {
        self.idle_retries_left = self.idle_retries_left.saturating_sub(1);
        if self.idle_retries_left == 0 {
            info!(
                "[{}] no growth after {} polls, assuming the producer is done",
                self.id, self.settings.max_idle_retries
            );
            self.state = SessionState::Stopped(StopReason::IdleTimeout);
        }
        PollActivity::Idle {
            retries_left: self.idle_retries_left,
        }
    }

    fn publish(&self) {
        self.status.send_replace(self.status());
    }

    fn summary(&self, reason: StopReason) -> SessionSummary {
        SessionSummary {
            session_id: self.id,
            reason,
            cursor: self.cursor.offset(),
            records_read: self.records_read,
            reports_emitted: self.reports_emitted,
            truncations: self.truncations,
        }
    }

    /// Ticks until the session stops.
    ///
    /// Any error is fatal: it is logged, the session is marked failed and the
    /// pending window is discarded without a report.
    pub(crate) async fn run(mut self) -> Result<SessionSummary, TailError> {
        info!(
            "[{}] following {} for host {} (interval {:?}, poll {:?}, idle retries {})",
            self.id,
            self.path.display(),
            self.target_host,
            self.settings.interval,
            self.settings.poll_sleep,
            self.settings.max_idle_retries
        );

        loop {
            match self.tick().await {
                Ok(TickOutcome {
                    state: SessionState::Stopped(reason),
                    ..
                }) => {
                    let summary = self.summary(reason);
                    info!(
                        "[{}] {}: {} records read, {} reports, cursor at {}",
                        self.id,
                        self.state,
                        summary.records_read,
                        summary.reports_emitted,
                        summary.cursor
                    );
                    return Ok(summary);
                }
                Ok(_) => {}
                Err(e) => {
                    error!("[{}] fatal error, stopping session: {}", self.id, e);
                    self.state = SessionState::Stopped(StopReason::Failed);
                    self.publish();
                    return Err(e);
                }
            }
        }
    }

    /// Spawns the session on the current Tokio runtime.
    pub fn start(self) -> SessionHandle {
        let id = self.id;
        let cancel = self.cancellation_token();
        let status = self.subscribe();
        let task = tokio::spawn(self.run());
        SessionHandle {
            id,
            cancel,
            status,
            task,
        }
    }
}

/// Caller-side handle on a spawned [`TailSession`].
pub struct SessionHandle {
    id: Uuid,
    cancel: CancellationToken,
    status: watch::Receiver<SessionStatus>,
    task: JoinHandle<Result<SessionSummary, TailError>>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Requests a stop. The session finishes its current tick first.
    pub fn terminate(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Counters as of the last completed tick.
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the session to stop and returns its summary or fatal error.
    pub async fn wait(self) -> Result<SessionSummary, TailError> {
        self.task
            .await
            .map_err(|e| TailError::Io(io::Error::new(io::ErrorKind::Other, e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tailing::reporter::MemorySink;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn settings(max_idle_retries: u32) -> TailSettings {
        TailSettings {
            interval: Duration::from_millis(1000),
            poll_sleep: Duration::ZERO,
            max_idle_retries,
        }
    }

    #[tokio::test]
    async fn idle_budget_stops_session() {
        let file = NamedTempFile::new().unwrap();
        let mut session =
            TailSession::new(file.path(), "h", settings(3), Arc::new(MemorySink::default()));

        for expected in [2, 1] {
            let outcome = session.tick().await.unwrap();
            assert_eq!(outcome.activity, PollActivity::Idle { retries_left: expected });
            assert_eq!(outcome.state, SessionState::Running);
        }
        let outcome = session.tick().await.unwrap();
        assert_eq!(outcome.state, SessionState::Stopped(StopReason::IdleTimeout));
        assert_eq!(session.snapshot().idle_retries_left, 0);
    }

    #[tokio::test]
    async fn terminate_before_tick_stops_after_it() {
        let file = NamedTempFile::new().unwrap();
        let mut session =
            TailSession::new(file.path(), "h", settings(10), Arc::new(MemorySink::default()));
        session.terminate();

        let outcome = session.tick().await.unwrap();
        assert_eq!(outcome.state, SessionState::Stopped(StopReason::Terminated));

        let again = session.tick().await.unwrap();
        assert_eq!(again.state, SessionState::Stopped(StopReason::Terminated));
    }

    #[tokio::test]
    async fn subscribers_see_each_tick() {
        let file = NamedTempFile::new().unwrap();
        let mut session =
            TailSession::new(file.path(), "h", settings(4), Arc::new(MemorySink::default()));
        let rx = session.subscribe();

        session.tick().await.unwrap();
        assert_eq!(rx.borrow().idle_retries_left, 3);
        assert_eq!(rx.borrow().session_id, session.id());
        assert_eq!(*rx.borrow(), session.status());
    }

    #[tokio::test]
    async fn published_status_tracks_reads() {
        let mut file = NamedTempFile::new().unwrap();
        let mut session =
            TailSession::new(file.path(), "h", settings(4), Arc::new(MemorySink::default()));
        let rx = session.subscribe();

        writeln!(file, "10 a h").unwrap();
        writeln!(file, "20 b x").unwrap();
        file.flush().unwrap();
        session.tick().await.unwrap();

        let status = *rx.borrow();
        assert_eq!(status.records_read, 2);
        assert_eq!(status.clients_seen, 2);
        assert_eq!(status.interval_start, Some(10));
        assert_eq!(status.cursor, 14);
        assert_eq!(status.idle_retries_left, 4);
    }
}
