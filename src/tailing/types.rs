//! State and outcome types of the poll driver.

use std::fmt;

use uuid::Uuid;

use super::chunk_reader::ChunkOutcome;
use super::reporter::WindowReport;
use super::window::WindowSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The file did not grow for the whole idle-retry budget.
    IdleTimeout,
    /// A caller asked the session to terminate.
    Terminated,
    /// A read, parse or report error aborted the session.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopped(StopReason),
}

impl SessionState {
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Running => write!(f, "running"),
            SessionState::Stopped(StopReason::IdleTimeout) => write!(f, "stopped (idle)"),
            SessionState::Stopped(StopReason::Terminated) => write!(f, "stopped (terminated)"),
            SessionState::Stopped(StopReason::Failed) => write!(f, "stopped (failed)"),
        }
    }
}

/// What the length check of a tick found and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollActivity {
    /// The file shrank; the cursor jumped to the new length.
    Truncated { from: u64, to: u64 },
    /// New complete lines were consumed.
    Read(ChunkOutcome),
    /// The file grew but its last line has no newline yet. `pending` is the
    /// number of bytes past the cursor.
    PartialLine { pending: u64 },
    /// Nothing new. `retries_left` is the remaining idle budget.
    Idle { retries_left: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickOutcome {
    pub flushed: Option<WindowReport>,
    pub activity: PollActivity,
    pub state: SessionState,
}

/// Counters published after every tick. Holds no window contents, so it
/// stays cheap to copy however large the window grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub session_id: Uuid,
    pub state: SessionState,
    pub cursor: u64,
    pub idle_retries_left: u32,
    pub records_read: u64,
    pub reports_emitted: u64,
    pub interval_start: Option<i64>,
    pub clients_seen: usize,
}

/// Full point-in-time view of a session, window contents included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub state: SessionState,
    pub cursor: u64,
    pub idle_retries_left: u32,
    pub reports_emitted: u64,
    pub window: WindowSnapshot,
}

/// Final accounting returned when a session stops cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub reason: StopReason,
    pub cursor: u64,
    pub records_read: u64,
    pub reports_emitted: u64,
    pub truncations: u64,
}
