//! Follow mode: tails a growing connection log and reports windowed statistics.
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌───────────────────┐   ┌──────────┐
//! │ TailSession │──▶│ ChunkReader │──▶│ AggregationWindow │──▶│ Reporter │──▶ ReportSink
//! │ (poll loop) │   │ (+ parser)  │   │                   │   │ (flush)  │
//! └─────────────┘   └─────────────┘   └───────────────────┘   └──────────┘
//! ```
//!
//! A [`TailSession`] owns every piece of mutable state (cursor, window, idle
//! budget) and runs on a single task. Callers interact with a running session
//! only through its [`SessionHandle`]: `terminate`, `status` and `wait`.
//!
//! Out-of-order records are tolerated only approximately. A record that
//! arrives after its interval was flushed is counted in the current window.

pub mod chunk_reader;
pub mod cursor;
pub mod poll_driver;
pub mod reporter;
pub mod types;
pub mod window;

pub use chunk_reader::{ChunkOutcome, ChunkReader};
pub use cursor::{Cursor, CursorMove};
pub use poll_driver::{SessionHandle, TailSession};
pub use reporter::{ConsoleSink, ReportSink, Reporter, WindowReport};
pub use types::{
    PollActivity, SessionSnapshot, SessionState, SessionStatus, SessionSummary, StopReason,
    TickOutcome,
};
pub use window::{AggregationWindow, WindowSnapshot};
