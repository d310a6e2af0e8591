use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_INTERVAL_MS: u64 = 60 * 60 * 1000;
pub const DEFAULT_POLL_SLEEP_MS: u64 = 2000;
pub const DEFAULT_MAX_IDLE_RETRIES: u32 = 5;

/// Inclusive time window and target host of a bounded query.
#[derive(Debug, PartialEq, Clone)]
pub struct QueryWindow {
    pub start: i64,
    pub end: i64,
    pub host: String,
}

impl QueryWindow {
    pub fn new(start: i64, end: i64, host: impl Into<String>) -> Self {
        Self {
            start,
            end,
            host: host.into(),
        }
    }
}

/// Timing parameters of a tailing session.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct TailSettings {
    /// Length of one aggregation window, measured in log time.
    pub interval: Duration,
    /// Unconditional suspension between two polls of the file.
    pub poll_sleep: Duration,
    /// Consecutive polls without growth tolerated before the session stops.
    pub max_idle_retries: u32,
}

impl TailSettings {
    pub fn interval_ms(&self) -> i64 {
        i64::try_from(self.interval.as_millis()).unwrap_or(i64::MAX)
    }
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            poll_sleep: Duration::from_millis(DEFAULT_POLL_SLEEP_MS),
            max_idle_retries: DEFAULT_MAX_IDLE_RETRIES,
        }
    }
}

/// `[tail]` table of the optional TOML tuning file.
#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TailFileConfig {
    pub interval_ms: Option<u64>,
    pub poll_ms: Option<u64>,
    pub max_idle_retries: Option<u32>,
}

#[derive(Debug, PartialEq, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub tail: TailFileConfig,
}

/// What the binary was asked to do.
#[derive(Debug, PartialEq, Clone)]
pub enum RunMode {
    Query {
        file: PathBuf,
        window: QueryWindow,
    },
    Follow {
        file: PathBuf,
        host: String,
        settings: TailSettings,
    },
}
