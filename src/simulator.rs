//! Synthetic producer of connection logs, for manual testing of follow mode.
//!
//! Writes one `<ts> <client> <host>` line at a time with a random delay around
//! the configured rate. A small share of lines is back-dated by up to
//! [`GRACE_PERIOD_MS`] to mimic the out-of-order arrival the tailer tolerates.

use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::connection_log::batch_scanner::GRACE_PERIOD_MS;
use crate::connection_log::ConnectionRecord;
use crate::error_handling::types::SimulatorError;

pub const OUT_OF_ORDER_PERCENT: u32 = 5;
pub const MAX_WRITES_PER_HOUR: u64 = 1_000_000;

const MS_PER_HOUR: f64 = 3.6e6;

pub struct ConnectionSimulator<R: Rng = StdRng> {
    names: Vec<String>,
    delay_lo_ms: u64,
    delay_hi_ms: u64,
    rng: R,
}

impl ConnectionSimulator<StdRng> {
    /// Loads names from `path`, keeping the first whitespace-separated token
    /// of every non-empty line.
    pub fn from_names_file<P: AsRef<Path>>(
        path: P,
        writes_per_hour: u64,
        seed: Option<u64>,
    ) -> Result<Self, SimulatorError> {
        let content = std::fs::read_to_string(path)?;
        let names = content
            .lines()
            .filter_map(|line| line.split_whitespace().next())
            .map(str::to_string)
            .collect();
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::new(names, writes_per_hour, rng)
    }
}

impl<R: Rng> ConnectionSimulator<R> {
    pub fn new(mut names: Vec<String>, writes_per_hour: u64, rng: R) -> Result<Self, SimulatorError> {
        if writes_per_hour == 0 || writes_per_hour > MAX_WRITES_PER_HOUR {
            return Err(SimulatorError::NotInRange(format!(
                "writes per hour must be in 1..={}, got {}",
                MAX_WRITES_PER_HOUR, writes_per_hour
            )));
        }
        names.sort();
        names.dedup();
        if names.len() < 2 {
            return Err(SimulatorError::NotEnoughNames(names.len()));
        }

        let avg = (MS_PER_HOUR / writes_per_hour as f64) as u64;
        let half = avg / 2;
        Ok(Self {
            names,
            delay_lo_ms: avg - half,
            delay_hi_ms: avg + half,
            rng,
        })
    }

    /// Delay before the next write, uniform around the average.
    pub fn next_delay(&mut self) -> Duration {
        Duration::from_millis(self.rng.random_range(self.delay_lo_ms..=self.delay_hi_ms))
    }

    /// A record between two distinct names, possibly back-dated.
    pub fn next_record(&mut self, now_ms: i64) -> ConnectionRecord {
        let len = self.names.len();
        let i = self.rng.random_range(0..len);
        let mut j = self.rng.random_range(0..len - 1);
        if j >= i {
            j += 1;
        }

        let timestamp = if self.rng.random_range(0..100) < OUT_OF_ORDER_PERCENT {
            now_ms - self.rng.random_range(0..GRACE_PERIOD_MS)
        } else {
            now_ms
        };
        ConnectionRecord::new(timestamp, self.names[i].clone(), self.names[j].clone())
    }

    /// Writes records until cancelled or until `limit` lines were written.
    /// Returns the number of lines written.
    pub async fn run<W: AsyncWrite + Unpin>(
        &mut self,
        mut out: W,
        limit: Option<u64>,
        cancel: CancellationToken,
    ) -> Result<u64, SimulatorError> {
        let mut written = 0u64;
        while limit.map_or(true, |max| written < max) {
            let delay = self.next_delay();
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            let record = self.next_record(Utc::now().timestamp_millis());
            out.write_all(format!("{}\n", record).as_bytes()).await?;
            out.flush().await?;
            written += 1;
            debug!("wrote {}", record);
        }
        out.flush().await?;
        info!("simulator wrote {} records", written);
        Ok(written)
    }
}
