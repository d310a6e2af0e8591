use super::types::*;
use crate::error_handling::types::ConfigError;
use clap::{CommandFactory, Parser};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const USAGE: &str = "conntail <FILE> -f <HOST_NAME>
       conntail <FILE> <START_TIME> <END_TIME> <HOST_NAME>";

/// Command-line surface of `conntail`.
///
/// Two invocations are accepted:
/// - `conntail <FILE> <START_TIME> <END_TIME> <HOST_NAME>` runs a bounded query and prints the
/// clients that connected to `HOST_NAME` between the two millisecond timestamps.
/// - `conntail <FILE> -f <HOST_NAME>` follows the growing file and prints a report for every
/// elapsed interval.
///
/// The tuning flags only affect follow mode. Each of them may also come from the environment or
/// from the `[tail]` table of a TOML file given with `--config`; command line and environment win
/// over the file, the file wins over the built-in defaults.
///
/// # Examples
///
/// ```
/// use conntail::configuration::{Config, RunMode};
///
/// let config = Config::try_from_iter(["conntail", "Cargo.toml", "-f", "Rehgan"]).unwrap();
/// match config.resolve().unwrap() {
///     RunMode::Follow { host, .. } => assert_eq!(host, "Rehgan"),
///     RunMode::Query { .. } => unreachable!(),
/// }
/// ```
#[derive(Parser, Debug, Clone)]
#[command(name = "conntail")]
#[command(version)]
#[command(about = "Reports which clients connected to a host, from a closed or growing log")]
#[command(override_usage = USAGE)]
pub struct Config {
    /// Connection log, one `<timestamp_ms> <client> <host>` record per line
    pub file: PathBuf,

    /// Follow the file and report on connections involving this host
    #[arg(
        short = 'f',
        long = "follow",
        value_name = "HOST_NAME",
        conflicts_with_all = ["start_time", "end_time", "host_name"]
    )]
    pub follow: Option<String>,

    /// Inclusive lower bound of the query window, in milliseconds
    #[arg(allow_negative_numbers = true)]
    pub start_time: Option<i64>,

    /// Inclusive upper bound of the query window, in milliseconds
    #[arg(allow_negative_numbers = true)]
    pub end_time: Option<i64>,

    /// Host whose inbound connections are listed
    pub host_name: Option<String>,

    /// Length of one report interval, in milliseconds of log time
    #[arg(long, env = "CONNTAIL_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Sleep between two polls of the file, in milliseconds
    #[arg(long, env = "CONNTAIL_POLL_MS")]
    pub poll_ms: Option<u64>,

    /// Number of polls without growth after which following stops
    #[arg(long, env = "CONNTAIL_MAX_IDLE_RETRIES")]
    pub max_idle_retries: Option<u32>,

    /// TOML file providing a `[tail]` table with the same three settings
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Parses the process arguments, exiting with the usage text on failure.
    pub fn from_args() -> Self {
        Config::parse()
    }

    pub fn try_from_iter<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Config::try_parse_from(args)
    }

    pub fn usage() -> String {
        Config::command().render_usage().to_string()
    }

    /// Validates the parsed arguments and turns them into a [`RunMode`].
    ///
    /// Fails with [`ConfigError::MissingFile`] when the log does not exist and with
    /// [`ConfigError::InvalidArguments`] when neither invocation form is complete.
    pub fn resolve(self) -> Result<RunMode, ConfigError> {
        if !self.file.exists() {
            return Err(ConfigError::MissingFile(self.file.display().to_string()));
        }

        if let Some(host) = self.follow.clone() {
            let settings = self.tail_settings()?;
            return Ok(RunMode::Follow {
                file: self.file,
                host,
                settings,
            });
        }

        match (self.start_time, self.end_time, self.host_name) {
            (Some(start), Some(end), Some(host)) => Ok(RunMode::Query {
                file: self.file,
                window: QueryWindow::new(start, end, host),
            }),
            _ => Err(ConfigError::InvalidArguments(String::from(
                "expected either -f <HOST_NAME> or <START_TIME> <END_TIME> <HOST_NAME>",
            ))),
        }
    }

    fn tail_settings(&self) -> Result<TailSettings, ConfigError> {
        let file = match &self.config {
            Some(path) => Self::from_file(path)?.tail,
            None => TailFileConfig::default(),
        };
        let defaults = TailSettings::default();

        let interval_ms = self.interval_ms.or(file.interval_ms);
        let poll_ms = self.poll_ms.or(file.poll_ms);
        let max_idle_retries = self
            .max_idle_retries
            .or(file.max_idle_retries)
            .unwrap_or(defaults.max_idle_retries);

        if interval_ms == Some(0) {
            return Err(ConfigError::NotInRange(String::from(
                "interval must be at least 1 ms",
            )));
        }
        if max_idle_retries == 0 {
            return Err(ConfigError::NotInRange(String::from(
                "max idle retries must be at least 1",
            )));
        }

        Ok(TailSettings {
            interval: interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.interval),
            poll_sleep: poll_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_sleep),
            max_idle_retries,
        })
    }

    /// Loads the TOML tuning file.
    pub fn from_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ConfigError::TomlError(e.to_string()))
    }
}
