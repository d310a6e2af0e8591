use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingFile(String),
    InvalidArguments(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingFile(e) => write!(f, "{}: no such file", e),
            ConfigError::InvalidArguments(e) => write!(f, "Invalid arguments: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// A log line that could not be decoded into a `ConnectionRecord`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    MissingField(String),
    TooManyFields(String),
    InvalidTimestamp(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingField(line) => {
                write!(f, "expected 3 fields, found fewer in {:?}", line)
            }
            ParseError::TooManyFields(line) => {
                write!(f, "expected 3 fields, found more in {:?}", line)
            }
            ParseError::InvalidTimestamp(line) => {
                write!(f, "timestamp is not an integer in {:?}", line)
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
pub enum ReportError {
    WriteFailed(std::io::Error),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::WriteFailed(e) => write!(f, "Report write failed: {}", e),
        }
    }
}

impl std::error::Error for ReportError {}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::WriteFailed(err)
    }
}

/// Conditions that end a tailing session abnormally.
///
/// Truncation is not represented here: it resets the cursor and the session
/// carries on.
#[derive(Debug)]
pub enum TailError {
    Io(std::io::Error),
    Parse { offset: u64, source: ParseError },
    Report(ReportError),
}

impl fmt::Display for TailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TailError::Io(e) => write!(f, "Tail IO error: {}", e),
            TailError::Parse { offset, source } => {
                write!(f, "Tail parse error at byte {}: {}", offset, source)
            }
            TailError::Report(e) => write!(f, "Tail report error: {}", e),
        }
    }
}

impl std::error::Error for TailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TailError::Io(e) => Some(e),
            TailError::Parse { source, .. } => Some(source),
            TailError::Report(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for TailError {
    fn from(err: std::io::Error) -> Self {
        TailError::Io(err)
    }
}

impl From<ReportError> for TailError {
    fn from(err: ReportError) -> Self {
        TailError::Report(err)
    }
}

#[derive(Debug)]
pub enum QueryError {
    Io(std::io::Error),
    Parse(ParseError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Io(e) => write!(f, "Query IO error: {}", e),
            QueryError::Parse(e) => write!(f, "Query parse error: {}", e),
        }
    }
}

impl std::error::Error for QueryError {}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::Io(err)
    }
}

impl From<ParseError> for QueryError {
    fn from(err: ParseError) -> Self {
        QueryError::Parse(err)
    }
}

#[derive(Debug)]
pub enum SimulatorError {
    IoError(std::io::Error),
    NotEnoughNames(usize),
    NotInRange(String),
}

impl fmt::Display for SimulatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulatorError::IoError(e) => write!(f, "Simulator IO error: {}", e),
            SimulatorError::NotEnoughNames(n) => {
                write!(f, "Need at least 2 distinct names, found {}", n)
            }
            SimulatorError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for SimulatorError {}

impl From<std::io::Error> for SimulatorError {
    fn from(err: std::io::Error) -> Self {
        SimulatorError::IoError(err)
    }
}
