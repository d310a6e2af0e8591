use std::fmt;
use std::str::FromStr;

use crate::error_handling::types::ParseError;

/// One decoded line of the connection log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRecord {
    /// Milliseconds since the Unix epoch, as written by the producer.
    pub timestamp: i64,
    pub client: String,
    pub host: String,
}

impl ConnectionRecord {
    pub fn new(timestamp: i64, client: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            timestamp,
            client: client.into(),
            host: host.into(),
        }
    }
}

/// Decodes a single log line. A trailing `\n` or `\r\n` is ignored.
pub fn parse_line(line: &str) -> Result<ConnectionRecord, ParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut tokens = line.split(' ');

    let (Some(ts), Some(client), Some(host)) = (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(ParseError::MissingField(line.to_string()));
    };
    if tokens.next().is_some() {
        return Err(ParseError::TooManyFields(line.to_string()));
    }

    let timestamp = ts
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidTimestamp(line.to_string()))?;

    Ok(ConnectionRecord::new(timestamp, client, host))
}

impl FromStr for ConnectionRecord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s)
    }
}

impl fmt::Display for ConnectionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp, self.client, self.host)
    }
}
