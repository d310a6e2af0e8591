//! Bounded historical query over a closed connection log.
//!
//! The scanner walks the file once, in file order, and collects every client
//! that connected to the target host inside `[start, end]`. Timestamps are
//! trusted to be monotonic up to [`GRACE_PERIOD_MS`]: the scan stops at the
//! first record more than that far past `end`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, trace};

use super::record::parse_line;
use crate::configuration::types::QueryWindow;
use crate::error_handling::types::QueryError;

/// How late a record may arrive and still be considered in order.
pub const GRACE_PERIOD_MS: i64 = 5 * 60 * 1000;

const INPUT_BUFFER_SIZE: usize = 4096 * 5;
const OUTPUT_BUFFER_SIZE: usize = INPUT_BUFFER_SIZE;

pub struct BatchScanner {
    path: PathBuf,
    window: QueryWindow,
}

impl BatchScanner {
    pub fn new<P: AsRef<Path>>(path: P, window: QueryWindow) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            window,
        }
    }

    /// Returns the matching client names in file order.
    pub fn connected_clients(&self) -> Result<Vec<String>, QueryError> {
        let mut clients = Vec::new();
        self.scan(|client| {
            clients.push(client.to_string());
            Ok(())
        })?;
        Ok(clients)
    }

    /// Writes each matching client followed by a single space, with no
    /// trailing newline.
    pub fn write_connected_clients<W: Write>(&self, out: W) -> Result<(), QueryError> {
        let mut writer = BufWriter::with_capacity(OUTPUT_BUFFER_SIZE, out);
        self.scan(|client| {
            writer.write_all(client.as_bytes())?;
            writer.write_all(b" ")?;
            Ok(())
        })?;
        writer.flush()?;
        Ok(())
    }

    fn scan<F>(&self, mut on_match: F) -> Result<(), QueryError>
    where
        F: FnMut(&str) -> Result<(), QueryError>,
    {
        let QueryWindow { start, end, host } = &self.window;
        let (start, end) = (*start, *end);
        let cutoff = end.saturating_add(GRACE_PERIOD_MS);

        let reader = BufReader::with_capacity(INPUT_BUFFER_SIZE, File::open(&self.path)?);
        let mut scanned = 0u64;
        for line in reader.lines() {
            let record = parse_line(&line?)?;
            scanned += 1;

            if record.timestamp >= start && record.timestamp <= end && record.host == *host {
                trace!("match {} at {}", record.client, record.timestamp);
                on_match(&record.client)?;
            }
            if record.timestamp > cutoff {
                debug!(
                    "stopping scan at {} (past {} + grace period)",
                    record.timestamp, end
                );
                break;
            }
        }
        debug!("scanned {} records from {}", scanned, self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    const START_TIME: i64 = 1565647204351;
    const END_TIME: i64 = 1565647246869;

    fn log_file(lines: &[&str]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn query(file: &NamedTempFile) -> String {
        let scanner = BatchScanner::new(
            file.path(),
            QueryWindow::new(START_TIME, END_TIME, "Rehgan"),
        );
        let mut out = Vec::new();
        scanner.write_connected_clients(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn empty_file_yields_empty_output() {
        let file = log_file(&[]);
        assert_eq!(query(&file), "");
    }

    #[test]
    fn emits_matches_in_file_order() {
        let file = log_file(&[
            "1565647200000 Alice Rehgan",
            "1565647204351 Tyreonna Rehgan",
            "1565647220000 Jadon Kolby",
            "1565647246869 Heera Rehgan",
            "1565647246870 Bob Rehgan",
        ]);
        assert_eq!(query(&file), "Tyreonna Heera ");
    }

    #[test]
    fn includes_late_record_inside_grace_period() {
        let file = log_file(&[
            "1565647210000 Tyreonna Rehgan",
            "1565647300000 Marc Kolby",
            "1565647230000 John Rehgan",
        ]);
        let out = query(&file);
        assert_eq!(out, "Tyreonna John ");
    }

    #[test]
    fn stops_after_grace_period_is_exceeded() {
        let file = log_file(&[
            "1565647210000 Tyreonna Rehgan",
            "1565647546870 Marc Kolby",
            "1565647230000 Ronald Rehgan",
        ]);
        let out = query(&file);
        assert_eq!(out, "Tyreonna ");
        assert!(!out.contains("Ronald"));
    }

    #[test]
    fn connected_clients_collects_names() {
        let file = log_file(&["1565647210000 Tyreonna Rehgan", "1565647220000 Heera Rehgan"]);
        let scanner =
            BatchScanner::new(file.path(), QueryWindow::new(START_TIME, END_TIME, "Rehgan"));
        assert_eq!(
            scanner.connected_clients().unwrap(),
            vec!["Tyreonna".to_string(), "Heera".to_string()]
        );
    }

    #[test]
    fn malformed_line_aborts_query() {
        let file = log_file(&["1565647210000 Tyreonna Rehgan", "garbage"]);
        let scanner =
            BatchScanner::new(file.path(), QueryWindow::new(START_TIME, END_TIME, "Rehgan"));
        assert!(matches!(
            scanner.connected_clients(),
            Err(QueryError::Parse(_))
        ));
    }
}
