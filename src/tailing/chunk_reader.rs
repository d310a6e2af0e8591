use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use log::{debug, trace};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use uuid::Uuid;

use super::window::AggregationWindow;
use crate::connection_log::record::parse_line;
use crate::error_handling::types::TailError;

/// Result of one incremental read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkOutcome {
    /// Offset just past the last complete line consumed.
    pub cursor: u64,
    pub records: usize,
    /// Reading stopped because the window outgrew the interval.
    pub boundary_crossed: bool,
}

/// Reads the records appended since a given offset.
pub struct ChunkReader {
    session_id: Uuid,
    path: PathBuf,
    target_host: String,
    interval_ms: i64,
}

impl ChunkReader {
    pub fn new<P: AsRef<Path>>(
        session_id: Uuid,
        path: P,
        target_host: impl Into<String>,
        interval_ms: i64,
    ) -> Self {
        Self {
            session_id,
            path: path.as_ref().to_path_buf(),
            target_host: target_host.into(),
            interval_ms,
        }
    }

    /// Reads complete lines starting at `from` and folds each record into
    /// `window`.
    ///
    /// Stops at end of file, at a trailing line that has no newline yet, or
    /// right after the record that pushes the window past the interval. That
    /// record is aggregated before the read stops.
    ///
    /// Errors
    /// - [`TailError::Io`] if the file cannot be opened or read.
    /// - [`TailError::Parse`] with the line's offset if a line is malformed.
    pub async fn read_chunk(
        &self,
        from: u64,
        window: &mut AggregationWindow,
    ) -> Result<ChunkOutcome, TailError> {
        let mut file = File::open(&self.path).await?;
        file.seek(SeekFrom::Start(from)).await?;
        let mut reader = BufReader::new(file);

        let mut outcome = ChunkOutcome {
            cursor: from,
            records: 0,
            boundary_crossed: false,
        };
        let mut line = String::new();

        loop {
            line.clear();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                break;
            }
            if !line.ends_with('\n') {
                trace!(
                    "[{}] partial line of {} bytes at {}, waiting for the rest",
                    self.session_id,
                    n,
                    outcome.cursor
                );
                break;
            }

            let record = parse_line(&line).map_err(|source| TailError::Parse {
                offset: outcome.cursor,
                source,
            })?;
            trace!("[{}] record {}", self.session_id, record);

            window.record(&record, &self.target_host);
            outcome.cursor += n as u64;
            outcome.records += 1;

            if window.exceeds(self.interval_ms) {
                outcome.boundary_crossed = true;
                break;
            }
        }

        debug!(
            "[{}] read {} records, cursor {} -> {}{}",
            self.session_id,
            outcome.records,
            from,
            outcome.cursor,
            if outcome.boundary_crossed {
                " (interval boundary)"
            } else {
                ""
            }
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::types::ParseError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn log_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn reads_from_offset_to_end() {
        let first = "100 a h\n";
        let file = log_file(&format!("{}200 b h\n300 h c\n", first));
        let reader = ChunkReader::new(Uuid::new_v4(), file.path(), "h", 10_000);
        let mut window = AggregationWindow::new();

        let outcome = reader
            .read_chunk(first.len() as u64, &mut window)
            .await
            .unwrap();

        assert_eq!(outcome.records, 2);
        assert!(!outcome.boundary_crossed);
        assert_eq!(outcome.cursor, file.as_file().metadata().unwrap().len());
        assert_eq!(window.count_for("a"), 0);
        assert_eq!(window.toward_host().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(window.from_host().collect::<Vec<_>>(), vec!["c"]);
    }

    #[tokio::test]
    async fn boundary_record_is_aggregated_then_read_stops() {
        let file = log_file("0 a h\n500 b h\n1001 c h\n1100 d h\n");
        let reader = ChunkReader::new(Uuid::new_v4(), file.path(), "h", 1000);
        let mut window = AggregationWindow::new();

        let outcome = reader.read_chunk(0, &mut window).await.unwrap();

        assert!(outcome.boundary_crossed);
        assert_eq!(outcome.records, 3);
        assert_eq!(outcome.cursor, "0 a h\n500 b h\n1001 c h\n".len() as u64);
        assert_eq!(window.count_for("c"), 1);
        assert_eq!(window.count_for("d"), 0);
    }

    #[tokio::test]
    async fn leaves_partial_line_unconsumed() {
        let file = log_file("10 a h\n20 b");
        let reader = ChunkReader::new(Uuid::new_v4(), file.path(), "h", 1000);
        let mut window = AggregationWindow::new();

        let outcome = reader.read_chunk(0, &mut window).await.unwrap();

        assert_eq!(outcome.records, 1);
        assert_eq!(outcome.cursor, "10 a h\n".len() as u64);
    }

    #[tokio::test]
    async fn malformed_line_reports_its_offset() {
        let file = log_file("10 a h\nbad line\n");
        let reader = ChunkReader::new(Uuid::new_v4(), file.path(), "h", 1000);
        let mut window = AggregationWindow::new();

        match reader.read_chunk(0, &mut window).await {
            Err(TailError::Parse { offset, source }) => {
                assert_eq!(offset, 7);
                assert!(matches!(source, ParseError::MissingField(_)));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let reader = ChunkReader::new(Uuid::new_v4(), "/nonexistent/conn.log", "h", 1000);
        let mut window = AggregationWindow::new();
        assert!(matches!(
            reader.read_chunk(0, &mut window).await,
            Err(TailError::Io(_))
        ));
    }
}
