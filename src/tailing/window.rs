use std::collections::{HashMap, VecDeque};

use crate::connection_log::ConnectionRecord;

/// Statistics accumulated over one reporting interval.
///
/// Exactly one window is live per session. It is replaced by a fresh one,
/// anchored at the timestamp that triggered the flush, right after each report.
#[derive(Debug, Clone, Default)]
pub struct AggregationWindow {
    interval_start: Option<i64>,
    interval_end: Option<i64>,
    /// Connection counts per client, in first-seen order.
    per_client_count: Vec<(String, u64)>,
    client_index: HashMap<String, usize>,
    /// Clients that connected to the target host, most recent first.
    toward_host: VecDeque<String>,
    /// Hosts the target host connected to, most recent first.
    from_host: VecDeque<String>,
}

/// Read-only copy of a window's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub interval_start: Option<i64>,
    pub interval_end: Option<i64>,
    pub per_client_count: Vec<(String, u64)>,
    pub toward_host: Vec<String>,
    pub from_host: Vec<String>,
}

impl AggregationWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty window whose interval begins at `timestamp`.
    pub fn starting_at(timestamp: Option<i64>) -> Self {
        Self {
            interval_start: timestamp,
            interval_end: timestamp,
            ..Self::default()
        }
    }

    /// Folds one record into the window.
    ///
    /// The per-client count is updated for every record, whether or not the
    /// target host is involved.
    pub fn record(&mut self, record: &ConnectionRecord, target_host: &str) {
        if record.host == target_host {
            self.toward_host.push_front(record.client.clone());
        }
        if record.client == target_host {
            self.from_host.push_front(record.host.clone());
        }

        match self.client_index.get(&record.client) {
            Some(&i) => self.per_client_count[i].1 += 1,
            None => {
                self.client_index
                    .insert(record.client.clone(), self.per_client_count.len());
                self.per_client_count.push((record.client.clone(), 1));
            }
        }

        if self.interval_start.is_none() {
            self.interval_start = Some(record.timestamp);
        }
        self.interval_end = Some(record.timestamp);
    }

    pub fn interval_start(&self) -> Option<i64> {
        self.interval_start
    }

    pub fn interval_end(&self) -> Option<i64> {
        self.interval_end
    }

    /// Log time covered so far: latest timestamp minus the interval start.
    pub fn elapsed_ms(&self) -> i64 {
        match (self.interval_start, self.interval_end) {
            (Some(start), Some(end)) => end.saturating_sub(start),
            _ => 0,
        }
    }

    pub fn exceeds(&self, interval_ms: i64) -> bool {
        self.elapsed_ms() > interval_ms
    }

    /// Client with the most connections. Ties go to the client seen first.
    pub fn top_client(&self) -> Option<(&str, u64)> {
        let mut top: Option<(&str, u64)> = None;
        for (client, count) in &self.per_client_count {
            match top {
                Some((_, best)) if *count <= best => {}
                _ => top = Some((client.as_str(), *count)),
            }
        }
        top
    }

    pub fn count_for(&self, client: &str) -> u64 {
        self.client_index
            .get(client)
            .map(|&i| self.per_client_count[i].1)
            .unwrap_or(0)
    }

    pub fn toward_host(&self) -> impl Iterator<Item = &str> {
        self.toward_host.iter().map(String::as_str)
    }

    pub fn from_host(&self) -> impl Iterator<Item = &str> {
        self.from_host.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.per_client_count.is_empty()
    }

    /// Number of distinct clients seen in this window.
    pub fn client_count(&self) -> usize {
        self.per_client_count.len()
    }

    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            interval_start: self.interval_start,
            interval_end: self.interval_end,
            per_client_count: self.per_client_count.clone(),
            toward_host: self.toward_host.iter().cloned().collect(),
            from_host: self.from_host.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(ts: i64, client: &str, host: &str) -> ConnectionRecord {
        ConnectionRecord::new(ts, client, host)
    }

    #[test]
    fn first_record_sets_interval_start() {
        let mut window = AggregationWindow::new();
        assert_eq!(window.interval_start(), None);
        window.record(&rec(1000, "a", "b"), "h");
        window.record(&rec(1700, "c", "d"), "h");
        assert_eq!(window.interval_start(), Some(1000));
        assert_eq!(window.interval_end(), Some(1700));
        assert_eq!(window.elapsed_ms(), 700);
        assert!(window.exceeds(699));
        assert!(!window.exceeds(700));
    }

    #[test]
    fn lists_are_most_recent_first() {
        let mut window = AggregationWindow::new();
        window.record(&rec(1, "alice", "target"), "target");
        window.record(&rec(2, "target", "db1"), "target");
        window.record(&rec(3, "bob", "target"), "target");
        window.record(&rec(4, "target", "db2"), "target");

        assert_eq!(window.toward_host().collect::<Vec<_>>(), vec!["bob", "alice"]);
        assert_eq!(window.from_host().collect::<Vec<_>>(), vec!["db2", "db1"]);
    }

    #[test]
    fn counts_every_client_regardless_of_host() {
        let mut window = AggregationWindow::new();
        window.record(&rec(1, "alice", "x"), "target");
        window.record(&rec(2, "alice", "y"), "target");
        window.record(&rec(3, "bob", "target"), "target");

        assert_eq!(window.count_for("alice"), 2);
        assert_eq!(window.count_for("bob"), 1);
        assert_eq!(window.count_for("carol"), 0);
        assert_eq!(window.top_client(), Some(("alice", 2)));
    }

    #[test]
    fn tie_goes_to_first_seen_client() {
        let mut window = AggregationWindow::new();
        window.record(&rec(1, "zed", "x"), "h");
        window.record(&rec(2, "amy", "x"), "h");
        window.record(&rec(3, "amy", "x"), "h");
        window.record(&rec(4, "zed", "x"), "h");
        assert_eq!(window.top_client(), Some(("zed", 2)));
    }

    #[test]
    fn fresh_window_is_empty_and_anchored() {
        let window = AggregationWindow::starting_at(Some(42));
        assert!(window.is_empty());
        assert_eq!(window.top_client(), None);
        assert_eq!(window.interval_start(), Some(42));
        assert_eq!(window.elapsed_ms(), 0);
        assert_eq!(window.snapshot().toward_host, Vec::<String>::new());
    }
}
