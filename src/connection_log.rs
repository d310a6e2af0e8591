//! The connection log format and the bounded historical query over it.
//!
//! Each line of the log is `<timestamp_ms> <client> <host>`, newline
//! terminated. Names cannot contain spaces.

pub mod batch_scanner;
pub mod record;

pub use batch_scanner::BatchScanner;
pub use record::ConnectionRecord;
