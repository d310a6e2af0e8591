pub mod configuration;
pub mod connection_log;
pub mod error_handling;
pub mod simulator;
pub mod tailing;

pub use connection_log::ConnectionRecord;
pub use tailing::{SessionHandle, TailSession};
