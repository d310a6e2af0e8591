use conntail::configuration::{Config, RunMode};
use conntail::connection_log::BatchScanner;
use conntail::error_handling::types::ConfigError;
use conntail::tailing::{ConsoleSink, TailSession};
use log::{error, info};
use std::sync::Arc;

fn exit_with_usage(err: &ConfigError) -> ! {
    error!("{}", err);
    eprintln!("{}", Config::usage());
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let mode = Config::from_args()
        .resolve()
        .unwrap_or_else(|e| exit_with_usage(&e));

    match mode {
        RunMode::Query { file, window } => {
            let scanner = BatchScanner::new(&file, window);
            let result = tokio::task::spawn_blocking(move || {
                let stdout = std::io::stdout();
                scanner.write_connected_clients(stdout.lock())
            })
            .await;

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("Query over {} failed: {}", file.display(), e);
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("Error joining the query task: {:?}", e);
                    std::process::exit(1);
                }
            }
        }
        RunMode::Follow {
            file,
            host,
            settings,
        } => {
            let session = TailSession::new(&file, host, settings, Arc::new(ConsoleSink));
            let handle = session.start();

            let cancel = handle.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, stopping after the current poll");
                    cancel.cancel();
                }
            });

            if let Err(e) = handle.wait().await {
                error!("Follow session on {} ended with an error: {}", file.display(), e);
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_lists_both_forms() {
        let usage = Config::usage();
        assert!(usage.contains("-f <HOST_NAME>"));
        assert!(usage.contains("<START_TIME> <END_TIME> <HOST_NAME>"));
    }
}
