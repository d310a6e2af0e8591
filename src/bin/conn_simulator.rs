use clap::Parser;
use conntail::simulator::ConnectionSimulator;
use log::{error, info};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::BufWriter;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "conn-simulator")]
#[command(version)]
#[command(about = "Appends random connection records to a log, for trying out conntail -f")]
struct Args {
    /// Log file to append to (created if missing)
    output: PathBuf,
    /// File with one candidate name per line
    names_file: PathBuf,
    #[arg(long, default_value_t = 3600)]
    writes_per_hour: u64,
    /// Stop after this many records
    #[arg(long)]
    count: Option<u64>,
    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();

    let mut simulator =
        ConnectionSimulator::from_names_file(&args.names_file, args.writes_per_hour, args.seed)
            .unwrap_or_else(|e| {
                error!("Unable to set up the simulator: {}", e);
                std::process::exit(1);
            });

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.output)
        .await
        .unwrap_or_else(|e| {
            error!("Unable to open {}: {}", args.output.display(), e);
            std::process::exit(1);
        });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, stopping");
            on_signal.cancel();
        }
    });

    info!(
        "Writing ~{} records/hour to {}",
        args.writes_per_hour,
        args.output.display()
    );
    if let Err(e) = simulator
        .run(BufWriter::new(file), args.count, cancel)
        .await
    {
        error!("Simulator stopped on error: {}", e);
        std::process::exit(1);
    }
}
