use std::path::PathBuf;

use clap::Parser;

use relay_node::{NodeConfig, run_simulation};

#[derive(Parser)]
#[command(name = "relay-sim", about = "Two-chain packet relay simulator")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of payloads to send (overrides `simulation.packets`)
    #[arg(short, long)]
    packets: Option<usize>,

    /// Packet timeout in milliseconds (overrides `relay.packet_timeout_ms`)
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match NodeConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("failed to load config from {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        None => NodeConfig::default(),
    };
    if let Some(packets) = cli.packets {
        config.simulation.packets = packets;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.relay.packet_timeout_ms = timeout_ms;
    }

    if cli.json || config.logging.json {
        relay_node::logging::init_json(&config.logging.level);
    } else {
        relay_node::logging::init(&config.logging.level);
    }

    let report = tokio::select! {
        result = run_simulation(&config) => match result {
            Ok(report) => report,
            Err(e) => {
                tracing::error!("simulation failed: {e}");
                std::process::exit(1);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received SIGINT, shutting down");
            std::process::exit(130);
        }
    };

    println!(
        "{} -> {}: sent {}, acknowledged {}, timed out {}, delivered {}",
        report.source,
        report.destination,
        report.sent,
        report.acknowledged,
        report.timed_out,
        report.delivered
    );
    if !report.is_complete() {
        std::process::exit(2);
    }
}
