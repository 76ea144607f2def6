use clap::Parser;
use prometheus::Registry;
use rocm_smi_exporter::cli::Cli;
use rocm_smi_exporter::metrics::{GpuMetrics, PrometheusExporter, SnapshotProcessor};
use rocm_smi_exporter::poller::Poller;
use rocm_smi_exporter::smi::SmiClient;
use std::process;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    info!("Starting rocm-smi-exporter v{}", env!("CARGO_PKG_VERSION"));

    // A fresh registry keeps runtime self-metrics out of the exposed
    // namespace.
    let registry = Registry::new();
    let metrics = match GpuMetrics::register(&registry) {
        Ok(metrics) => metrics,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let client = SmiClient::new(cli.smi_bin);
    let versions = client.versions().await;
    info!(smi = %versions.smi, lib = %versions.lib, "Queried rocm-smi versions");

    let processor = SnapshotProcessor::new(metrics, versions);
    let exporter = PrometheusExporter::new(registry, cli.port);
    let poller = Poller::new(client, processor, Duration::from_secs(cli.interval));

    let result = tokio::select! {
        res = exporter.serve() => res,
        res = poller.run() => res,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
