use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rocm-smi-exporter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Prometheus exporter for AMD GPU telemetry reported by rocm-smi", long_about = None)]
pub struct Cli {
    #[arg(
        short,
        long,
        default_value_t = 9101,
        help = "Port for the metrics endpoint"
    )]
    pub port: u16,

    #[arg(
        short,
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Polling interval in seconds"
    )]
    pub interval: u64,

    #[arg(long, default_value = "rocm-smi", help = "rocm-smi binary to invoke")]
    pub smi_bin: PathBuf,

    #[arg(short, long, help = "Enable verbose logging")]
    pub verbose: bool,
}
