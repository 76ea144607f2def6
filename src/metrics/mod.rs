pub mod exporter;
pub mod processor;
pub mod registry;

pub use exporter::PrometheusExporter;
pub use processor::SnapshotProcessor;
pub use registry::GpuMetrics;
