pub mod cli;
pub mod error;
pub mod metrics;
pub mod poller;
pub mod smi;

pub use error::{ExporterError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
