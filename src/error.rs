use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("rocm-smi invocation failed: {0}")]
    Invocation(String),

    #[error("rocm-smi did not finish within {secs}s")]
    Timeout { secs: u64 },

    #[error("rocm-smi snapshot was not parseable: {0}")]
    SnapshotParse(String),

    #[error("snapshot unavailable after {attempts} attempts: {last_error}")]
    SnapshotUnavailable { attempts: u32, last_error: String },

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("metrics endpoint error: {0}")]
    Server(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExporterError>;
