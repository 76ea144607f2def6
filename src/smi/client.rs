//! Invocation of the external rocm-smi binary.
//!
//! Two commands are used: a one-shot version query at startup and the
//! full-status JSON dump every poll cycle. Every invocation runs under a
//! deadline, and the snapshot path retries with backoff so a transient
//! tool failure does not take the exporter down.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::error::{ExporterError, Result};
use crate::smi::snapshot::Snapshot;

/// Deadline for a single rocm-smi invocation.
const INVOCATION_TIMEOUT: Duration = Duration::from_secs(10);
/// Snapshot attempts per poll cycle before giving up.
const SNAPSHOT_ATTEMPTS: u32 = 3;
/// First retry delay; doubles with every further attempt.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

static SMI_VERSION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ROCM-SMI version:\s*(.+)").expect("version pattern is valid"));
static SMI_LIB_VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"ROCM-SMI-LIB version:\s*(.+)").expect("lib version pattern is valid")
});

/// Tool and library version strings, fetched once at startup and held for
/// the process lifetime. Empty when the version query fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmiVersions {
    pub smi: String,
    pub lib: String,
}

/// Client for the rocm-smi command-line tool.
pub struct SmiClient {
    binary: PathBuf,
}

impl SmiClient {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// Query tool and library versions (`rocm-smi -V`).
    ///
    /// Failure is tolerated: logged as a warning, both strings default to
    /// empty.
    pub async fn versions(&self) -> SmiVersions {
        match self.invoke(&["-V"]).await {
            Ok(stdout) => parse_versions(&String::from_utf8_lossy(&stdout)),
            Err(e) => {
                warn!("rocm-smi version query failed: {}", e);
                SmiVersions::default()
            }
        }
    }

    /// Acquire one full snapshot (`rocm-smi -a --json`), retrying with
    /// backoff before reporting the persistent-failure error kind.
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let mut last_error = String::new();

        for attempt in 1..=SNAPSHOT_ATTEMPTS {
            match self.try_snapshot().await {
                Ok(snapshot) => {
                    debug!("retrieved snapshot on attempt {}", attempt);
                    return Ok(snapshot);
                }
                Err(e) => {
                    warn!(
                        "snapshot attempt {}/{} failed: {}",
                        attempt, SNAPSHOT_ATTEMPTS, e
                    );
                    last_error = e.to_string();
                    if attempt < SNAPSHOT_ATTEMPTS {
                        sleep(retry_delay(attempt)).await;
                    }
                }
            }
        }

        Err(ExporterError::SnapshotUnavailable {
            attempts: SNAPSHOT_ATTEMPTS,
            last_error,
        })
    }

    async fn try_snapshot(&self) -> Result<Snapshot> {
        let stdout = self.invoke(&["-a", "--json"]).await?;
        Snapshot::parse(&stdout)
    }

    async fn invoke(&self, args: &[&str]) -> Result<Vec<u8>> {
        let run = Command::new(&self.binary).args(args).output();
        let output = timeout(INVOCATION_TIMEOUT, run)
            .await
            .map_err(|_| ExporterError::Timeout {
                secs: INVOCATION_TIMEOUT.as_secs(),
            })?
            .map_err(|e| {
                ExporterError::Invocation(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExporterError::Invocation(format!(
                "{} {} exited with {}: {}",
                self.binary.display(),
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

fn retry_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY * 2u32.saturating_pow(attempt - 1)
}

/// Pull the two labeled version strings out of `rocm-smi -V` text output.
/// Either label may be missing; the corresponding string stays empty.
pub fn parse_versions(text: &str) -> SmiVersions {
    let capture = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default()
    };
    SmiVersions {
        smi: capture(&SMI_VERSION_RE),
        lib: capture(&SMI_LIB_VERSION_RE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_versions() {
        let out = "\nROCM-SMI version: 2.2.0+8e78352\nROCM-SMI-LIB version: 7.3.0\n";
        let versions = parse_versions(out);
        assert_eq!(versions.smi, "2.2.0+8e78352");
        assert_eq!(versions.lib, "7.3.0");
    }

    #[test]
    fn test_parse_versions_trims_whitespace() {
        let out = "ROCM-SMI version:   1.4.1  \nROCM-SMI-LIB version:\t5.0.0\n";
        let versions = parse_versions(out);
        assert_eq!(versions.smi, "1.4.1");
        assert_eq!(versions.lib, "5.0.0");
    }

    #[test]
    fn test_parse_versions_missing_labels() {
        let versions = parse_versions("usage: rocm-smi [-h] ...");
        assert_eq!(versions, SmiVersions::default());
    }

    #[test]
    fn test_retry_delay_doubles() {
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(2), Duration::from_secs(2));
        assert_eq!(retry_delay(3), Duration::from_secs(4));
    }
}
