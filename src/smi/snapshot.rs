//! Parsed rocm-smi snapshot: one poll cycle's full JSON output.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{ExporterError, Result};

/// Top-level key rocm-smi uses for host-wide fields such as the driver
/// version.
pub const SYSTEM_KEY: &str = "system";

const UNKNOWN: &str = "unknown";

/// Full parsed output of one `rocm-smi -a --json` invocation.
///
/// Top-level keys are device keys ("card0", ...) plus the literal
/// "system" key, each mapping to a flat record of field-name to raw
/// value. Immutable once parsed, discarded after processing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    records: BTreeMap<String, DeviceRecord>,
}

impl Snapshot {
    /// Parse raw tool stdout. Any deviation from the expected shape is an
    /// error; the cycle must abort before anything is published.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| ExporterError::SnapshotParse(e.to_string()))
    }

    /// Host-wide record, when present.
    pub fn system(&self) -> Option<&DeviceRecord> {
        self.records.get(SYSTEM_KEY)
    }

    /// Per-device records in stable key order, system key excluded.
    pub fn devices(&self) -> impl Iterator<Item = (&str, &DeviceRecord)> {
        self.records
            .iter()
            .filter(|(key, _)| key.as_str() != SYSTEM_KEY)
            .map(|(key, record)| (key.as_str(), record))
    }

    pub fn device_count(&self) -> usize {
        self.devices().count()
    }
}

/// One device's (or the system block's) flat field map.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct DeviceRecord {
    fields: BTreeMap<String, Value>,
}

impl DeviceRecord {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Value under the first candidate key present in the record.
    ///
    /// Candidate order encodes schema precedence: newer field names first,
    /// deprecated ones after. Presence alone decides the lookup, not
    /// whether the value normalizes to anything.
    pub fn first_of(&self, aliases: &[&str]) -> Option<&Value> {
        aliases.iter().find_map(|key| self.fields.get(*key))
    }

    /// Field rendered as text, for label values. Strings pass through,
    /// numbers are formatted, other shapes count as absent.
    pub fn text(&self, key: &str) -> Option<String> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Label triple identifying one GPU across all its metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_name: String,
    pub device_id: String,
    pub subsystem_id: String,
}

impl DeviceIdentity {
    /// Extract identity labels, defaulting every missing field to
    /// "unknown" so each published sample stays attributable.
    pub fn from_record(record: &DeviceRecord) -> Self {
        let field = |key: &str| record.text(key).unwrap_or_else(|| UNKNOWN.to_string());
        Self {
            device_name: field("Device Name"),
            device_id: field("Device ID"),
            subsystem_id: field("Subsystem ID"),
        }
    }

    pub fn label_values(&self) -> [&str; 3] {
        [&self.device_name, &self.device_id, &self.subsystem_id]
    }
}
