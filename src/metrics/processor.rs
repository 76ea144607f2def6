//! Maps raw snapshot fields onto registered gauges.
//!
//! rocm-smi renamed most of its JSON keys between releases, so every
//! scalar metric carries the list of field names it may appear under,
//! ordered newest first. A device publishes whichever fields it has;
//! missing or "N/A" fields leave the gauge untouched for that device.

use prometheus::GaugeVec;
use tracing::debug;

use crate::metrics::GpuMetrics;
use crate::smi::{normalize, DeviceIdentity, DeviceRecord, SmiVersions, Snapshot};

/// One scalar metric: where to find it in the record and how to rescale it.
struct ScalarSpec {
    aliases: &'static [&'static str],
    scale: f64,
    gauge: fn(&GpuMetrics) -> &GaugeVec,
}

impl ScalarSpec {
    fn resolve(&self, record: &DeviceRecord) -> Option<f64> {
        normalize(record.first_of(self.aliases), self.scale)
    }
}

const SCALAR_SPECS: &[ScalarSpec] = &[
    ScalarSpec {
        aliases: &["Temperature (Sensor edge) (C)", "temperature_edge (C)"],
        scale: 1.0,
        gauge: |m| &m.edge_temperature,
    },
    ScalarSpec {
        aliases: &["Temperature (Sensor junction) (C)", "temperature_hotspot (C)"],
        scale: 1.0,
        gauge: |m| &m.junction_temperature,
    },
    ScalarSpec {
        aliases: &["Temperature (Sensor memory) (C)", "temperature_mem (C)"],
        scale: 1.0,
        gauge: |m| &m.memory_temperature,
    },
    ScalarSpec {
        aliases: &["GPU use (%)", "average_gfx_activity (%)"],
        scale: 1.0,
        gauge: |m| &m.gpu_usage,
    },
    ScalarSpec {
        aliases: &["GPU Memory Allocated (VRAM%)"],
        scale: 1.0,
        gauge: |m| &m.vram_usage,
    },
    ScalarSpec {
        aliases: &["average_umc_activity (%)"],
        scale: 1.0,
        gauge: |m| &m.umc_activity,
    },
    ScalarSpec {
        aliases: &["average_mm_activity (%)"],
        scale: 1.0,
        gauge: |m| &m.mm_activity,
    },
    ScalarSpec {
        aliases: &[
            "Current Socket Graphics Package Power (W)",
            "current_socket_power (W)",
        ],
        scale: 1.0,
        gauge: |m| &m.socket_power,
    },
    ScalarSpec {
        aliases: &["average_socket_power (W)"],
        scale: 1.0,
        gauge: |m| &m.socket_power_average,
    },
    ScalarSpec {
        aliases: &["Average Graphics Package Power (W)"],
        scale: 1.0,
        gauge: |m| &m.package_power_average,
    },
    ScalarSpec {
        aliases: &["Max Graphics Package Power (W)"],
        scale: 1.0,
        gauge: |m| &m.package_power_max,
    },
    ScalarSpec {
        aliases: &["current_fan_speed (rpm)"],
        scale: 1.0,
        gauge: |m| &m.fan_speed,
    },
    ScalarSpec {
        aliases: &["pcie_link_width (Lanes)"],
        scale: 1.0,
        gauge: |m| &m.pcie_width,
    },
    // Reported in tenths of GT/s.
    ScalarSpec {
        aliases: &["pcie_link_speed (0.1 GT/s)"],
        scale: 0.1,
        gauge: |m| &m.pcie_speed,
    },
    ScalarSpec {
        aliases: &["energy_accumulator (15.259uJ (2^-16))", "Energy counter"],
        scale: 1.0,
        gauge: |m| &m.energy_accumulator,
    },
    ScalarSpec {
        aliases: &["Accumulated Energy (uJ)"],
        scale: 1.0,
        gauge: |m| &m.accumulated_energy,
    },
];

const VOLTAGE_RAILS: &[(&str, &str)] = &[
    ("voltage_soc (mV)", "soc"),
    ("voltage_gfx (mV)", "gfx"),
    ("voltage_mem (mV)", "mem"),
    ("Voltage (mV)", "vcore"),
];

const CURRENT_CLOCKS: &[(&str, &str)] = &[
    ("current_gfxclk (MHz)", "gfxclk"),
    ("current_socclk (MHz)", "socclk"),
    ("current_uclk (MHz)", "uclk"),
    ("current_vclk0 (MHz)", "vclk0"),
    ("current_dclk0 (MHz)", "dclk0"),
];

const AVERAGE_CLOCKS: &[(&str, &str)] = &[
    ("average_gfxclk_frequency (MHz)", "gfxclk"),
    ("average_socclk_frequency (MHz)", "socclk"),
    ("average_uclk_frequency (MHz)", "uclk"),
    ("average_vclk0_frequency (MHz)", "vclk0"),
    ("average_dclk0_frequency (MHz)", "dclk0"),
];

pub struct SnapshotProcessor {
    metrics: GpuMetrics,
    versions: SmiVersions,
}

impl SnapshotProcessor {
    pub fn new(metrics: GpuMetrics, versions: SmiVersions) -> Self {
        Self { metrics, versions }
    }

    /// Publish one snapshot: software info from the system section, then
    /// every device card.
    pub fn process(&self, snapshot: &Snapshot) {
        self.publish_software_info(snapshot.system());
        for (key, record) in snapshot.devices() {
            self.process_device(key, record);
        }
    }

    fn publish_software_info(&self, system: Option<&DeviceRecord>) {
        if let Some(driver) = system.and_then(|record| record.text("Driver version")) {
            set_gauge(
                &self.metrics.software_info,
                &[&driver, &self.versions.smi, &self.versions.lib],
                1.0,
            );
        }
    }

    fn process_device(&self, key: &str, record: &DeviceRecord) {
        let identity = DeviceIdentity::from_record(record);
        let labels = identity.label_values();

        self.publish_device_info(key, record, &labels);

        for spec in SCALAR_SPECS {
            if let Some(value) = spec.resolve(record) {
                set_gauge((spec.gauge)(&self.metrics), &labels, value);
            }
        }

        for &(field, rail) in VOLTAGE_RAILS {
            if let Some(value) = normalize(record.get(field), 1.0) {
                set_gauge(&self.metrics.voltage, &with_dimension(&labels, rail), value);
            }
        }
        for &(field, clock) in CURRENT_CLOCKS {
            if let Some(value) = normalize(record.get(field), 1.0) {
                set_gauge(
                    &self.metrics.clock_current,
                    &with_dimension(&labels, clock),
                    value,
                );
            }
        }
        for &(field, clock) in AVERAGE_CLOCKS {
            if let Some(value) = normalize(record.get(field), 1.0) {
                set_gauge(
                    &self.metrics.clock_average,
                    &with_dimension(&labels, clock),
                    value,
                );
            }
        }

        debug!(device = key, "published device metrics");
    }

    fn publish_device_info(&self, key: &str, record: &DeviceRecord, labels: &[&str; 3]) {
        let text = |field: &str| record.text(field).unwrap_or_default();
        let vbios = text("VBIOS version");
        // Key casing changed across releases.
        let gfx_version = record
            .text("GFX Version")
            .filter(|s| !s.is_empty())
            .or_else(|| record.text("GFX version"))
            .unwrap_or_default();
        let card_series = text("Card Series");
        let card_vendor = text("Card Vendor");

        let values: [&str; 7] = [
            labels[0],
            labels[1],
            labels[2],
            &vbios,
            &gfx_version,
            &card_series,
            &card_vendor,
        ];
        set_gauge(&self.metrics.device_info, &values, 1.0);
        debug!(device = key, "published device info");
    }
}

fn set_gauge(gauge: &GaugeVec, labels: &[&str], value: f64) {
    match gauge.get_metric_with_label_values(labels) {
        Ok(metric) => metric.set(value),
        Err(e) => debug!(error = %e, "skipped gauge with mismatched labels"),
    }
}

fn with_dimension<'a>(labels: &[&'a str; 3], dimension: &'a str) -> [&'a str; 4] {
    [labels[0], labels[1], labels[2], dimension]
}
