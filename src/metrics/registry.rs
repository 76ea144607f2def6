//! The fixed catalog of published metrics.
//!
//! Every gauge is declared once at startup against a caller-supplied
//! registry. Per-device gauges carry the device identity labels, some with
//! an extra sub-dimension (voltage rail, clock domain); info gauges carry
//! descriptive strings and are pinned to 1. Building on a fresh
//! `Registry` keeps runtime self-metrics out of the exposed namespace.

use prometheus::{GaugeVec, Opts, Registry};

use crate::error::{ExporterError, Result};

const DEVICE_LABELS: &[&str] = &["device_name", "device_id", "subsystem_id"];
const RAIL_LABELS: &[&str] = &["device_name", "device_id", "subsystem_id", "rail"];
const CLOCK_LABELS: &[&str] = &["device_name", "device_id", "subsystem_id", "clock"];
const DEVICE_INFO_LABELS: &[&str] = &[
    "device_name",
    "device_id",
    "subsystem_id",
    "vbios",
    "gfx_version",
    "card_series",
    "card_vendor",
];
const SOFTWARE_INFO_LABELS: &[&str] = &[
    "driver_version",
    "rocm_smi_version",
    "rocm_smi_lib_version",
];

pub struct GpuMetrics {
    pub edge_temperature: GaugeVec,
    pub junction_temperature: GaugeVec,
    pub memory_temperature: GaugeVec,
    pub gpu_usage: GaugeVec,
    pub vram_usage: GaugeVec,
    pub umc_activity: GaugeVec,
    pub mm_activity: GaugeVec,
    pub socket_power: GaugeVec,
    pub socket_power_average: GaugeVec,
    pub package_power_average: GaugeVec,
    pub package_power_max: GaugeVec,
    pub voltage: GaugeVec,
    pub fan_speed: GaugeVec,
    pub clock_current: GaugeVec,
    pub clock_average: GaugeVec,
    pub pcie_width: GaugeVec,
    pub pcie_speed: GaugeVec,
    pub energy_accumulator: GaugeVec,
    pub accumulated_energy: GaugeVec,
    pub device_info: GaugeVec,
    pub software_info: GaugeVec,
}

impl GpuMetrics {
    /// Declare and register the full catalog. Fails if any metric name is
    /// already taken on the registry.
    pub fn register(registry: &Registry) -> Result<Self> {
        Ok(Self {
            edge_temperature: gauge(
                registry,
                "rocm_smi_edge_temperature_celsius",
                "Edge temperature (°C)",
                DEVICE_LABELS,
            )?,
            junction_temperature: gauge(
                registry,
                "rocm_smi_hotspot_temperature_celsius",
                "Hotspot/junction temperature (°C)",
                DEVICE_LABELS,
            )?,
            memory_temperature: gauge(
                registry,
                "rocm_smi_memory_temperature_celsius",
                "Memory temperature (°C)",
                DEVICE_LABELS,
            )?,
            gpu_usage: gauge(
                registry,
                "rocm_smi_gpu_usage_percent",
                "GPU usage (%)",
                DEVICE_LABELS,
            )?,
            vram_usage: gauge(
                registry,
                "rocm_smi_vram_allocation_percent",
                "VRAM allocation (%)",
                DEVICE_LABELS,
            )?,
            umc_activity: gauge(
                registry,
                "rocm_smi_umc_activity_percent",
                "UMC (memory controller) activity (%)",
                DEVICE_LABELS,
            )?,
            mm_activity: gauge(
                registry,
                "rocm_smi_mm_activity_percent",
                "Multimedia activity (%)",
                DEVICE_LABELS,
            )?,
            socket_power: gauge(
                registry,
                "rocm_smi_socket_power_watts",
                "Current socket power (W)",
                DEVICE_LABELS,
            )?,
            socket_power_average: gauge(
                registry,
                "rocm_smi_socket_power_average_watts",
                "Average socket power (W)",
                DEVICE_LABELS,
            )?,
            package_power_average: gauge(
                registry,
                "rocm_smi_gfx_package_power_average_watts",
                "Average graphics package power (W)",
                DEVICE_LABELS,
            )?,
            package_power_max: gauge(
                registry,
                "rocm_smi_gfx_package_power_max_watts",
                "Max graphics package power (W)",
                DEVICE_LABELS,
            )?,
            voltage: gauge(
                registry,
                "rocm_smi_voltage_millivolt",
                "Voltage (mV)",
                RAIL_LABELS,
            )?,
            fan_speed: gauge(
                registry,
                "rocm_smi_fan_speed_rpm",
                "Fan speed (RPM)",
                DEVICE_LABELS,
            )?,
            clock_current: gauge(
                registry,
                "rocm_smi_clock_current_mhz",
                "Current clock (MHz)",
                CLOCK_LABELS,
            )?,
            clock_average: gauge(
                registry,
                "rocm_smi_clock_average_mhz",
                "Average clock (MHz)",
                CLOCK_LABELS,
            )?,
            pcie_width: gauge(
                registry,
                "rocm_smi_pcie_link_width_lanes",
                "PCIe link width (lanes)",
                DEVICE_LABELS,
            )?,
            pcie_speed: gauge(
                registry,
                "rocm_smi_pcie_link_speed_gtps",
                "PCIe link speed (GT/s)",
                DEVICE_LABELS,
            )?,
            energy_accumulator: gauge(
                registry,
                "rocm_smi_energy_accumulator_uj",
                "Energy accumulator (µJ units per header)",
                DEVICE_LABELS,
            )?,
            accumulated_energy: gauge(
                registry,
                "rocm_smi_accumulated_energy_uj",
                "Accumulated energy (µJ)",
                DEVICE_LABELS,
            )?,
            device_info: gauge(
                registry,
                "rocm_smi_device_info",
                "Static device info",
                DEVICE_INFO_LABELS,
            )?,
            software_info: gauge(
                registry,
                "rocm_smi_software_info",
                "Software versions",
                SOFTWARE_INFO_LABELS,
            )?,
        })
    }
}

fn gauge(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)
        .map_err(|e| ExporterError::Metrics(format!("failed to declare {}: {}", name, e)))?;
    registry
        .register(Box::new(gauge.clone()))
        .map_err(|e| ExporterError::Metrics(format!("failed to register {}: {}", name, e)))?;
    Ok(gauge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_on_fresh_registry() {
        let registry = Registry::new();
        assert!(GpuMetrics::register(&registry).is_ok());
    }

    #[test]
    fn test_register_twice_conflicts() {
        let registry = Registry::new();
        GpuMetrics::register(&registry).expect("first registration");
        assert!(GpuMetrics::register(&registry).is_err());
    }

    #[test]
    fn test_namespace_holds_domain_metrics_only() {
        let registry = Registry::new();
        let metrics = GpuMetrics::register(&registry).expect("registration");
        metrics
            .gpu_usage
            .with_label_values(&["X", "0x740f", "0x0c34"])
            .set(42.0);

        metrics
            .voltage
            .with_label_values(&["X", "0x740f", "0x0c34", "gfx"])
            .set(900.0);

        // gather() drops families without samples, so only the two gauges
        // set above show up, both under the domain prefix.
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert_eq!(
            names,
            ["rocm_smi_gpu_usage_percent", "rocm_smi_voltage_millivolt"]
        );
    }
}
