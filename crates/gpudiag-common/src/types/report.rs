//! Schema of the diagnostics report.
//!
//! Key names and ordering are part of the output format consumed by support tooling, so
//! every field carries an explicit serde rename.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Placeholder for any value that could not be determined
pub const NOT_AVAILABLE: &str = "Not Available";

/// Recorded for a device whose smoke test completed
pub const DEVICE_SUCCESS: &str = "Success: CUDA is working correctly.";

/// Recorded instead of per-device entries when the device count resolves to zero
pub const NO_GPUS_FOUND: &str = "No GPUs found.";

/// Top-level report written to disk
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    #[serde(rename = "PyTorch Version")]
    pub runtime_version: String,
    #[serde(rename = "Environment Info")]
    pub environment: EnvironmentInfo,
    #[serde(rename = "Host Machine Info")]
    pub host: HostMachineInfo,
    #[serde(rename = "CUDA Test Result")]
    pub cuda_test: CudaTestResult,
}

/// Container environment as seen by the diagnostics process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(rename = "RUNPOD_POD_ID")]
    pub pod_id: String,
    #[serde(rename = "Template CUDA_VERSION")]
    pub template_cuda_version: String,
    #[serde(rename = "NVIDIA_DRIVER_CAPABILITIES")]
    pub driver_capabilities: String,
    #[serde(rename = "NVIDIA_VISIBLE_DEVICES")]
    pub visible_devices: String,
    #[serde(rename = "NVIDIA_PRODUCT_NAME")]
    pub product_name: String,
    #[serde(rename = "RUNPOD_GPU_COUNT")]
    pub gpu_count: String,
    /// Written as `null` when the lookup produced nothing
    #[serde(rename = "machineId")]
    pub machine_id: Option<String>,
}

/// Fields extracted from the diagnostic command output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmiFields {
    #[serde(rename = "CUDA Version")]
    pub cuda_version: String,
    #[serde(rename = "Driver Version")]
    pub driver_version: String,
    #[serde(rename = "GPU Name")]
    pub gpu_name: String,
}

/// Host section of the report
///
/// When the diagnostic command cannot run at all the section collapses to a single
/// `Error` key instead of the three parsed fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HostMachineInfo {
    Parsed(SmiFields),
    Error {
        #[serde(rename = "Error")]
        error: String,
    },
}

impl HostMachineInfo {
    pub fn error(cause: impl std::fmt::Display) -> Self {
        HostMachineInfo::Error {
            error: format!("Failed to fetch nvidia-smi info: {}", cause),
        }
    }
}

/// Outcome of the smoke test on one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub index: usize,
    pub result: Result<(), String>,
}

impl DeviceOutcome {
    pub fn label(&self) -> String {
        format!("GPU {}", self.index)
    }

    pub fn message(&self) -> String {
        match &self.result {
            Ok(()) => DEVICE_SUCCESS.to_string(),
            Err(cause) => format!("Error: {}", cause),
        }
    }
}

/// Smoke test section of the report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CudaTestResult {
    /// One entry per device index, in increasing order
    Devices(Vec<DeviceOutcome>),
    /// Single `Error` key, used when there was nothing to test
    Error(String),
}

impl CudaTestResult {
    pub fn no_gpus() -> Self {
        CudaTestResult::Error(NO_GPUS_FOUND.to_string())
    }
}

impl Serialize for CudaTestResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            CudaTestResult::Devices(outcomes) => {
                let mut map = serializer.serialize_map(Some(outcomes.len()))?;
                for outcome in outcomes {
                    map.serialize_entry(&outcome.label(), &outcome.message())?;
                }
                map.end()
            }
            CudaTestResult::Error(message) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Error", message)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn environment() -> EnvironmentInfo {
        EnvironmentInfo {
            pod_id: "abc123".to_string(),
            template_cuda_version: "12.1.0".to_string(),
            driver_capabilities: NOT_AVAILABLE.to_string(),
            visible_devices: "all".to_string(),
            product_name: NOT_AVAILABLE.to_string(),
            gpu_count: "2".to_string(),
            machine_id: None,
        }
    }

    #[test]
    fn top_level_keys_keep_report_order() {
        let info = SystemInfo {
            runtime_version: "2.7.0".to_string(),
            environment: environment(),
            host: HostMachineInfo::error("boom"),
            cuda_test: CudaTestResult::no_gpus(),
        };

        let text = serde_json::to_string(&info).unwrap();
        let positions: Vec<usize> = [
            "\"PyTorch Version\"",
            "\"Environment Info\"",
            "\"Host Machine Info\"",
            "\"CUDA Test Result\"",
        ]
        .iter()
        .map(|key| text.find(key).unwrap())
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn missing_machine_id_serializes_as_null() {
        let value = serde_json::to_value(environment()).unwrap();
        assert_eq!(value["machineId"], serde_json::Value::Null);
        assert_eq!(value["Template CUDA_VERSION"], "12.1.0");
        assert_eq!(value["NVIDIA_PRODUCT_NAME"], NOT_AVAILABLE);
    }

    #[test]
    fn host_error_collapses_to_single_key() {
        let value = serde_json::to_value(HostMachineInfo::error("No such file")).unwrap();
        assert_eq!(
            value,
            json!({"Error": "Failed to fetch nvidia-smi info: No such file"})
        );
    }

    #[test]
    fn device_results_are_labelled_in_index_order() {
        let outcomes = (0..12)
            .map(|index| DeviceOutcome {
                index,
                result: if index == 1 {
                    Err("device busy".to_string())
                } else {
                    Ok(())
                },
            })
            .collect();

        let text = serde_json::to_string(&CudaTestResult::Devices(outcomes)).unwrap();
        assert!(text.find("\"GPU 2\"").unwrap() < text.find("\"GPU 10\"").unwrap());

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["GPU 0"], DEVICE_SUCCESS);
        assert_eq!(value["GPU 1"], "Error: device busy");
        assert_eq!(value.as_object().unwrap().len(), 12);
    }

    #[test]
    fn no_gpus_is_single_error_entry() {
        let value = serde_json::to_value(CudaTestResult::no_gpus()).unwrap();
        assert_eq!(value, json!({"Error": "No GPUs found."}));
    }
}
