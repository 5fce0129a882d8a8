//! Reads the Runpod and NVIDIA container variables that go into the report.

use gpudiag_common::types::{EnvironmentInfo, NOT_AVAILABLE};
use secrecy::SecretString;

pub const POD_ID: &str = "RUNPOD_POD_ID";
pub const CUDA_VERSION: &str = "CUDA_VERSION";
pub const DRIVER_CAPABILITIES: &str = "NVIDIA_DRIVER_CAPABILITIES";
pub const VISIBLE_DEVICES: &str = "NVIDIA_VISIBLE_DEVICES";
pub const PRODUCT_NAME: &str = "NVIDIA_PRODUCT_NAME";
pub const GPU_COUNT: &str = "RUNPOD_GPU_COUNT";
pub const API_KEY: &str = "RUNPOD_API_KEY";

/// Snapshot of the container environment, taken once per run
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub pod_id: Option<String>,
    pub template_cuda_version: Option<String>,
    pub driver_capabilities: Option<String>,
    pub visible_devices: Option<String>,
    pub product_name: Option<String>,
    pub gpu_count: Option<String>,
    /// Never serialized into the report
    pub api_key: Option<SecretString>,
}

impl Environment {
    /// Read from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| {
            std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
        })
    }

    /// Read through an arbitrary lookup, e.g. a map in tests
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            pod_id: lookup(POD_ID),
            template_cuda_version: lookup(CUDA_VERSION),
            driver_capabilities: lookup(DRIVER_CAPABILITIES),
            visible_devices: lookup(VISIBLE_DEVICES),
            product_name: lookup(PRODUCT_NAME),
            gpu_count: lookup(GPU_COUNT),
            api_key: lookup(API_KEY).map(SecretString::from),
        }
    }

    /// Raw `RUNPOD_GPU_COUNT`, used as the device count override
    pub fn gpu_count_override(&self) -> Option<&str> {
        self.gpu_count.as_deref()
    }

    /// Build the report section, substituting the sentinel for anything unset
    pub fn to_info(&self, machine_id: Option<String>) -> EnvironmentInfo {
        EnvironmentInfo {
            pod_id: or_sentinel(&self.pod_id),
            template_cuda_version: or_sentinel(&self.template_cuda_version),
            driver_capabilities: or_sentinel(&self.driver_capabilities),
            visible_devices: or_sentinel(&self.visible_devices),
            product_name: or_sentinel(&self.product_name),
            gpu_count: or_sentinel(&self.gpu_count),
            machine_id,
        }
    }
}

fn or_sentinel(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
