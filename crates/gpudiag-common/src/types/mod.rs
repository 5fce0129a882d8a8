pub mod report;

pub use report::{
    CudaTestResult, DEVICE_SUCCESS, DeviceOutcome, EnvironmentInfo, HostMachineInfo,
    NO_GPUS_FOUND, NOT_AVAILABLE, SmiFields, SystemInfo,
};
