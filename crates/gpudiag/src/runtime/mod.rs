//! Compute runtimes used to smoke-test devices.
//!
//! Device selection is explicit: a runtime hands out a device handle for an index, and every
//! operation takes that handle instead of relying on a process-wide "current device".

#[cfg(feature = "torch")]
pub mod torch;

use thiserror::Error;

#[cfg(feature = "torch")]
pub use torch::TorchRuntime;

/// Shape of each operand in the smoke test
pub const SMOKE_TEST_SHAPE: [i64; 2] = [10, 10];

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("compute runtime unavailable: {0}")]
    Unavailable(&'static str),

    #[error("invalid device index {0}")]
    InvalidDevice(usize),

    #[error("{0}")]
    Backend(String),
}

/// A numeric runtime able to allocate and compute on GPU devices
pub trait ComputeRuntime {
    type Device;

    /// Version string written into the report
    fn version(&self) -> String;

    /// Whether a backend is linked at all; an unlinked backend cannot report devices
    fn ensure_available(&self) -> Result<(), RuntimeError> {
        Ok(())
    }

    /// Number of devices the runtime can see
    fn device_count(&self) -> usize;

    /// Handle for the device at `index`
    fn device(&self, index: usize) -> Result<Self::Device, RuntimeError>;

    /// Allocate two uniform-random matrices of `shape` on `device` and add them,
    /// blocking until the device has finished
    fn random_sum(&self, device: &Self::Device, shape: [i64; 2]) -> Result<(), RuntimeError>;
}

/// Stand-in used when the crate is built without a GPU backend
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRuntime;

const NO_BACKEND: &str = "built without the `torch` feature";

impl ComputeRuntime for UnavailableRuntime {
    type Device = usize;

    fn version(&self) -> String {
        gpudiag_common::types::NOT_AVAILABLE.to_string()
    }

    fn ensure_available(&self) -> Result<(), RuntimeError> {
        Err(RuntimeError::Unavailable(NO_BACKEND))
    }

    fn device_count(&self) -> usize {
        0
    }

    fn device(&self, _index: usize) -> Result<usize, RuntimeError> {
        Err(RuntimeError::Unavailable(NO_BACKEND))
    }

    fn random_sum(&self, _device: &usize, _shape: [i64; 2]) -> Result<(), RuntimeError> {
        Err(RuntimeError::Unavailable(NO_BACKEND))
    }
}

/// Runtime picked at build time
#[cfg(feature = "torch")]
pub fn default_runtime() -> TorchRuntime {
    TorchRuntime
}

/// Runtime picked at build time
#[cfg(not(feature = "torch"))]
pub fn default_runtime() -> UnavailableRuntime {
    UnavailableRuntime
}
