//! libtorch backend via `tch`.

use super::{ComputeRuntime, RuntimeError};
use std::path::Path;
use tch::{Cuda, Device, Kind, Tensor};
use tracing::debug;

/// libtorch release that tch 0.20 binds against
///
/// `tch` exposes no runtime query for the torch version, so this is only a fallback for when
/// the installed libtorch cannot be inspected. It goes stale when the `tch` pin moves, and is
/// wrong for builds linked with `LIBTORCH_BYPASS_VERSION_CHECK` against another release.
const LIBTORCH_VERSION: &str = "2.7.0";

/// Version string shipped with libtorch distributions, e.g. `2.7.0+cu126`
const BUILD_VERSION_FILE: &str = "build-version";

#[derive(Debug, Clone, Copy, Default)]
pub struct TorchRuntime;

impl From<tch::TchError> for RuntimeError {
    fn from(err: tch::TchError) -> Self {
        RuntimeError::Backend(err.to_string())
    }
}

impl ComputeRuntime for TorchRuntime {
    type Device = Device;

    fn version(&self) -> String {
        std::env::var_os("LIBTORCH")
            .and_then(|dir| installed_version(Path::new(&dir)))
            .unwrap_or_else(|| LIBTORCH_VERSION.to_string())
    }

    fn device_count(&self) -> usize {
        Cuda::device_count().max(0) as usize
    }

    fn device(&self, index: usize) -> Result<Device, RuntimeError> {
        Ok(Device::Cuda(index))
    }

    fn random_sum(&self, device: &Device, shape: [i64; 2]) -> Result<(), RuntimeError> {
        let index = match device {
            Device::Cuda(index) => *index,
            _ => return Err(RuntimeError::Backend(format!("not a CUDA device: {:?}", device))),
        };
        if index as i64 >= Cuda::device_count() {
            return Err(RuntimeError::InvalidDevice(index));
        }

        let x = Tensor::f_rand(shape, (Kind::Float, *device))?;
        let y = Tensor::f_rand(shape, (Kind::Float, *device))?;
        let _z = x.f_add(&y)?;
        Cuda::synchronize(index as i64);
        Ok(())
    }
}

/// Read the release recorded in a libtorch install directory
fn installed_version(libtorch: &Path) -> Option<String> {
    let path = libtorch.join(BUILD_VERSION_FILE);
    let version = std::fs::read_to_string(&path).ok()?.trim().to_string();
    if version.is_empty() {
        return None;
    }
    debug!(path = %path.display(), version = %version, "read libtorch version");
    Some(version)
}
