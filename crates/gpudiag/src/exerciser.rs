//! Per-device smoke test.

use crate::runtime::{ComputeRuntime, SMOKE_TEST_SHAPE};
use gpudiag_common::types::{CudaTestResult, DeviceOutcome};
use tracing::{debug, warn};

/// Number of devices to test: the override when it parses, otherwise what the runtime reports
pub fn resolve_device_count<R: ComputeRuntime>(runtime: &R, count_override: Option<&str>) -> usize {
    match count_override.map(|raw| (raw, raw.trim().parse::<usize>())) {
        Some((_, Ok(count))) => count,
        Some((raw, Err(e))) => {
            warn!(value = raw, error = %e, "ignoring unparsable GPU count override");
            runtime.device_count()
        }
        None => runtime.device_count(),
    }
}

/// Exercise every device in index order, isolating failures per device
///
/// Without a linked backend the result is a single `Error` naming the missing runtime, so it
/// cannot be mistaken for a host with no GPUs.
pub fn run_cuda_test<R: ComputeRuntime>(runtime: &R, count_override: Option<&str>) -> CudaTestResult {
    if let Err(e) = runtime.ensure_available() {
        warn!(error = %e, "skipping device smoke test");
        return CudaTestResult::Error(e.to_string());
    }

    let count = resolve_device_count(runtime, count_override);
    if count == 0 {
        warn!("no GPUs to test");
        return CudaTestResult::no_gpus();
    }

    let outcomes = (0..count)
        .map(|index| {
            let result = runtime
                .device(index)
                .and_then(|device| runtime.random_sum(&device, SMOKE_TEST_SHAPE))
                .map_err(|e| e.to_string());

            match &result {
                Ok(()) => debug!(device = index, "device smoke test passed"),
                Err(e) => warn!(device = index, error = %e, "device smoke test failed"),
            }

            DeviceOutcome { index, result }
        })
        .collect();

    CudaTestResult::Devices(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{RuntimeError, UnavailableRuntime};
    use gpudiag_common::types::DEVICE_SUCCESS;
    use std::cell::RefCell;

    /// Fake runtime that records the order of calls and fails allocation on one index
    struct FakeRuntime {
        devices: usize,
        failing: Option<usize>,
        calls: RefCell<Vec<usize>>,
    }

    impl FakeRuntime {
        fn new(devices: usize, failing: Option<usize>) -> Self {
            Self {
                devices,
                failing,
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ComputeRuntime for FakeRuntime {
        type Device = usize;

        fn version(&self) -> String {
            "fake".to_string()
        }

        fn device_count(&self) -> usize {
            self.devices
        }

        fn device(&self, index: usize) -> Result<usize, RuntimeError> {
            Ok(index)
        }

        fn random_sum(&self, device: &usize, shape: [i64; 2]) -> Result<(), RuntimeError> {
            assert_eq!(shape, [10, 10]);
            self.calls.borrow_mut().push(*device);
            if self.failing == Some(*device) {
                return Err(RuntimeError::Backend("CUDA error: out of memory".to_string()));
            }
            Ok(())
        }
    }

    fn devices(result: CudaTestResult) -> Vec<DeviceOutcome> {
        match result {
            CudaTestResult::Devices(outcomes) => outcomes,
            other => panic!("expected per-device results, got {:?}", other),
        }
    }

    #[test]
    fn failing_device_does_not_affect_others() {
        let runtime = FakeRuntime::new(3, Some(1));
        let outcomes = devices(run_cuda_test(&runtime, None));

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].message(), DEVICE_SUCCESS);
        assert_eq!(outcomes[2].message(), DEVICE_SUCCESS);
        assert_eq!(outcomes[1].label(), "GPU 1");
        assert!(outcomes[1].message().starts_with("Error: "));
        assert!(outcomes[1].message().contains("out of memory"));
        assert_eq!(*runtime.calls.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn zero_devices_is_single_error() {
        let runtime = FakeRuntime::new(0, None);
        assert_eq!(run_cuda_test(&runtime, None), CudaTestResult::no_gpus());
        assert!(runtime.calls.borrow().is_empty());
    }

    #[test]
    fn override_takes_precedence_over_runtime_count() {
        let runtime = FakeRuntime::new(8, None);
        assert_eq!(devices(run_cuda_test(&runtime, Some("2"))).len(), 2);
        assert_eq!(run_cuda_test(&runtime, Some("0")), CudaTestResult::no_gpus());
    }

    #[test]
    fn unparsable_override_falls_back_to_runtime() {
        let runtime = FakeRuntime::new(2, None);
        assert_eq!(resolve_device_count(&runtime, Some("two")), 2);
        assert_eq!(resolve_device_count(&runtime, Some(" 3 ")), 3);
    }

    #[test]
    fn missing_backend_is_not_reported_as_zero_gpus() {
        for count_override in [None, Some("2")] {
            let result = run_cuda_test(&UnavailableRuntime, count_override);

            assert_ne!(result, CudaTestResult::no_gpus());
            assert_eq!(
                result,
                CudaTestResult::Error(
                    "compute runtime unavailable: built without the `torch` feature".to_string()
                )
            );
        }
    }
}
