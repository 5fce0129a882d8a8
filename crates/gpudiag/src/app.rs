use crate::environment::Environment;
use crate::exerciser::run_cuda_test;
use crate::report::{ReportError, write_report};
use crate::runpod::RunpodClient;
use crate::runtime::ComputeRuntime;
use crate::smi::host_machine_info;
use gpudiag_common::config::Config;
use gpudiag_common::types::{EnvironmentInfo, SystemInfo};
use tracing::{info, warn};

/// One diagnostics run: collects every report section and writes the result
pub struct App<R> {
    config: Config,
    environment: Environment,
    runtime: R,
}

impl<R: ComputeRuntime> App<R> {
    pub fn new(config: Config, environment: Environment, runtime: R) -> Self {
        Self {
            config,
            environment,
            runtime,
        }
    }

    /// Collect all sections, then write the report
    ///
    /// Every collection step degrades into sentinel values; only the final write can fail.
    pub async fn run(&self) -> Result<SystemInfo, ReportError> {
        let info = self.collect().await;

        let path = &self.config.output_path;
        write_report(path, &info)?;
        println!(
            "Diagnostics information saved to {}. Please share this file with RunPod Tech Support for further assistance.",
            path.display()
        );

        Ok(info)
    }

    /// Build the full report without touching the output file
    pub async fn collect(&self) -> SystemInfo {
        let runtime_version = self.runtime.version();
        let environment = self.collect_environment().await;
        let host = host_machine_info(&self.config.smi_command, self.config.smi_timeout).await;

        println!("Performing CUDA operation tests on all available GPUs...");
        let cuda_test = run_cuda_test(&self.runtime, self.environment.gpu_count_override());

        SystemInfo {
            runtime_version,
            environment,
            host,
            cuda_test,
        }
    }

    /// Environment variables plus the machine id resolved from the pod id
    pub async fn collect_environment(&self) -> EnvironmentInfo {
        println!("Collecting environment information...");

        let machine_id = match RunpodClient::new(&self.config.api_url, self.config.lookup_timeout)
        {
            Ok(client) => {
                client
                    .machine_id(
                        self.environment.pod_id.as_deref(),
                        self.environment.api_key.as_ref(),
                    )
                    .await
            }
            Err(e) => {
                println!("Failed to fetch machineId: {}", e);
                warn!(error = ?e, "could not build Runpod client");
                None
            }
        };

        info!(
            pod_id = self.environment.pod_id.as_deref().unwrap_or_default(),
            resolved = machine_id.is_some(),
            "environment collected"
        );

        self.environment.to_info(machine_id)
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
