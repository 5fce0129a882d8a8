//! Host GPU details scraped from `nvidia-smi`.

use gpudiag_common::types::{HostMachineInfo, NOT_AVAILABLE, SmiFields};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, warn};

static CUDA_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"CUDA Version: (\d+\.\d+)").expect("valid CUDA version pattern"));

static DRIVER_VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Driver Version: (\d+\.\d+\.\d+)").expect("valid driver version pattern")
});

/// First row of the device table, e.g. `|   0  NVIDIA A100-SXM4-80GB   On  |`
static GPU_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\|\s+\d+\s+([^\|]+?)\s+On\s+\|").expect("valid GPU name pattern"));

#[derive(Error, Debug)]
pub enum SmiError {
    #[error("failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' did not finish within {timeout:?}")]
    Timeout { command: String, timeout: Duration },
}

/// Run the diagnostic command and parse its output into the report section
pub async fn host_machine_info(command: &str, timeout: Duration) -> HostMachineInfo {
    match capture_output(command, timeout).await {
        Ok(output) => {
            let fields = parse_output(&output);
            debug!(
                cuda_version = %fields.cuda_version,
                driver_version = %fields.driver_version,
                gpu_name = %fields.gpu_name,
                "parsed diagnostic command output"
            );
            HostMachineInfo::Parsed(fields)
        }
        Err(e) => {
            warn!(error = %e, "diagnostic command unavailable");
            HostMachineInfo::error(e)
        }
    }
}

/// Run `command` without arguments and return stdout followed by stderr
///
/// A non-zero exit status is not an error; whatever the command printed is returned. A
/// command that is not installed produces no output, so every parsed field ends up as the
/// sentinel.
pub async fn capture_output(command: &str, timeout: Duration) -> Result<String, SmiError> {
    let mut cmd = Command::new(command);
    cmd.stdin(Stdio::null()).kill_on_drop(true);

    let spawned = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| SmiError::Timeout {
            command: command.to_string(),
            timeout,
        })?;

    let output = match spawned {
        Ok(output) => output,
        Err(source) if source.kind() == ErrorKind::NotFound => {
            debug!(command, "diagnostic command not installed");
            return Ok(String::new());
        }
        Err(source) => {
            return Err(SmiError::Spawn {
                command: command.to_string(),
                source,
            });
        }
    };

    if !output.status.success() {
        debug!(status = ?output.status.code(), "diagnostic command exited unsuccessfully");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let combined = match (stdout.trim_end().is_empty(), stderr.trim_end().is_empty()) {
        (_, true) => stdout.trim_end().to_string(),
        (true, false) => stderr.trim_end().to_string(),
        (false, false) => format!("{}\n{}", stdout.trim_end(), stderr.trim_end()),
    };

    Ok(combined)
}

/// Extract the CUDA version, driver version and first GPU name
///
/// Each field is searched independently and falls back to the sentinel on its own.
pub fn parse_output(output: &str) -> SmiFields {
    let capture = |pattern: &Regex| {
        pattern
            .captures(output)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    };

    SmiFields {
        cuda_version: capture(&CUDA_VERSION),
        driver_version: capture(&DRIVER_VERSION),
        gpu_name: capture(&GPU_NAME),
    }
}
