//! Configuration module for the gpudiag tool.
//!
//! Settings are loaded from environment variables using the figment crate. Durations
//! accept both numeric values (interpreted as seconds) and duration strings with units.
//!
//! The Runpod variables that end up inside the report are not part of this struct; they
//! are read verbatim by the environment reader so their values are never reinterpreted.

use figment::{Figment, providers::Env};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// Runtime settings for a diagnostics run
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Where the JSON report is written
    ///
    /// Default: /workspace/gpu_diagnostics.json
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Runpod GraphQL endpoint, without the api_key query parameter
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Diagnostic command executed to describe the host GPUs
    #[serde(default = "default_smi_command")]
    pub smi_command: String,

    /// Upper bound for the machine id lookup request
    #[serde(
        default = "default_lookup_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub lookup_timeout: Duration,

    /// Upper bound for the diagnostic command
    #[serde(
        default = "default_smi_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub smi_timeout: Duration,

    /// Log level for this application's targets
    ///
    /// e.g. "debug" would be similar to "warn,gpudiag=debug,gpudiag_common=debug"
    ///
    /// Valid values are: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("/workspace/gpu_diagnostics.json")
}

fn default_api_url() -> String {
    "https://api.runpod.io/graphql".to_string()
}

fn default_smi_command() -> String {
    "nvidia-smi".to_string()
}

fn default_lookup_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_smi_timeout() -> Duration {
    Duration::from_secs(30)
}

/// Progress goes to stdout, so logs stay quiet unless asked for
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            api_url: default_api_url(),
            smi_command: default_smi_command(),
            lookup_timeout: default_lookup_timeout(),
            smi_timeout: default_smi_timeout(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::raw().only(&[
                "GPU_DIAGNOSTICS_OUTPUT",
                "RUNPOD_API_URL",
                "GPU_DIAGNOSTICS_SMI_COMMAND",
                "GPU_DIAGNOSTICS_LOOKUP_TIMEOUT",
                "GPU_DIAGNOSTICS_SMI_TIMEOUT",
                "LOG_LEVEL",
            ]).map(|k| {
                // Map environment variable names to struct field names
                match k.as_str().to_ascii_uppercase().as_str() {
                    "GPU_DIAGNOSTICS_OUTPUT" => "output_path".into(),
                    "RUNPOD_API_URL" => "api_url".into(),
                    "GPU_DIAGNOSTICS_SMI_COMMAND" => "smi_command".into(),
                    "GPU_DIAGNOSTICS_LOOKUP_TIMEOUT" => "lookup_timeout".into(),
                    "GPU_DIAGNOSTICS_SMI_TIMEOUT" => "smi_timeout".into(),
                    "LOG_LEVEL" => "log_level".into(),
                    _ => k.into(),
                }
            }))
            .extract()
    }
}

/// Duration parser configured to handle various time units with seconds as default
///
/// Supports seconds (default unit), milliseconds and minutes. Fractions, exponents and
/// infinity are rejected. Multiple units are summed ("1m 30s" = 90 seconds).
const DURATION_PARSER: DurationParser<'static> = DurationParser::builder()
    .time_units(&[TimeUnit::Second, TimeUnit::MilliSecond, TimeUnit::Minute])
    .parse_multiple(None)
    .allow_time_unit_delimiter()
    .disable_infinity()
    .disable_fraction()
    .disable_exponent()
    .default_unit(TimeUnit::Second)
    .build();

/// Deserialize a duration from either a number of seconds or a duration string
///
/// - `5` -> 5 seconds
/// - `"30s"` -> 30 seconds
/// - `"2 m"` -> 2 minutes
/// - `"1500ms"` -> 1.5 seconds
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Visitor;

    struct DurationVisitor;

    impl<'de> Visitor<'de> for DurationVisitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a duration string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            DURATION_PARSER.parse(value)
                .map_err(|e| {
                    serde::de::Error::custom(format!(
                        "Invalid duration format '{}': {}. Examples: '5' (5 seconds), '1500ms', '30s', '2m'",
                        value, e
                    ))
                })?
                .try_into()
                .map_err(|e| serde::de::Error::custom(format!("Duration conversion error: {}", e)))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Duration::from_secs(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if value < 0 {
                return Err(serde::de::Error::custom("Duration cannot be negative"));
            }
            Ok(Duration::from_secs(value as u64))
        }
    }

    deserializer.deserialize_any(DurationVisitor)
}
