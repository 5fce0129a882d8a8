use anyhow::Context;
use clap::Parser;
use gpudiag::app::App;
use gpudiag::cli::Args;
use gpudiag::environment::Environment;
use gpudiag::runtime::default_runtime;
use gpudiag_common::config::Config;
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(output) = args.output {
        config.output_path = output;
    }

    if let Err(e) = gpudiag_common::logging::setup_logging(&config, args.tracing.into()) {
        eprintln!("Failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        output = %config.output_path.display(),
        smi_command = %config.smi_command,
        "starting gpudiag"
    );

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = ?e, "diagnostics run failed");
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    println!("RunPod GPU Diagnostics Tool");

    let app = App::new(config, Environment::from_env(), default_runtime());
    app.run()
        .await
        .with_context(|| format!("Failed to save {}", app.config().output_path.display()))?;

    Ok(())
}
