//! Proxify command line entry point
//!
//! Assembles a pipeline from a TOML file using the built-in interceptors and
//! either reports the resulting chain or runs one invocation through it.

use clap::{Parser, Subcommand};
use proxify::chain::ChainBuilder;
use proxify::config::PipelineConfig;
use proxify::driver::{InvocationOutcome, Invoker, Target};
use proxify::interceptor::builtin::builtin_registry;
use proxify::invocation::InvocationContext;
use proxify::observability::{init_default_logging, metrics};
use proxify::targets::{EchoTarget, FailingTarget};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::{error, info};

/// Bidirectional interceptor pipeline
#[derive(Parser)]
#[command(name = "proxify")]
#[command(about = "Assemble and exercise an interceptor pipeline")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", env = "PROXIFY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration and print the assembled stage order
    Check,
    /// Run one invocation through the pipeline against an echo target
    Run {
        /// Request payload as JSON
        #[arg(long, default_value = "null")]
        input: String,

        /// Use a target that always fails
        #[arg(long)]
        fail_target: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_default_logging();

    info!("Starting proxify v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_configuration(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Check => check_pipeline(&config),
        Commands::Run { input, fail_target } => run_pipeline(&config, &input, fail_target).await,
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            error!("Command failed: {}", e);
            process::exit(1);
        }
    }
}

fn load_configuration(
    config_path: &Option<PathBuf>,
) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Ok(PipelineConfig::load_from_file(path)?)
        }
        None => {
            // Try default locations
            let default_paths = ["pipeline.toml", "config/pipeline.toml"];

            for path_str in default_paths {
                let path = PathBuf::from(path_str);
                if path.exists() {
                    info!("Loading configuration from: {}", path.display());
                    return Ok(PipelineConfig::load_from_file(&path)?);
                }
            }

            Err("No configuration file found. Provide one with -c/--config or create pipeline.toml".into())
        }
    }
}

fn check_pipeline(config: &PipelineConfig) -> Result<bool, Box<dyn std::error::Error>> {
    let registry = builtin_registry()?;
    let chain = ChainBuilder::new(&registry).build(config)?;

    let report = json!({
        "pipeline": config.pipeline.name,
        "description": config.pipeline.description,
        "stages": chain.stage_names(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(true)
}

async fn run_pipeline(
    config: &PipelineConfig,
    input: &str,
    fail_target: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let input: Value = serde_json::from_str(input)?;
    let registry = builtin_registry()?;
    let chain = Arc::new(ChainBuilder::new(&registry).build(config)?);

    let target: Arc<dyn Target> = if fail_target {
        Arc::new(FailingTarget::default())
    } else {
        Arc::new(EchoTarget)
    };

    let outcome = Invoker::new(chain, target)
        .invoke(InvocationContext::new(input))
        .await?;

    println!("{}", serde_json::to_string_pretty(&render_outcome(&outcome))?);
    Ok(!outcome.is_faulted())
}

fn render_outcome(outcome: &InvocationOutcome) -> Value {
    json!({
        "invocation_id": outcome.context.id(),
        "interaction": outcome.context.interaction(),
        "status": outcome.status,
        "output": outcome.context.output,
        "attributes": outcome.context.attributes,
        "fault": outcome.fault().map(|f| f.report()),
        "metrics": metrics().snapshot(),
    })
}
