//! Suasion CLI entry point.
//!
//! Binary name: `suasion`
//!
//! Loads the study configuration, wires the engine against the infra
//! adapters, and runs the interactive chat loop.

mod chat;

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "suasion", about = "Research-study persuasive-dialogue chat client")]
struct Cli {
    /// Directory holding config.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Override the model from config.toml
    #[arg(long)]
    model: Option<String>,

    /// Export spans via OpenTelemetry (stdout exporter)
    #[arg(long)]
    otel: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    suasion_observe::tracing_setup::init_tracing(cli.otel)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let mut config = suasion_infra::config::load_study_config(&cli.config_dir).await;
    if let Some(model) = cli.model {
        config.model = model;
    }

    let result = chat::run(config).await;
    suasion_observe::tracing_setup::shutdown_tracing();
    result
}
