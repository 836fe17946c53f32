//! loadcast command-line entry point

use clap::Parser;
use loadcast::cli::{cmd_config, cmd_evaluate, cmd_features, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loadcast=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate { data, config, model, epochs, holdout, json } => {
            cmd_evaluate(&data, config.as_deref(), model, epochs, holdout, json)?;
        }
        Commands::Features { data, config } => {
            cmd_features(&data, config.as_deref())?;
        }
        Commands::Config => cmd_config()?,
    }

    Ok(())
}
