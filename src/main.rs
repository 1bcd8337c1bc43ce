//! Loan Risk - Main Entry Point

use clap::Parser;
use loan_risk::cli::{cmd_schema, cmd_score, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_risk=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train { data, config, output, infer_schema_length } => {
            cmd_train(&data, config.as_deref(), &output, infer_schema_length)?;
        }
        Commands::Score { artifacts, record, json, threshold } => {
            cmd_score(&artifacts, record.as_deref(), json.as_deref(), threshold)?;
        }
        Commands::Schema { artifacts } => {
            cmd_schema(&artifacts)?;
        }
        Commands::Serve { artifacts, host, port } => {
            cmd_serve(&artifacts, host, port).await?;
        }
    }

    Ok(())
}
