//! caretrain - Main Entry Point

use clap::Parser;
use caretrain::cli::{cmd_compare, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "caretrain=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            data,
            target,
            grain,
            task,
            algorithm,
            no_impute,
            drop,
            config,
            output,
        } => {
            cmd_train(
                &data,
                &target,
                grain.as_deref(),
                &task,
                &algorithm,
                !no_impute,
                &drop,
                config.as_deref(),
                &output,
            )?;
        }
        Commands::Predict {
            model,
            data,
            factors,
            catalyst,
            output,
        } => {
            cmd_predict(&model, &data, factors, catalyst, output.as_deref())?;
        }
        Commands::Compare { model } => {
            cmd_compare(&model)?;
        }
    }

    Ok(())
}
