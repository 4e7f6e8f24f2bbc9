use anyhow::Result;
use clap::Parser;
use knightfall::cli::{App, Cli, Commands, Config};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Log to stderr so the board on stdout stays readable.
/// `RUST_LOG` wins over the configured level.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A broken config file should not stop `config init` from repairing it
    let (app, config_problem) = match App::new() {
        Ok(app) => (app, None),
        Err(e) => (App::with_config(Config::default()), Some(e)),
    };

    init_tracing(&app.config.log_level);
    if let Some(e) = &config_problem {
        warn!("Using default configuration: {:#}", e);
    }

    match cli.command {
        Commands::Play {
            engine,
            difficulty,
            color,
        } => {
            app.handle_play(engine, difficulty.map(Into::into), color.map(Into::into))
                .await?;
        }
        Commands::Config { command } => app.handle_config(command)?,
        Commands::Difficulties => app.handle_difficulties(),
    }

    Ok(())
}
