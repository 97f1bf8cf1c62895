mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay {
            file,
            sessions,
            config,
        } => commands::replay::run(&file, sessions.as_deref(), config.as_deref()),
        Commands::Sessions { file, stats } => commands::sessions::run(file.as_deref(), stats),
        Commands::Version => commands::version::run(),
    }
}
