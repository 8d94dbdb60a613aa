use clap::Parser;

use ui5_watch::Settings;
use ui5_watch::cli::{Cli, Commands, commands};
use ui5_watch::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            eprintln!("Using default configuration");
            Settings::default()
        }
    };

    let mut logging_config = config.logging.clone();
    if cli.verbose {
        logging_config.default = "debug".to_string();
    }
    logging::init_with_config(&logging_config);

    match cli.command {
        Commands::Init { force } => commands::init::run_init(force),
        Commands::Config => commands::init::run_config(&config),
        Commands::Scan { path, json } => commands::scan::run(&config, path, json).await,
        Commands::Watch { path, json } => commands::watch::run(config, path, json).await,
    }
}
