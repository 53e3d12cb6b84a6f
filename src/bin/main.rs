/// rhythm-connectors CLI
///
/// Binds API description documents the same way an engine would and prints
/// the resulting function signatures and request metadata.
use clap::Parser;
use rhythm_connectors::cli::{self, Cli};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = Cli::parse();

    let config = match cli::load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = cli::run_cli_with_config(args, &config) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
