// Entrypoint for the CLI application.
// - Keeps `main` small: set up logging, parse arguments and hand over to `cli::run`.
// - Logs go to stderr so they never fight with the progress indicator on stdout.

use clap::Parser;
use esdoc_uploader::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if !run(cli)? {
        std::process::exit(1);
    }
    Ok(())
}
