use anyhow::Result;
use orghours::cli::Cli;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // stdout carries the aggregate JSON, so diagnostics go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    cli.execute()
}
