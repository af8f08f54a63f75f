//! CLI entrypoint for the Nora backend.

#[path = "nora-server/cli.rs"]
mod cli;
#[path = "nora-server/run.rs"]
mod run;

use clap::Parser;

use cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if let Err(err) = run::run(&cli) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
