use clap::Parser;
use meanrev::cli::{run, Cli};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> std::process::ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("meanrev=info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    run(Cli::parse())
}
