use std::env;
use std::io;

use pitwall::cli;
use tracing_subscriber::EnvFilter;

fn main() {
    // stdout carries JSON/CSV output; logs go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pitwall=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    std::process::exit(cli::run_with_args(&args));
}
