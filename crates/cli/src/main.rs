//! cosup - upload a directory tree to Tencent COS
//!
//! A command-line uploader for COS and other S3-compatible object storage.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cosup::commands::{self, Cli};
use cosup::exit_code::ExitCode;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so --json output on stdout stays parseable
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let exit_code = tokio::select! {
        code = commands::execute(cli) => code,
        Ok(()) = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, uploads still in flight were abandoned");
            ExitCode::Interrupted
        }
    };

    std::process::exit(exit_code.as_i32());
}
