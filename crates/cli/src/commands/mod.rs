//! CLI definition and execution
//!
//! cosup has a single job, so there are no subcommands: the global output
//! flags and the upload arguments live on one parser.

use clap::Parser;

use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

pub mod upload;

/// cosup - upload a directory tree to Tencent COS
///
/// Walks the source directory and stores every file under the key prefix,
/// creating directory markers for empty directories. With no arguments,
/// everything is read from the environment (COS_SECRET_ID, COS_SECRET_KEY,
/// COS_BUCKET, COS_REGION).
#[derive(Parser, Debug)]
#[command(name = "cosup")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(flatten)]
    pub upload: upload::UploadArgs,
}

impl Cli {
    /// Log filter used when RUST_LOG is not set
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn,cosup=info,cosup_core=info,cosup_s3=info"
        }
    }
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        quiet: cli.quiet,
    };

    upload::execute(cli.upload, output_config).await
}
