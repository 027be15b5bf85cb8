//! fivegc - 5G core control plane simulator
//!
//! Runs the AMF, AUSF, UDM, SMF, UPF and PCF reconcilers over an in-memory
//! store and exposes the store over HTTP.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{key, run::RunArgs};

#[derive(Parser)]
#[command(name = "fivegc")]
#[command(about = "5G core control plane simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control plane and its API (default)
    Run(RunArgs),

    /// Write a fresh hex ed25519 signing key
    GenerateKey {
        /// Destination file
        #[arg(short, long)]
        out: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::GenerateKey { out }) => key::generate(&out),
        Some(Commands::Run(args)) => commands::run::run(cli.config.as_deref(), &args).await,
        None => commands::run::run(cli.config.as_deref(), &RunArgs::default()).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_runs() {
        let cli = Cli::try_parse_from(["fivegc", "-v"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.verbose);
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "fivegc",
            "run",
            "--addr",
            "0.0.0.0",
            "--port",
            "9000",
            "--http",
            "--config",
            "fivegc.toml",
        ])
        .unwrap();
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.addr.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(9000));
        assert!(args.http);
        assert_eq!(cli.config, Some(PathBuf::from("fivegc.toml")));
    }

    #[test]
    fn generate_key_needs_out() {
        assert!(Cli::try_parse_from(["fivegc", "generate-key"]).is_err());
    }
}
