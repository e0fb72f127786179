//! netdra node daemon
//!
//! Main entry point for netdrad.

use anyhow::Context;
use clap::{Parser, Subcommand};
use netdrad::{apply_file, discover, DaemonConfig, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Node-local network device driver
#[derive(Parser, Debug)]
#[command(name = "netdrad")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Daemon configuration file (TOML)
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Discover local devices and print their attributes as JSON
    Discover,

    /// Apply a network config to a device inside a network namespace
    Apply {
        /// Network namespace path (e.g. /var/run/netns/pod1)
        #[arg(long)]
        netns: String,

        /// Interface name inside the namespace
        #[arg(long)]
        device: String,

        /// JSON network config
        #[arg(long)]
        file: PathBuf,
    },
}

/// Logs go to stderr so `discover` output on stdout stays parseable.
fn init_logging(log_level: &str, json: bool) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = DaemonConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    config.validate()?;

    match args.command {
        Command::Discover => {
            let devices = discover(&config).await?;
            println!("{}", serde_json::to_string_pretty(&devices)?);
        }
        Command::Apply {
            netns,
            device,
            file,
        } => {
            apply_file(&netns, &device, &file)
                .await
                .with_context(|| format!("configuring {} in {}", device, netns))?;
            info!(netns = %netns, device = %device, "Network config applied");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_json);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
