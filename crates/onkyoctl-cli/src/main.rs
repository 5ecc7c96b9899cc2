//! onkyoctl — control Onkyo A/V receivers over eISCP
//!
//! ```text
//! onkyoctl power on volume 23     # send commands (implicit `do`)
//! onkyoctl status power volume    # query and print replies
//! onkyoctl watch                  # print incoming messages until Ctrl-C
//! ```

mod config;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

use onkyoctl_client::{Device, DeviceConfig};

/// How long `status` waits for all replies.
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Status items queried when none are given.
const DEFAULT_STATUS: &[&str] = &["power", "volume", "mute", "speaker-a", "speaker-b", "input"];

/// Control Onkyo A/V receivers over eISCP.
#[derive(Parser)]
#[command(name = "onkyoctl", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Hostname or IP address of the receiver
    #[arg(long, global = true)]
    host: Option<String>,

    /// Port number
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Path to the configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Commands to send, pairs of <name> <value> (shorthand for `do`)
    #[arg(trailing_var_arg = true)]
    pairs: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a sequence of friendly commands
    Do {
        /// Pairs of <name> <value>, e.g. `power on volume up`
        #[arg(required = true)]
        pairs: Vec<String>,
    },

    /// Query device status
    Status {
        /// Status items to query; defaults to a common set
        names: Vec<String>,
    },

    /// Watch incoming status messages until interrupted
    Watch,

    /// Print version
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(command) => command,
        None if !cli.pairs.is_empty() => Commands::Do { pairs: cli.pairs },
        None => bail!("no command given; see `onkyoctl --help`"),
    };

    if let Commands::Version = command {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    setup_logging(cli.verbose)?;

    let device = build_device(cli.host, cli.port, cli.config)?;
    device
        .start()
        .await
        .with_context(|| format!("failed to connect to {}", device.host()))?;

    let result = match command {
        Commands::Do { pairs } => run_do(&device, &pairs).await,
        Commands::Status { names } => run_status(&device, &names).await,
        Commands::Watch => run_watch(&device).await,
        Commands::Version => Ok(()),
    };

    device.stop().await;
    result
}

fn setup_logging(verbose: bool) -> Result<()> {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .context("failed to parse log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

fn build_device(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<PathBuf>,
) -> Result<Device> {
    let explicit = config_path.is_some();
    let path = config_path.or_else(config::default_path);

    let mut file = config::FileConfig::default();
    if let Some(path) = path {
        if path.exists() {
            file = config::load(&path)?;
        } else if explicit {
            bail!("config file not found: {}", path.display());
        }
    }

    let host = host.or(file.host).unwrap_or_default();
    if host.is_empty() {
        bail!("no host configured; use --host or the config file");
    }

    let mut device_config = DeviceConfig::new(host)
        .auto_connect(file.auto_connect)
        .allow_reconnect(file.allow_reconnect);
    if let Some(port) = port.or(file.port) {
        device_config = device_config.port(port);
    }
    if let Some(seconds) = file.reconnect_seconds {
        device_config = device_config.reconnect_delay(Duration::from_secs(seconds));
    }
    if let Some(path) = file.command_file {
        device_config = device_config.command_file(path);
    }

    Device::new(device_config).context("invalid configuration")
}

async fn run_do(device: &Device, pairs: &[String]) -> Result<()> {
    if pairs.len() % 2 != 0 {
        bail!("number of arguments must be even");
    }

    for pair in pairs.chunks(2) {
        device
            .send_friendly(&pair[0], pair[1].as_str())
            .await
            .with_context(|| format!("failed to send {} {}", pair[0], pair[1]))?;
    }
    Ok(())
}

async fn run_status(device: &Device, names: &[String]) -> Result<()> {
    let names: Vec<String> = if names.is_empty() {
        DEFAULT_STATUS.iter().map(|name| name.to_string()).collect()
    } else {
        names.to_vec()
    };

    println!("Status [{}]:", device.host().cyan());

    let pending: Arc<Mutex<HashSet<String>>> =
        Arc::new(Mutex::new(names.iter().cloned().collect()));
    let done = Arc::new(Notify::new());
    {
        let pending = pending.clone();
        let done = done.clone();
        device.on_message(move |name, value| {
            println!("{}: {}", name.green(), value);
            let mut pending = pending.lock();
            // duplicate replies for the same item are fine
            if pending.remove(name) && pending.is_empty() {
                done.notify_one();
            }
        });
    }

    for name in &names {
        device
            .query(name)
            .await
            .with_context(|| format!("failed to query {name}"))?;
    }

    if tokio::time::timeout(STATUS_TIMEOUT, done.notified())
        .await
        .is_err()
    {
        bail!("timeout waiting for response");
    }
    Ok(())
}

async fn run_watch(device: &Device) -> Result<()> {
    device.on_message(|name, value| {
        println!("{}: {}", name.green(), value);
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    Ok(())
}
