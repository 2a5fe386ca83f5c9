mod commands;

use clap::{Parser, Subcommand};
use slipway_models::Config;
use tracing::warn;

#[derive(Parser)]
#[command(name = "slipway", about = "Build and launch containerized ASGI services")]
#[command(version)]
struct Cli {
    /// Config file; falls back to slipway.toml, then configs/default.toml,
    /// then built-in defaults.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an image from a source tree
    Build {
        /// Source root (defaults to the current directory)
        path: Option<String>,
    },
    /// Launch a container from a built image
    Run {
        /// Image reference to run
        image: String,
        /// Host port to publish 8000 on (ephemeral if omitted)
        #[arg(long)]
        host_port: Option<u16>,
    },
    /// Build, then launch
    Up {
        /// Source root (defaults to the current directory)
        path: Option<String>,
        /// Host port to publish 8000 on (ephemeral if omitted)
        #[arg(long)]
        host_port: Option<u16>,
    },
    /// Write the rendered Dockerfile into the source tree for manual editing
    Eject {
        /// Source root (defaults to the current directory)
        path: Option<String>,
    },
    /// Print a container's log output
    Logs {
        /// Container ID
        container: String,
    },
    /// Stop a running container (grace period from config)
    Stop {
        /// Container ID
        container: String,
    },
    /// Force-remove a container
    Rm {
        /// Container ID
        container: String,
    },
    /// List containers launched by slipway
    Ps,
}

/// Check if Docker is running and accessible
async fn is_docker_running() -> bool {
    match tokio::process::Command::new("docker")
        .args(["version", "--format", "{{.Server.Version}}"])
        .output()
        .await
    {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

fn load_config(explicit: Option<&str>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return Ok(Config::load(path)?);
    }
    match Config::load_first(&["slipway.toml", "configs/default.toml"])? {
        Some(config) => Ok(config),
        None => {
            warn!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    // Container commands talk to the engine socket up front; build and eject
    // surface their own failures.
    let needs_engine = matches!(
        cli.command,
        Commands::Run { .. }
            | Commands::Up { .. }
            | Commands::Logs { .. }
            | Commands::Stop { .. }
            | Commands::Rm { .. }
            | Commands::Ps
    );
    if needs_engine && !is_docker_running().await {
        anyhow::bail!("Docker is not running or not accessible");
    }

    match cli.command {
        Commands::Build { path } => commands::build(&config, path.as_deref()).await,
        Commands::Run { image, host_port } => {
            commands::run(&config, &image, host_port).await
        }
        Commands::Up { path, host_port } => {
            commands::up(&config, path.as_deref(), host_port).await
        }
        Commands::Eject { path } => commands::eject(&config, path.as_deref()),
        Commands::Logs { container } => commands::logs(&config, &container).await,
        Commands::Stop { container } => commands::stop(&config, &container).await,
        Commands::Rm { container } => commands::rm(&config, &container).await,
        Commands::Ps => commands::ps(&config).await,
    }
}
