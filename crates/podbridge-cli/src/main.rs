use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod dispatch;

#[derive(Parser)]
#[command(name = "podbridge")]
#[command(about = "Run Kubernetes pods as ECS Fargate tasks", long_about = None)]
struct Cli {
    /// Provider config file (TOML or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    node: NodeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
pub struct NodeArgs {
    /// Virtual node name
    #[arg(long, global = true, default_value = "podbridge")]
    pub node_name: String,

    /// Operating system reported for the node
    #[arg(long, global = true, default_value = "Linux")]
    pub operating_system: String,

    /// Internal IP reported for the node
    #[arg(long, global = true, default_value = "127.0.0.1")]
    pub internal_ip: String,

    /// Daemon endpoint port reported for the node
    #[arg(long, global = true, default_value = "10250")]
    pub daemon_port: u16,
}

#[derive(Subcommand)]
enum Commands {
    /// List pods running as tasks
    Pods {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Launch a pod from a manifest
    Create {
        /// Pod manifest (YAML or JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Stop a pod's task
    Delete {
        /// Pod as namespace/name (namespace defaults to "default")
        pod: String,
    },

    /// Show pod status
    Status {
        /// Pod as namespace/name
        pod: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show container logs
    Logs {
        /// Pod as namespace/name
        pod: String,

        /// Container name
        container: String,

        /// Number of lines to show (0 = as many as available)
        #[arg(short, long, default_value = "50")]
        tail: usize,
    },

    /// Wait until a pod reaches a phase, finishes or disappears
    Wait {
        /// Pod as namespace/name
        pod: String,

        /// Phase to wait for
        #[arg(short, long, default_value = "Running")]
        phase: String,

        /// Give up after this many seconds
        #[arg(short, long, default_value = "300")]
        timeout: u64,

        /// Seconds between polls
        #[arg(short, long, default_value = "3")]
        interval: u64,
    },

    /// Show the virtual node's metadata and capacity
    Node {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = dispatch::load_config(cli.config.as_deref())?;

    use Commands::*;

    match cli.command {
        Node { json } => {
            let provider = dispatch::build_provider(config, &cli.node)?;
            commands::node::run(&provider, json)?;
        }
        Pods { json } => {
            let provider = dispatch::create_provider(config, &cli.node).await?;
            commands::pods::run(&provider, json).await?;
        }
        Create { file } => {
            let provider = dispatch::create_provider(config, &cli.node).await?;
            commands::create::run(&provider, &file).await?;
        }
        Delete { pod } => {
            let provider = dispatch::create_provider(config, &cli.node).await?;
            commands::delete::run(&provider, &pod).await?;
        }
        Status { pod, json } => {
            let provider = dispatch::create_provider(config, &cli.node).await?;
            commands::status::run(&provider, &pod, json).await?;
        }
        Logs { pod, container, tail } => {
            let provider = dispatch::create_provider(config, &cli.node).await?;
            commands::logs::run(&provider, &pod, &container, tail).await?;
        }
        Wait {
            pod,
            phase,
            timeout,
            interval,
        } => {
            let provider = dispatch::create_provider(config, &cli.node).await?;
            commands::wait::run(&provider, &pod, &phase, timeout, interval).await?;
        }
    }

    Ok(())
}
