//! pado-devnet binary: in-memory gateway

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pado_devnet::{metrics, DevnetConfig, ServerBuilder};

#[derive(Parser, Debug)]
#[command(name = "pado-devnet")]
#[command(about = "In-memory gateway for local development")]
struct Args {
    /// Devnet config file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "3000")]
    port: u16,

    /// Number of worker nodes, overrides the config file
    #[arg(long)]
    nodes: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("pado_devnet=info".parse()?))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DevnetConfig::load(path)?,
        None => DevnetConfig::default(),
    };
    if let Some(nodes) = args.nodes {
        config.node_count = nodes;
    }

    tracing::info!(
        nodes = config.node_count,
        tasks_process = %config.tasks_process_id,
        aocred_process = %config.aocred_process_id,
        war_process = %config.war_process_id,
        "Devnet config"
    );

    let handle = metrics::init_prometheus_recorder()?;
    let server = ServerBuilder::new(config)
        .port(args.port)
        .prometheus(handle)
        .build();

    tracing::info!("Devnet ready on port {}", args.port);
    server.run().await?;

    Ok(())
}
