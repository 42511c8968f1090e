//! Fabric Controller
//!
//! Control plane of the Kubernetes network fabric. On each leadership term
//! it brings the logical network to a known-good baseline (cluster router,
//! default switches, VPC, QoS tiers), rebuilds the in-memory IPAM from the
//! authoritative cluster records, repairs drifted switch-port metadata and
//! runs the one-shot schema migrations.

mod config;
mod controller;
mod error;
mod helpers;
mod init;
mod migrate;

use crate::config::Config;
use crate::controller::Controller;
use crate::error::ControllerError;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting fabric controller");

    let config = Config::from_env()?;
    info!("Configuration:");
    info!("  northbound gateway: {}", config.ovn_nb_url);
    info!("  cluster router: {}", config.cluster_router);
    info!("  node switch: {} ({})", config.node_switch, config.node_switch_cidr);
    info!(
        "  default switch: {} ({})",
        config.default_logical_switch, config.default_cidr
    );

    let controller = Controller::new(config).await?;
    controller.run().await?;

    Ok(())
}
