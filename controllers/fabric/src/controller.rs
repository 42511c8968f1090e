//! Main controller implementation.
//!
//! Wires the Kubernetes API handles, the in-memory IPAM and the northbound
//! client together, and drives the bring-up sequence followed by the
//! one-shot schema migrations.

use std::sync::Arc;

use crds::{HtbQos, Subnet, Vlan, Vpc, IP, ProviderNetwork};
use ipam::Ipam;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{Api, Client};
use ovn_client::{OvnNbClient, OvnNbClientTrait};
use tracing::info;

use crate::config::Config;
use crate::error::ControllerError;

/// The fabric control plane.
pub struct Controller {
    pub(crate) config: Config,
    pub(crate) client: Client,
    pub(crate) ipam: Ipam,
    pub(crate) ovn: Arc<dyn OvnNbClientTrait>,
    pub(crate) subnets: Api<Subnet>,
    pub(crate) vpcs: Api<Vpc>,
    pub(crate) vlans: Api<Vlan>,
    pub(crate) provider_networks: Api<ProviderNetwork>,
    pub(crate) ips: Api<IP>,
    pub(crate) htb_qoses: Api<HtbQos>,
    pub(crate) pods: Api<Pod>,
    pub(crate) nodes: Api<Node>,
}

impl Controller {
    /// Creates a new controller instance against the in-cluster API server
    /// and the configured northbound gateway.
    pub async fn new(config: Config) -> Result<Self, ControllerError> {
        info!("Initializing fabric controller");

        let client = Client::try_default().await?;
        let ovn = OvnNbClient::new(config.ovn_nb_url.clone())?;

        Ok(Self::with_clients(config, client, Arc::new(ovn)))
    }

    /// Assembles a controller from pre-built clients. Tests use this with a
    /// mock northbound client.
    pub fn with_clients(
        config: Config,
        client: Client,
        ovn: Arc<dyn OvnNbClientTrait>,
    ) -> Self {
        let subnets: Api<Subnet> = Api::all(client.clone());
        let vpcs: Api<Vpc> = Api::all(client.clone());
        let vlans: Api<Vlan> = Api::all(client.clone());
        let provider_networks: Api<ProviderNetwork> = Api::all(client.clone());
        let ips: Api<IP> = Api::all(client.clone());
        let htb_qoses: Api<HtbQos> = Api::all(client.clone());
        let pods: Api<Pod> = Api::all(client.clone());
        let nodes: Api<Node> = Api::all(client.clone());

        Self {
            config,
            client,
            ipam: Ipam::new(),
            ovn,
            subnets,
            vpcs,
            vlans,
            provider_networks,
            ips,
            htb_qoses,
            pods,
            nodes,
        }
    }

    /// Runs one leadership term's worth of work: the idempotent bring-up
    /// sequence, then the one-shot schema migrations.
    pub async fn run(&self) -> Result<(), ControllerError> {
        info!("fabric controller running");
        self.bring_up().await?;
        self.migrate().await?;
        info!("bring-up and migration complete");
        Ok(())
    }
}
