//! Bring-up driver
//!
//! Brings the logical network to a known-good baseline once per leadership
//! term: cluster router, default VLAN/provider network, node and default
//! switches, QoS tiers, default VPC, then the IPAM rebuild from the
//! authoritative records, node route migration and chassis tagging.
//!
//! Every step is idempotent, so a cancelled or partially failed run is
//! repaired by the next one. Steps before the IPAM rebuild are fatal on
//! failure; the rebuild and everything after recover per item.

use std::collections::{HashMap, HashSet};

use kube::api::{DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Api, ResourceExt};
use tracing::{error, info};

use crds::{
    GatewayType, HtbQos, HtbQosSpec, ProviderNetwork, ProviderNetworkSpec, Subnet, SubnetProtocol,
    SubnetSpec, Vlan, VlanSpec, Vpc, VpcSpec, VpcStatus,
};
use ipam::util as iputil;
use ipam::Protocol;
use k8s_openapi::api::core::v1::Pod;
use ovn_client::{OvnError, OvnNbClientTrait};

use crate::controller::Controller;
use crate::error::ControllerError;
use crate::helpers::*;

/// Lists routers and creates the named one only when absent.
pub(crate) async fn ensure_cluster_router(
    ovn: &dyn OvnNbClientTrait,
    name: &str,
) -> Result<(), OvnError> {
    let routers = ovn.list_logical_routers().await?;
    info!(
        "existing routers: {:?}",
        routers.iter().map(|r| r.name.as_str()).collect::<Vec<_>>()
    );
    if routers.iter().any(|r| r.name == name) {
        return Ok(());
    }
    ovn.create_logical_router(name).await
}

/// Replaces the obsolete per-node static route with an address-set-guarded
/// reroute policy: traffic to the node IP that does not originate from the
/// node's own underlay CIDRs is sent via its join address.
pub(crate) async fn migrate_node_route(
    ovn: &dyn OvnNbClientTrait,
    router: &str,
    af: u8,
    node: &str,
    ip: &str,
    nexthop: &str,
    cidrs: &[String],
) -> Result<(), OvnError> {
    ovn.delete_logical_router_static_route(router, None, ip, "").await?;

    let as_name = node_underlay_address_set_name(node, af);
    ovn.create_address_set(&as_name, None).await?;
    ovn.address_set_update_address(&as_name, cidrs).await?;

    let match_rule = format!("ip{}.dst == {} && ip{}.src != ${}", af, ip, af, as_name);
    ovn.add_logical_router_policy(
        router,
        NODE_ROUTER_POLICY_PRIORITY,
        &match_rule,
        "reroute",
        nexthop,
        None,
    )
    .await
}

/// External-ID repairs for one port: vendor (and owner pod) when the vendor
/// tag is missing, and the owning switch recovered by reverse UUID lookup
/// when the switch tag is missing. Empty result means nothing to repair.
pub(crate) fn build_lsp_repair(
    port_name: &str,
    pod_key: Option<&str>,
    lsp_without_vendor: &HashSet<String>,
    lsp_without_ls: &HashMap<String, String>,
    ls_ports_map: &HashMap<String, HashSet<String>>,
) -> HashMap<String, String> {
    let mut external_ids = HashMap::new();
    if lsp_without_vendor.contains(port_name) {
        external_ids.insert(VENDOR_EXTERNAL_ID_KEY.to_string(), CNI_VENDOR.to_string());
        if let Some(pod) = pod_key {
            external_ids.insert(POD_EXTERNAL_ID_KEY.to_string(), pod.to_string());
        }
    }
    if let Some(uuid) = lsp_without_ls.get(port_name) {
        if let Some(ls) = ls_ports_map
            .iter()
            .find(|(_, ports)| ports.contains(uuid))
            .map(|(ls, _)| ls)
        {
            external_ids.insert(LOGICAL_SWITCH_EXTERNAL_ID_KEY.to_string(), ls.clone());
        }
    }
    external_ids
}

impl Controller {
    /// The bring-up sequence. Order matters: later steps depend on the
    /// earlier ones.
    pub(crate) async fn bring_up(&self) -> Result<(), ControllerError> {
        if let Err(e) = self.init_cluster_router().await {
            error!("init cluster router failed: {}", e);
            return Err(e);
        }
        if let Err(e) = self.init_default_vlan().await {
            error!("init default vlan failed: {}", e);
            return Err(e);
        }
        if let Err(e) = self.init_node_switch().await {
            error!("init node switch failed: {}", e);
            return Err(e);
        }
        if let Err(e) = self.init_default_logical_switch().await {
            error!("init default switch failed: {}", e);
            return Err(e);
        }
        if let Err(e) = self.init_htb_qos().await {
            error!("init default qos failed: {}", e);
            return Err(e);
        }
        self.init_default_vpc().await?;
        self.init_ipam().await?;
        self.init_node_routes().await?;
        self.init_node_chassis().await?;
        Ok(())
    }

    async fn init_cluster_router(&self) -> Result<(), ControllerError> {
        ensure_cluster_router(self.ovn.as_ref(), &self.config.cluster_router)
            .await
            .map_err(Into::into)
    }

    async fn init_default_provider_network(&self) -> Result<(), ControllerError> {
        match self.provider_networks.get(&self.config.default_provider_name).await {
            Ok(_) => return Ok(()),
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                error!(
                    "failed to get default provider network {}: {}",
                    self.config.default_provider_name, e
                );
                return Err(e.into());
            }
        }
        let pn = ProviderNetwork::new(
            &self.config.default_provider_name,
            ProviderNetworkSpec {
                default_interface: self.config.default_host_interface.clone(),
            },
        );
        self.provider_networks.create(&PostParams::default(), &pn).await?;
        Ok(())
    }

    async fn init_default_vlan(&self) -> Result<(), ControllerError> {
        if self.config.network_type != crate::config::NetworkType::Vlan {
            return Ok(());
        }

        self.init_default_provider_network().await?;

        match self.vlans.get(&self.config.default_vlan_name).await {
            Ok(_) => return Ok(()),
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                error!("get default vlan {} failed: {}", self.config.default_vlan_name, e);
                return Err(e.into());
            }
        }

        if !is_valid_vlan_id(self.config.default_vlan_id) {
            return Err(ControllerError::InvalidConfig(
                "the default vlan id is not between 1-4095".to_string(),
            ));
        }

        let vlan = Vlan::new(
            &self.config.default_vlan_name,
            VlanSpec {
                id: self.config.default_vlan_id,
                provider: self.config.default_provider_name.clone(),
                vlan_id: 0,
                provider_interface_name: String::new(),
            },
        );
        self.vlans.create(&PostParams::default(), &vlan).await?;
        Ok(())
    }

    /// Applies the single-stack to dual-stack upgrade to an existing subnet
    /// record when the configured CIDR has grown a second family.
    async fn upgrade_subnet_cidr(
        &self,
        subnet: &Subnet,
        configured_cidr: &str,
    ) -> Result<(), ControllerError> {
        let configured = iputil::check_protocol(configured_cidr)?;
        let existing = iputil::check_protocol(&subnet.spec.cidr_block)?;
        if configured == existing || configured != Protocol::Dual {
            return Ok(());
        }
        let name = subnet.name_any();
        info!("upgrading subnet {} to dual-stack cidr {}", name, configured_cidr);
        let mut updated = subnet.clone();
        updated.spec.cidr_block = configured_cidr.to_string();
        updated.spec.protocol = SubnetProtocol::Dual;
        self.subnets.replace(&name, &PostParams::default(), &updated).await?;
        Ok(())
    }

    async fn init_node_switch(&self) -> Result<(), ControllerError> {
        match self.subnets.get(&self.config.node_switch).await {
            Ok(subnet) => {
                return self.upgrade_subnet_cidr(&subnet, &self.config.node_switch_cidr).await;
            }
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                error!("get node subnet {} failed: {}", self.config.node_switch, e);
                return Err(e.into());
            }
        }

        let subnet = Subnet::new(
            &self.config.node_switch,
            SubnetSpec {
                vpc: DEFAULT_VPC.to_string(),
                default: false,
                provider: DEFAULT_PROVIDER.to_string(),
                cidr_block: self.config.node_switch_cidr.clone(),
                gateway: self.config.node_switch_gateway.clone(),
                disable_gateway_check: false,
                exclude_ips: self
                    .config
                    .node_switch_gateway
                    .split(',')
                    .map(str::to_string)
                    .collect(),
                nat_outgoing: false,
                gateway_type: GatewayType::Distributed,
                protocol: crd_protocol(&self.config.node_switch_cidr)?,
                vlan: None,
                logical_gateway: false,
                disable_inter_connection: true,
            },
        );
        self.subnets.create(&PostParams::default(), &subnet).await?;
        Ok(())
    }

    async fn init_default_logical_switch(&self) -> Result<(), ControllerError> {
        match self.subnets.get(&self.config.default_logical_switch).await {
            Ok(subnet) => {
                return self.upgrade_subnet_cidr(&subnet, &self.config.default_cidr).await;
            }
            Err(e) if is_not_found(&e) => {}
            Err(e) => {
                error!(
                    "get default subnet {} failed: {}",
                    self.config.default_logical_switch, e
                );
                return Err(e.into());
            }
        }

        let vlan_mode = self.config.network_type == crate::config::NetworkType::Vlan;
        let subnet = Subnet::new(
            &self.config.default_logical_switch,
            SubnetSpec {
                vpc: DEFAULT_VPC.to_string(),
                default: true,
                provider: DEFAULT_PROVIDER.to_string(),
                cidr_block: self.config.default_cidr.clone(),
                gateway: self.config.default_gateway.clone(),
                disable_gateway_check: !self.config.default_gateway_check,
                exclude_ips: self
                    .config
                    .default_exclude_ips
                    .split(',')
                    .map(str::to_string)
                    .collect(),
                nat_outgoing: true,
                gateway_type: GatewayType::Distributed,
                protocol: crd_protocol(&self.config.default_cidr)?,
                vlan: vlan_mode.then(|| self.config.default_vlan_name.clone()),
                logical_gateway: vlan_mode && self.config.default_logical_gateway,
                disable_inter_connection: false,
            },
        );
        self.subnets.create(&PostParams::default(), &subnet).await?;
        Ok(())
    }

    async fn init_htb_qos(&self) -> Result<(), ControllerError> {
        let mut last_err = None;
        for (name, priority) in [("htb-high", "100"), ("htb-medium", "200"), ("htb-low", "300")] {
            match self.htb_qoses.get(name).await {
                Ok(_) => continue,
                Err(e) if is_not_found(&e) => {}
                Err(e) => {
                    error!("failed to get default htb qos {}: {}", name, e);
                    last_err = Some(e.into());
                    continue;
                }
            }
            let qos = HtbQos::new(name, HtbQosSpec { priority: priority.to_string() });
            if let Err(e) = self.htb_qoses.create(&PostParams::default(), &qos).await {
                error!("create htb qos {} failed: {}", name, e);
                last_err = Some(e.into());
            }
        }
        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Creates the default VPC when absent and merge-patches its status with
    /// the default switch and router names.
    pub(crate) async fn init_default_vpc(&self) -> Result<(), ControllerError> {
        let vpc = match self.vpcs.get(DEFAULT_VPC).await {
            Ok(vpc) => vpc,
            Err(e) if is_not_found(&e) => {
                let vpc = Vpc::new(DEFAULT_VPC, VpcSpec::default());
                self.vpcs.create(&PostParams::default(), &vpc).await.map_err(|e| {
                    error!("init default vpc failed: {}", e);
                    e
                })?
            }
            Err(e) => {
                error!("init default vpc failed: {}", e);
                return Err(e.into());
            }
        };

        let status = VpcStatus {
            default_logical_switch: self.config.default_logical_switch.clone(),
            router: self.config.cluster_router.clone(),
            default: true,
            standby: true,
        };
        let patch = serde_json::json!({ "status": status });
        self.vpcs
            .patch_status(&vpc.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| {
                error!("init default vpc failed: {}", e);
                ControllerError::from(e)
            })?;
        Ok(())
    }

    /// Rebuilds the in-memory IPAM from the authoritative records: subnets,
    /// live allocation-annotated pods, IP records and allocated nodes.
    /// Repairs drifted LSP external-IDs along the way.
    pub(crate) async fn init_ipam(&self) -> Result<(), ControllerError> {
        let subnets = self.subnets.list(&ListParams::default()).await.map_err(|e| {
            error!("failed to list subnets: {}", e);
            e
        })?;
        for subnet in &subnets {
            let name = subnet.name_any();
            if let Err(e) =
                self.ipam
                    .add_or_update_subnet(&name, &subnet.spec.cidr_block, &subnet.spec.exclude_ips)
            {
                error!("failed to init subnet {}: {}", name, e);
            }
        }

        let ls_list = self.ovn.list_logical_switches().await.map_err(|e| {
            error!("failed to list logical switches: {}", e);
            e
        })?;
        let ls_ports_map: HashMap<String, HashSet<String>> = ls_list
            .into_iter()
            .map(|ls| (ls.name, ls.ports.into_iter().collect()))
            .collect();

        let lsp_list = self.ovn.list_lsp_with_legacy_external_ids().await.map_err(|e| {
            error!("failed to list logical switch ports: {}", e);
            e
        })?;
        let mut lsp_without_vendor: HashSet<String> = HashSet::with_capacity(lsp_list.len());
        let mut lsp_without_ls: HashMap<String, String> = HashMap::with_capacity(lsp_list.len());
        for lsp in &lsp_list {
            if lsp.external_ids.get(VENDOR_EXTERNAL_ID_KEY).map_or(true, String::is_empty) {
                lsp_without_vendor.insert(lsp.name.clone());
            }
            if lsp
                .external_ids
                .get(LOGICAL_SWITCH_EXTERNAL_ID_KEY)
                .map_or(true, String::is_empty)
            {
                lsp_without_ls.insert(lsp.name.clone(), lsp.uuid.clone());
            }
        }

        let pods = self.pods.list(&ListParams::default()).await.map_err(|e| {
            error!("failed to list pods: {}", e);
            e
        })?;
        for pod in &pods {
            let annotations = pod.annotations();
            if !is_pod_alive(pod)
                || annotations.get(ALLOCATED_ANNOTATION).map(String::as_str) != Some("true")
            {
                continue;
            }
            let pod_name = pod.name_any();
            let namespace = pod.namespace().unwrap_or_default();
            let pod_key = format!("{}/{}", namespace, pod_name);
            for provider in pod_providers(annotations) {
                let port_name = pod_port_name(&pod_name, &namespace, &provider);
                let ip_annot = annotations
                    .get(&provider_annotation(&provider, "ip_address"))
                    .cloned()
                    .unwrap_or_default();
                let mac_annot = annotations.get(&provider_annotation(&provider, "mac_address"));
                let switch_annot = annotations
                    .get(&provider_annotation(&provider, "logical_switch"))
                    .cloned()
                    .unwrap_or_default();
                if let Err(e) = self.ipam.get_static_address(
                    &pod_key,
                    &port_name,
                    &ip_annot,
                    mac_annot.map(String::as_str),
                    &switch_annot,
                    false,
                ) {
                    error!("failed to init pod {} address {}: {}", pod_key, ip_annot, e);
                }

                if is_fabric_provider(&provider) {
                    let external_ids = build_lsp_repair(
                        &port_name,
                        Some(&pod_key),
                        &lsp_without_vendor,
                        &lsp_without_ls,
                        &ls_ports_map,
                    );
                    if !external_ids.is_empty() {
                        if let Err(e) = self.ovn.set_lsp_external_ids(&port_name, &external_ids).await
                        {
                            error!(
                                "failed to append external-ids for logical switch port {}: {}",
                                port_name, e
                            );
                        }
                    }
                }
            }
        }

        let records = self.ips.list(&ListParams::default()).await.map_err(|e| {
            error!("failed to list IP records: {}", e);
            e
        })?;
        for record in &records {
            let record_name = record.name_any();
            let ipam_key = if !record.spec.namespace.is_empty() {
                let pod_api: Api<Pod> = Api::namespaced(self.client.clone(), &record.spec.namespace);
                let pod_key = format!("{}/{}", record.spec.namespace, record.spec.pod_name);
                match pod_api.get(&record.spec.pod_name).await {
                    Err(e) if is_not_found(&e) => {
                        // the pod is gone: retire the record and its addresses
                        match self.ips.delete(&record_name, &DeleteParams::default()).await {
                            Ok(_) => self.ipam.release_address_by_pod(&pod_key),
                            Err(e) => error!("failed to delete IP record {}: {}", record_name, e),
                        }
                        continue;
                    }
                    _ => {}
                }
                pod_key
            } else {
                format!("node-{}", record.spec.pod_name)
            };

            if let Err(e) = self.ipam.get_static_address(
                &ipam_key,
                &record_name,
                &record.spec.ip_address,
                Some(&record.spec.mac_address),
                &record.spec.subnet,
                false,
            ) {
                error!("failed to init IPAM from IP record {}: {}", record_name, e);
            }
            for (i, attach_subnet) in record.spec.attach_subnets.iter().enumerate() {
                if i >= record.spec.attach_ips.len() || i >= record.spec.attach_macs.len() {
                    error!("attachment address list of IP record {} is invalid", record_name);
                    break;
                }
                if let Err(e) = self.ipam.get_static_address(
                    &ipam_key,
                    &record_name,
                    &record.spec.attach_ips[i],
                    Some(&record.spec.attach_macs[i]),
                    attach_subnet,
                    false,
                ) {
                    error!("failed to init IPAM from IP record {}: {}", record_name, e);
                }
            }
        }

        let nodes = self.nodes.list(&ListParams::default()).await.map_err(|e| {
            error!("failed to list nodes: {}", e);
            e
        })?;
        for node in &nodes {
            let annotations = node.annotations();
            if annotations.get(ALLOCATED_ANNOTATION).map(String::as_str) != Some("true") {
                continue;
            }
            let node_name = node.name_any();
            let port_name = node_port_name(&node_name);
            let ip_annot = annotations.get(IP_ADDRESS_ANNOTATION).cloned().unwrap_or_default();
            let mac_annot = annotations.get(MAC_ADDRESS_ANNOTATION);
            let switch_annot = annotations
                .get(LOGICAL_SWITCH_ANNOTATION)
                .cloned()
                .unwrap_or_default();
            if let Err(e) = self.ipam.get_static_address(
                &port_name,
                &port_name,
                &ip_annot,
                mac_annot.map(String::as_str),
                &switch_annot,
                true,
            ) {
                error!("failed to init node {} address {}: {}", node_name, ip_annot, e);
            }

            let external_ids = build_lsp_repair(
                &port_name,
                None,
                &lsp_without_vendor,
                &lsp_without_ls,
                &ls_ports_map,
            );
            if !external_ids.is_empty() {
                if let Err(e) = self.ovn.set_lsp_external_ids(&port_name, &external_ids).await {
                    error!(
                        "failed to append external-ids for logical switch port {}: {}",
                        port_name, e
                    );
                }
            }
        }

        info!("IPAM initialized from {} subnets", subnets.items.len());
        Ok(())
    }

    /// Migrates per-node routing for underlay subnets with a logical
    /// gateway: every node covered by such a subnet gets a reroute policy
    /// via its join address instead of a static route.
    async fn init_node_routes(&self) -> Result<(), ControllerError> {
        let subnets = self.subnets.list(&ListParams::default()).await.map_err(|e| {
            error!("failed to list subnets: {}", e);
            e
        })?;
        let nodes = self.nodes.list(&ListParams::default()).await.map_err(|e| {
            error!("failed to list nodes: {}", e);
            e
        })?;

        for node in &nodes {
            let node_name = node.name_any();
            let (node_v4, node_v6) = node_internal_ip(node);

            let mut v4_cidrs = Vec::new();
            let mut v6_cidrs = Vec::new();
            for subnet in &subnets {
                if subnet.spec.vlan.as_deref().unwrap_or("").is_empty()
                    || !subnet.spec.logical_gateway
                    || subnet.spec.vpc != DEFAULT_VPC
                {
                    continue;
                }
                let (v4, v6) = split_cidr_by_family(&subnet.spec.cidr_block);
                if let (Some(cidr), Some(ip)) = (v4, node_v4.as_deref()) {
                    if iputil::cidr_contains_ip(&cidr, ip) {
                        v4_cidrs.push(cidr);
                    }
                }
                if let (Some(cidr), Some(ip)) = (v6, node_v6.as_deref()) {
                    if iputil::cidr_contains_ip(&cidr, ip) {
                        v6_cidrs.push(cidr);
                    }
                }
            }

            let join = node
                .annotations()
                .get(IP_ADDRESS_ANNOTATION)
                .cloned()
                .unwrap_or_default();
            let (join_v4, join_v6) = iputil::split_string_ip(&join);

            if let (Some(ip), Some(nexthop)) = (node_v4.as_deref(), join_v4.as_deref()) {
                if let Err(e) = migrate_node_route(
                    self.ovn.as_ref(),
                    &self.config.cluster_router,
                    4,
                    &node_name,
                    ip,
                    nexthop,
                    &v4_cidrs,
                )
                .await
                {
                    error!("failed to migrate IPv4 route for node {}: {}", node_name, e);
                }
            }
            if let (Some(ip), Some(nexthop)) = (node_v6.as_deref(), join_v6.as_deref()) {
                if let Err(e) = migrate_node_route(
                    self.ovn.as_ref(),
                    &self.config.cluster_router,
                    6,
                    &node_name,
                    ip,
                    nexthop,
                    &v6_cidrs,
                )
                .await
                {
                    error!("failed to migrate IPv6 route for node {}: {}", node_name, e);
                }
            }
        }

        Ok(())
    }

    /// Tags each node's chassis (when it exists southbound) with the node
    /// name.
    async fn init_node_chassis(&self) -> Result<(), ControllerError> {
        let nodes = self.nodes.list(&ListParams::default()).await.map_err(|e| {
            error!("failed to list nodes: {}", e);
            e
        })?;
        for node in &nodes {
            let Some(chassis) = node.annotations().get(CHASSIS_ANNOTATION) else {
                continue;
            };
            if chassis.is_empty() {
                continue;
            }
            let exists = self.ovn.chassis_exist(chassis).await.map_err(|e| {
                error!("failed to check chassis exist: {}", e);
                e
            })?;
            if exists {
                self.ovn
                    .init_chassis_node_tag(chassis, &node.name_any())
                    .await
                    .map_err(|e| {
                        error!("failed to set chassis node tag: {}", e);
                        e
                    })?;
            }
        }
        Ok(())
    }
}

fn crd_protocol(cidr: &str) -> Result<SubnetProtocol, ControllerError> {
    Ok(match iputil::check_protocol(cidr)? {
        Protocol::IPv4 => SubnetProtocol::IPv4,
        Protocol::IPv6 => SubnetProtocol::IPv6,
        Protocol::Dual => SubnetProtocol::Dual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovn_client::MockOvnNbClient;

    #[tokio::test]
    async fn cluster_router_is_created_once() {
        let mock = MockOvnNbClient::new();
        ensure_cluster_router(&mock, "cluster-router").await.unwrap();
        assert_eq!(mock.router_names(), vec!["cluster-router"]);
        // second run is a no-op
        ensure_cluster_router(&mock, "cluster-router").await.unwrap();
        assert_eq!(mock.router_names(), vec!["cluster-router"]);
    }

    #[tokio::test]
    async fn node_route_migration() {
        let mock = MockOvnNbClient::new();
        mock.create_logical_router("cluster-router").await.unwrap();
        mock.add_static_route("cluster-router", "192.168.1.10", "100.64.0.2");

        let cidrs = vec!["192.168.1.0/24".to_string()];
        migrate_node_route(
            &mock,
            "cluster-router",
            4,
            "worker-1",
            "192.168.1.10",
            "100.64.0.2",
            &cidrs,
        )
        .await
        .unwrap();

        assert!(mock.static_routes("cluster-router").is_empty());
        assert_eq!(
            mock.address_set("node-underlay-worker-1-4").unwrap(),
            vec!["192.168.1.0/24"]
        );
        let policies = mock.policies("cluster-router");
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].priority, NODE_ROUTER_POLICY_PRIORITY);
        assert_eq!(
            policies[0].match_rule,
            "ip4.dst == 192.168.1.10 && ip4.src != $node-underlay-worker-1-4"
        );
        assert_eq!(policies[0].action, "reroute");
        assert_eq!(policies[0].nexthop, "100.64.0.2");

        // re-running converges to the same single policy
        migrate_node_route(
            &mock,
            "cluster-router",
            4,
            "worker-1",
            "192.168.1.10",
            "100.64.0.2",
            &cidrs,
        )
        .await
        .unwrap();
        assert_eq!(mock.policies("cluster-router").len(), 1);
    }

    #[test]
    fn lsp_repair_fills_only_missing_ids() {
        let mut without_vendor = HashSet::new();
        without_vendor.insert("web-0.default".to_string());
        let mut without_ls = HashMap::new();
        without_ls.insert("web-0.default".to_string(), "uuid-1".to_string());
        let mut ls_ports: HashMap<String, HashSet<String>> = HashMap::new();
        ls_ports.insert("fabric-default".to_string(), ["uuid-1".to_string()].into());

        let repair = build_lsp_repair(
            "web-0.default",
            Some("default/web-0"),
            &without_vendor,
            &without_ls,
            &ls_ports,
        );
        assert_eq!(repair.get("vendor").map(String::as_str), Some(CNI_VENDOR));
        assert_eq!(repair.get("pod").map(String::as_str), Some("default/web-0"));
        assert_eq!(
            repair.get("logical_switch").map(String::as_str),
            Some("fabric-default")
        );

        // a port that is complete needs nothing
        let repair = build_lsp_repair(
            "db-0.default",
            Some("default/db-0"),
            &without_vendor,
            &without_ls,
            &ls_ports,
        );
        assert!(repair.is_empty());

        // unknown uuid: the switch tag cannot be recovered
        let mut without_ls_unknown = HashMap::new();
        without_ls_unknown.insert("web-0.default".to_string(), "uuid-9".to_string());
        let repair = build_lsp_repair(
            "web-0.default",
            None,
            &HashSet::new(),
            &without_ls_unknown,
            &ls_ports,
        );
        assert!(repair.is_empty());
    }
}
