//! Naming, annotation and liveness helpers
//!
//! The conventions shared between the bring-up driver and the migrators:
//! annotation keys, port and address-set naming, pod liveness, and the
//! per-provider annotation scheme. The default provider is the bare
//! annotation domain; attachment providers are `<name>.<ns>.<domain>`.

use std::collections::BTreeMap;
use std::net::IpAddr;

use ipnet::IpNet;
use k8s_openapi::api::core::v1::{Node, Pod};

/// Vendor tag written into LSP external-IDs.
pub const CNI_VENDOR: &str = "kube-fabric";

/// Default provider name, also the annotation domain.
pub const DEFAULT_PROVIDER: &str = "kubefabric.io";

/// Name of the default VPC.
pub const DEFAULT_VPC: &str = "fabric-cluster";

pub const ALLOCATED_ANNOTATION: &str = "kubefabric.io/allocated";
pub const IP_ADDRESS_ANNOTATION: &str = "kubefabric.io/ip_address";
pub const MAC_ADDRESS_ANNOTATION: &str = "kubefabric.io/mac_address";
pub const LOGICAL_SWITCH_ANNOTATION: &str = "kubefabric.io/logical_switch";
pub const CHASSIS_ANNOTATION: &str = "kubefabric.io/chassis";

pub const VENDOR_EXTERNAL_ID_KEY: &str = "vendor";
pub const POD_EXTERNAL_ID_KEY: &str = "pod";
pub const LOGICAL_SWITCH_EXTERNAL_ID_KEY: &str = "logical_switch";

/// Priority of the per-node reroute policies on the cluster router.
pub const NODE_ROUTER_POLICY_PRIORITY: i32 = 30400;

/// The per-provider annotation key, e.g. `kubefabric.io/ip_address` for the
/// default provider or `net1.default.kubefabric.io/ip_address` for an
/// attachment.
pub fn provider_annotation(provider: &str, key: &str) -> String {
    format!("{}/{}", provider, key)
}

/// Whether the provider is handled by this CNI.
pub fn is_fabric_provider(provider: &str) -> bool {
    provider == DEFAULT_PROVIDER || provider.ends_with(&format!(".{}", DEFAULT_PROVIDER))
}

/// Providers declared by a pod's annotations, keyed off the per-provider
/// address annotation.
pub fn pod_providers(annotations: &BTreeMap<String, String>) -> Vec<String> {
    let mut providers: Vec<String> = annotations
        .keys()
        .filter_map(|k| k.strip_suffix("/ip_address"))
        .map(str::to_string)
        .collect();
    providers.sort();
    providers
}

/// The LSP name for a pod interface.
pub fn pod_port_name(pod: &str, namespace: &str, provider: &str) -> String {
    if provider == DEFAULT_PROVIDER {
        format!("{}.{}", pod, namespace)
    } else {
        format!("{}.{}.{}", pod, namespace, provider)
    }
}

/// The LSP name for a node's join interface.
pub fn node_port_name(node: &str) -> String {
    format!("node-{}", node)
}

/// Address set holding the underlay CIDRs that cover a node, per family.
pub fn node_underlay_address_set_name(node: &str, af: u8) -> String {
    format!("node-underlay-{}-{}", node, af)
}

/// A pod holds its addresses until it reaches a terminal phase. A deletion
/// timestamp alone does not end liveness: gracefully terminating pods keep
/// their addresses until they disappear from the API.
pub fn is_pod_alive(pod: &Pod) -> bool {
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .unwrap_or("");
    !matches!(phase, "Succeeded" | "Failed")
}

/// The node's internal addresses, split by family.
pub fn node_internal_ip(node: &Node) -> (Option<String>, Option<String>) {
    let mut v4 = None;
    let mut v6 = None;
    if let Some(addresses) = node.status.as_ref().and_then(|s| s.addresses.as_ref()) {
        for addr in addresses {
            if addr.type_ != "InternalIP" {
                continue;
            }
            match addr.address.parse::<IpAddr>() {
                Ok(IpAddr::V4(_)) => v4 = Some(addr.address.clone()),
                Ok(IpAddr::V6(_)) => v6 = Some(addr.address.clone()),
                Err(_) => {}
            }
        }
    }
    (v4, v6)
}

/// Splits a comma-joined CIDR block into per-family parts.
pub fn split_cidr_by_family(cidr_block: &str) -> (Option<String>, Option<String>) {
    let mut v4 = None;
    let mut v6 = None;
    for part in cidr_block.split(',') {
        let part = part.trim();
        match part.parse::<IpNet>() {
            Ok(IpNet::V4(_)) => v4 = Some(part.to_string()),
            Ok(IpNet::V6(_)) => v6 = Some(part.to_string()),
            Err(_) => {}
        }
    }
    (v4, v6)
}

/// VLAN tags live in `[1, 4095]`; 0 and 4096 are outside the usable space.
pub fn is_valid_vlan_id(id: i32) -> bool {
    (1..=4095).contains(&id)
}

/// 404 from the API server.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{NodeAddress, NodeStatus, PodStatus};

    #[test]
    fn port_naming() {
        assert_eq!(pod_port_name("web-0", "default", DEFAULT_PROVIDER), "web-0.default");
        assert_eq!(
            pod_port_name("web-0", "default", "net1.default.kubefabric.io"),
            "web-0.default.net1.default.kubefabric.io"
        );
        assert_eq!(node_port_name("worker-1"), "node-worker-1");
        assert_eq!(
            node_underlay_address_set_name("worker-1", 4),
            "node-underlay-worker-1-4"
        );
    }

    #[test]
    fn provider_detection() {
        assert!(is_fabric_provider(DEFAULT_PROVIDER));
        assert!(is_fabric_provider("net1.default.kubefabric.io"));
        assert!(!is_fabric_provider("macvlan.example.org"));
        assert!(!is_fabric_provider("notkubefabric.io"));
    }

    #[test]
    fn providers_from_annotations() {
        let mut annotations = BTreeMap::new();
        annotations.insert("kubefabric.io/ip_address".to_string(), "10.16.0.5".to_string());
        annotations.insert(
            "net1.default.kubefabric.io/ip_address".to_string(),
            "172.16.0.5".to_string(),
        );
        annotations.insert("kubefabric.io/allocated".to_string(), "true".to_string());
        assert_eq!(
            pod_providers(&annotations),
            vec!["kubefabric.io", "net1.default.kubefabric.io"]
        );
    }

    #[test]
    fn vlan_id_bounds() {
        assert!(!is_valid_vlan_id(0));
        assert!(is_valid_vlan_id(1));
        assert!(is_valid_vlan_id(4095));
        assert!(!is_valid_vlan_id(4096));
        assert!(!is_valid_vlan_id(-1));
    }

    fn pod_with_phase(phase: Option<&str>) -> Pod {
        Pod {
            status: phase.map(|p| PodStatus {
                phase: Some(p.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn pod_liveness_is_phase_based() {
        assert!(is_pod_alive(&pod_with_phase(Some("Running"))));
        assert!(is_pod_alive(&pod_with_phase(Some("Pending"))));
        assert!(is_pod_alive(&pod_with_phase(None)));
        assert!(!is_pod_alive(&pod_with_phase(Some("Succeeded"))));
        assert!(!is_pod_alive(&pod_with_phase(Some("Failed"))));

        // graceful termination keeps the pod alive
        let mut terminating = pod_with_phase(Some("Running"));
        terminating.metadata.deletion_timestamp =
            Some(k8s_openapi::apimachinery::pkg::apis::meta::v1::Time(
                k8s_openapi::chrono::Utc::now(),
            ));
        assert!(is_pod_alive(&terminating));
    }

    #[test]
    fn node_addresses_split_by_family() {
        let node = Node {
            status: Some(NodeStatus {
                addresses: Some(vec![
                    NodeAddress {
                        type_: "InternalIP".to_string(),
                        address: "192.168.1.10".to_string(),
                    },
                    NodeAddress {
                        type_: "InternalIP".to_string(),
                        address: "fd00::10".to_string(),
                    },
                    NodeAddress {
                        type_: "Hostname".to_string(),
                        address: "worker-1".to_string(),
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let (v4, v6) = node_internal_ip(&node);
        assert_eq!(v4.as_deref(), Some("192.168.1.10"));
        assert_eq!(v6.as_deref(), Some("fd00::10"));
    }

    #[test]
    fn cidr_block_split() {
        let (v4, v6) = split_cidr_by_family("10.16.0.0/16,fd00::/64");
        assert_eq!(v4.as_deref(), Some("10.16.0.0/16"));
        assert_eq!(v6.as_deref(), Some("fd00::/64"));
        let (v4, v6) = split_cidr_by_family("10.16.0.0/16");
        assert_eq!(v4.as_deref(), Some("10.16.0.0/16"));
        assert!(v6.is_none());
    }
}
