//! Controller configuration
//!
//! All knobs come from `FABRIC_*` environment variables with defaults that
//! match a stock deployment; only malformed values are errors.

use std::env;

use crate::error::ControllerError;

/// Encapsulation of the physical network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Overlay tunnels between nodes
    Geneve,
    /// Underlay VLAN tagging
    Vlan,
}

impl NetworkType {
    fn parse(s: &str) -> Result<Self, ControllerError> {
        match s {
            "geneve" => Ok(NetworkType::Geneve),
            "vlan" => Ok(NetworkType::Vlan),
            other => Err(ControllerError::InvalidConfig(format!(
                "unknown network type {:?} (expected \"geneve\" or \"vlan\")",
                other
            ))),
        }
    }
}

/// Controller configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Northbound gateway base URL
    pub ovn_nb_url: String,

    /// Name of the cluster router connecting all logical switches
    pub cluster_router: String,

    /// Join subnet: the switch connecting hosts to the fabric
    pub node_switch: String,
    pub node_switch_cidr: String,
    pub node_switch_gateway: String,

    /// Default workload subnet
    pub default_logical_switch: String,
    pub default_cidr: String,
    pub default_gateway: String,
    pub default_gateway_check: bool,
    pub default_exclude_ips: String,

    pub network_type: NetworkType,

    /// VLAN mode defaults
    pub default_provider_name: String,
    pub default_host_interface: String,
    pub default_vlan_name: String,
    pub default_vlan_id: i32,
    pub default_logical_gateway: bool,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn bool_var_or(key: &str, default: bool) -> Result<bool, ControllerError> {
    match env::var(key) {
        Ok(v) => v.parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{} must be \"true\" or \"false\"", key))
        }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ControllerError> {
        let default_gateway = var_or("FABRIC_DEFAULT_GATEWAY", "10.16.0.1");
        let default_vlan_id = var_or("FABRIC_DEFAULT_VLAN_ID", "1")
            .parse()
            .map_err(|_| {
                ControllerError::InvalidConfig("FABRIC_DEFAULT_VLAN_ID must be an integer".to_string())
            })?;
        Ok(Config {
            ovn_nb_url: var_or("FABRIC_NB_URL", "http://ovn-nb-gateway.kube-system:8641"),
            cluster_router: var_or("FABRIC_CLUSTER_ROUTER", "cluster-router"),
            node_switch: var_or("FABRIC_NODE_SWITCH", "join"),
            node_switch_cidr: var_or("FABRIC_NODE_SWITCH_CIDR", "100.64.0.0/16"),
            node_switch_gateway: var_or("FABRIC_NODE_SWITCH_GATEWAY", "100.64.0.1"),
            default_logical_switch: var_or("FABRIC_DEFAULT_SWITCH", "fabric-default"),
            default_cidr: var_or("FABRIC_DEFAULT_CIDR", "10.16.0.0/16"),
            default_exclude_ips: var_or("FABRIC_DEFAULT_EXCLUDE_IPS", &default_gateway),
            default_gateway,
            default_gateway_check: bool_var_or("FABRIC_DEFAULT_GATEWAY_CHECK", true)?,
            network_type: NetworkType::parse(&var_or("FABRIC_NETWORK_TYPE", "geneve"))?,
            default_provider_name: var_or("FABRIC_DEFAULT_PROVIDER_NETWORK", "provider"),
            default_host_interface: var_or("FABRIC_DEFAULT_HOST_INTERFACE", "eth1"),
            default_vlan_name: var_or("FABRIC_DEFAULT_VLAN", "fabric-vlan"),
            default_vlan_id,
            default_logical_gateway: bool_var_or("FABRIC_DEFAULT_LOGICAL_GATEWAY", false)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_type_parsing() {
        assert_eq!(NetworkType::parse("geneve").unwrap(), NetworkType::Geneve);
        assert_eq!(NetworkType::parse("vlan").unwrap(), NetworkType::Vlan);
        assert!(NetworkType::parse("vxlan").is_err());
    }
}
