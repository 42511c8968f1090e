//! Subnet Custom Resource Definition
//!
//! A subnet maps one-to-one onto a logical switch and carries the CIDR
//! block(s) the IPAM allocates from. Dual-stack subnets comma-join the v4
//! and v6 blocks in `cidrBlock`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SubnetSpec defines the desired state of a subnet
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubefabric.io",
    version = "v1",
    kind = "Subnet",
    status = "SubnetStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct SubnetSpec {
    /// Owning VPC (the default VPC when empty)
    #[serde(default)]
    pub vpc: String,

    /// Whether this is the cluster's default workload subnet
    #[serde(default)]
    pub default: bool,

    /// Provider handling this subnet's ports
    #[serde(default)]
    pub provider: String,

    /// CIDR block; dual-stack subnets comma-join `v4,v6`
    pub cidr_block: String,

    /// Gateway address(es), comma-joined for dual-stack
    #[serde(default)]
    pub gateway: String,

    /// Skip the gateway reachability check
    #[serde(default)]
    pub disable_gateway_check: bool,

    /// Addresses excluded from random allocation; entries are single
    /// addresses or `a..b` spans
    #[serde(default)]
    pub exclude_ips: Vec<String>,

    /// SNAT traffic leaving the cluster
    #[serde(default)]
    pub nat_outgoing: bool,

    /// Gateway placement
    #[serde(default)]
    pub gateway_type: GatewayType,

    /// Address families carried by `cidrBlock`
    #[serde(default)]
    pub protocol: SubnetProtocol,

    /// VLAN this subnet attaches to (underlay subnets only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan: Option<String>,

    /// Answer ARP/ND for the gateway on the logical switch
    #[serde(default)]
    pub logical_gateway: bool,

    /// Keep this subnet out of inter-cluster interconnection
    #[serde(default)]
    pub disable_inter_connection: bool,
}

/// Gateway placement choices
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayType {
    #[default]
    Distributed,
    Centralized,
}

/// Address family choices
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
pub enum SubnetProtocol {
    #[default]
    IPv4,
    IPv6,
    Dual,
}

/// SubnetStatus defines the observed state of a subnet
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubnetStatus {
    /// Allocated v4 addresses
    #[serde(default)]
    pub v4_using_ips: u64,

    /// Free v4 addresses
    #[serde(default)]
    pub v4_available_ips: u64,

    /// Allocated v6 addresses
    #[serde(default)]
    pub v6_using_ips: u64,

    /// Free v6 addresses
    #[serde(default)]
    pub v6_available_ips: u64,
}
