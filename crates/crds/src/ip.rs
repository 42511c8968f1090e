//! IP Custom Resource Definition
//!
//! The authoritative record of one interface's address assignment. The IPAM
//! is rebuilt from these records (plus pod and node annotations) on every
//! controller start.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// IPSpec defines one allocated address
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(group = "kubefabric.io", version = "v1", kind = "IP")]
#[serde(rename_all = "camelCase")]
pub struct IPSpec {
    /// Owning pod name, or the node name for node records
    pub pod_name: String,

    /// Owning pod namespace; empty for node records
    #[serde(default)]
    pub namespace: String,

    /// Subnet the address was allocated from
    pub subnet: String,

    /// Allocated address(es), comma-joined for dual-stack
    #[serde(default)]
    pub ip_address: String,

    #[serde(default)]
    pub mac_address: String,

    /// Per-family copies of `ipAddress`, filled by the startup migrator
    #[serde(default)]
    pub v4_ip_address: String,

    #[serde(default)]
    pub v6_ip_address: String,

    /// Additional attachment networks; the three arrays are parallel
    #[serde(default)]
    pub attach_subnets: Vec<String>,

    #[serde(default)]
    pub attach_ips: Vec<String>,

    #[serde(default)]
    pub attach_macs: Vec<String>,
}
