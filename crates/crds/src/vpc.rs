//! Vpc Custom Resource Definition
//!
//! A VPC is a logical routing domain. Exactly one default VPC exists
//! cluster-wide; its status names the default router and switch.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VpcSpec defines the desired state of a VPC
#[derive(CustomResource, Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubefabric.io",
    version = "v1",
    kind = "Vpc",
    status = "VpcStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct VpcSpec {}

/// VpcStatus defines the observed state of a VPC
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct VpcStatus {
    /// Name of the default workload switch
    #[serde(default)]
    pub default_logical_switch: String,

    /// Name of the VPC's router
    #[serde(default)]
    pub router: String,

    /// Whether this is the cluster default VPC
    #[serde(default)]
    pub default: bool,

    #[serde(default)]
    pub standby: bool,
}
