//! Vlan Custom Resource Definition

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// VlanSpec defines the desired state of a VLAN.
///
/// `vlanId` and `providerInterfaceName` are the pre-rename field names; the
/// startup migrator moves their values into `id` and `provider` and leaves
/// them empty.
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(group = "kubefabric.io", version = "v1", kind = "Vlan")]
#[serde(rename_all = "camelCase")]
pub struct VlanSpec {
    /// VLAN tag, 1-4095
    #[serde(default)]
    pub id: i32,

    /// Provider network carrying this VLAN
    #[serde(default)]
    pub provider: String,

    /// Legacy name for `id`
    #[serde(default)]
    pub vlan_id: i32,

    /// Legacy name for `provider`
    #[serde(default)]
    pub provider_interface_name: String,
}
