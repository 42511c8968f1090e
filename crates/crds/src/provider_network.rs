//! ProviderNetwork Custom Resource Definition

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ProviderNetworkSpec defines the desired state of a provider network
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(group = "kubefabric.io", version = "v1", kind = "ProviderNetwork")]
#[serde(rename_all = "camelCase")]
pub struct ProviderNetworkSpec {
    /// Host interface bridged into this provider network
    pub default_interface: String,
}
