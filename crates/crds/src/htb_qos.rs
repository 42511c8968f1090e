//! HtbQos Custom Resource Definition

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// HtbQosSpec defines one HTB queueing tier
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(group = "kubefabric.io", version = "v1", kind = "HtbQos")]
#[serde(rename_all = "camelCase")]
pub struct HtbQosSpec {
    /// HTB priority; lower wins. The default tiers are high=100,
    /// medium=200, low=300.
    pub priority: String,
}
