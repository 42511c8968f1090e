//! Northbound object models
//!
//! Wire shapes for the logical-network objects the control plane touches.
//! External-IDs come back as a full map with empty strings for unset keys,
//! never as absent keys; callers treat empty as missing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A logical router.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalRouter {
    pub uuid: String,
    pub name: String,
}

/// A logical switch; `ports` holds the UUIDs of its member ports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalSwitch {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub ports: Vec<String>,
}

/// A logical switch port with its external-ID map.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogicalSwitchPort {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub external_ids: HashMap<String, String>,
}

/// Request body for creating a named object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateByNameRequest {
    pub name: String,
}

/// Request body for creating an address set with optional initial members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAddressSetRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub addresses: Vec<String>,
}

/// Request body for installing a router policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterPolicyRequest {
    pub priority: i32,
    #[serde(rename = "match")]
    pub match_rule: String,
    pub action: String,
    pub nexthop: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub external_ids: HashMap<String, String>,
}

/// Request body for deleting a static route; empty fields match anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteStaticRouteRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    pub prefix: String,
    pub nexthop: String,
}
