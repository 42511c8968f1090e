//! OvnNbClientTrait for mocking
//!
//! Abstracts the northbound client so the controller's bring-up driver can
//! run against the HTTP gateway in production and an in-memory mock in unit
//! tests. Every operation is idempotent on the receiver; the driver retries
//! by re-running the whole init sequence on leadership acquisition.

use std::collections::HashMap;

use crate::error::OvnError;
use crate::models::*;

/// Operations against the logical-network northbound database.
#[async_trait::async_trait]
pub trait OvnNbClientTrait: Send + Sync {
    async fn list_logical_routers(&self) -> Result<Vec<LogicalRouter>, OvnError>;

    /// Creates the router; an existing router of the same name is fine.
    async fn create_logical_router(&self, name: &str) -> Result<(), OvnError>;

    async fn list_logical_switches(&self) -> Result<Vec<LogicalSwitch>, OvnError>;

    /// Ports whose external-IDs are missing the vendor tag or the
    /// owning-switch tag (empty string counts as missing).
    async fn list_lsp_with_legacy_external_ids(&self) -> Result<Vec<LogicalSwitchPort>, OvnError>;

    /// Merges the given keys into the port's external-IDs; never removes.
    async fn set_lsp_external_ids(
        &self,
        port: &str,
        external_ids: &HashMap<String, String>,
    ) -> Result<(), OvnError>;

    /// Creates the address set if absent; an existing set keeps its members.
    async fn create_address_set(
        &self,
        name: &str,
        addresses: Option<&[String]>,
    ) -> Result<(), OvnError>;

    /// Replaces the address set's members.
    async fn address_set_update_address(
        &self,
        name: &str,
        addresses: &[String],
    ) -> Result<(), OvnError>;

    async fn add_logical_router_policy(
        &self,
        router: &str,
        priority: i32,
        match_rule: &str,
        action: &str,
        nexthop: &str,
        external_ids: Option<&HashMap<String, String>>,
    ) -> Result<(), OvnError>;

    /// Deletes a matching static route; an already-gone route is not an
    /// error.
    async fn delete_logical_router_static_route(
        &self,
        router: &str,
        policy: Option<&str>,
        prefix: &str,
        nexthop: &str,
    ) -> Result<(), OvnError>;

    async fn chassis_exist(&self, chassis: &str) -> Result<bool, OvnError>;

    /// Tags the chassis with the node that hosts it.
    async fn init_chassis_node_tag(&self, chassis: &str, node: &str) -> Result<(), OvnError>;
}
