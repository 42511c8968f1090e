//! Mock northbound client for unit testing
//!
//! In-memory implementation of `OvnNbClientTrait` so controller logic can be
//! exercised without a gateway. Stores objects in shared maps and mirrors the
//! real southbound's quirk of returning external-ID maps with empty-string
//! values rather than absent keys.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::OvnError;
use crate::models::*;
use crate::ovn_trait::OvnNbClientTrait;

/// A recorded router policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPolicy {
    pub priority: i32,
    pub match_rule: String,
    pub action: String,
    pub nexthop: String,
}

/// A recorded static route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedStaticRoute {
    pub policy: Option<String>,
    pub prefix: String,
    pub nexthop: String,
}

/// Mock northbound client for testing.
#[derive(Clone, Default)]
pub struct MockOvnNbClient {
    routers: Arc<Mutex<HashMap<String, LogicalRouter>>>,
    switches: Arc<Mutex<HashMap<String, LogicalSwitch>>>,
    ports: Arc<Mutex<HashMap<String, LogicalSwitchPort>>>,
    address_sets: Arc<Mutex<HashMap<String, Vec<String>>>>,
    policies: Arc<Mutex<HashMap<String, Vec<RecordedPolicy>>>>,
    static_routes: Arc<Mutex<HashMap<String, Vec<RecordedStaticRoute>>>>,
    chassis: Arc<Mutex<HashMap<String, Option<String>>>>,
    next_uuid: Arc<Mutex<u64>>,
}

impl MockOvnNbClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_uuid(&self) -> String {
        let mut id = self.next_uuid.lock().unwrap();
        *id += 1;
        format!("uuid-{:04}", *id)
    }

    /// Add a logical switch with its member port UUIDs (for test setup)
    pub fn add_logical_switch(&self, name: &str, port_uuids: &[&str]) {
        let uuid = self.next_uuid();
        self.switches.lock().unwrap().insert(
            name.to_string(),
            LogicalSwitch {
                uuid,
                name: name.to_string(),
                ports: port_uuids.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    /// Add a logical switch port (for test setup)
    pub fn add_logical_switch_port(
        &self,
        uuid: &str,
        name: &str,
        external_ids: &[(&str, &str)],
    ) {
        self.ports.lock().unwrap().insert(
            name.to_string(),
            LogicalSwitchPort {
                uuid: uuid.to_string(),
                name: name.to_string(),
                external_ids: external_ids
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
        );
    }

    /// Add a chassis (for test setup)
    pub fn add_chassis(&self, name: &str) {
        self.chassis.lock().unwrap().insert(name.to_string(), None);
    }

    /// Seed a static route (for test setup)
    pub fn add_static_route(&self, router: &str, prefix: &str, nexthop: &str) {
        self.static_routes
            .lock()
            .unwrap()
            .entry(router.to_string())
            .or_default()
            .push(RecordedStaticRoute {
                policy: None,
                prefix: prefix.to_string(),
                nexthop: nexthop.to_string(),
            });
    }

    pub fn router_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.routers.lock().unwrap().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn port_external_ids(&self, port: &str) -> Option<HashMap<String, String>> {
        self.ports.lock().unwrap().get(port).map(|p| p.external_ids.clone())
    }

    pub fn address_set(&self, name: &str) -> Option<Vec<String>> {
        self.address_sets.lock().unwrap().get(name).cloned()
    }

    pub fn policies(&self, router: &str) -> Vec<RecordedPolicy> {
        self.policies.lock().unwrap().get(router).cloned().unwrap_or_default()
    }

    pub fn static_routes(&self, router: &str) -> Vec<RecordedStaticRoute> {
        self.static_routes.lock().unwrap().get(router).cloned().unwrap_or_default()
    }

    pub fn chassis_node_tag(&self, chassis: &str) -> Option<String> {
        self.chassis.lock().unwrap().get(chassis).cloned().flatten()
    }
}

#[async_trait::async_trait]
impl OvnNbClientTrait for MockOvnNbClient {
    async fn list_logical_routers(&self) -> Result<Vec<LogicalRouter>, OvnError> {
        Ok(self.routers.lock().unwrap().values().cloned().collect())
    }

    async fn create_logical_router(&self, name: &str) -> Result<(), OvnError> {
        let uuid = self.next_uuid();
        self.routers
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| LogicalRouter { uuid, name: name.to_string() });
        Ok(())
    }

    async fn list_logical_switches(&self) -> Result<Vec<LogicalSwitch>, OvnError> {
        Ok(self.switches.lock().unwrap().values().cloned().collect())
    }

    async fn list_lsp_with_legacy_external_ids(&self) -> Result<Vec<LogicalSwitchPort>, OvnError> {
        let ports = self.ports.lock().unwrap();
        Ok(ports
            .values()
            .filter(|p| {
                let missing = |key: &str| p.external_ids.get(key).map_or(true, String::is_empty);
                missing("vendor") || missing("logical_switch")
            })
            .cloned()
            .collect())
    }

    async fn set_lsp_external_ids(
        &self,
        port: &str,
        external_ids: &HashMap<String, String>,
    ) -> Result<(), OvnError> {
        let mut ports = self.ports.lock().unwrap();
        let port = ports
            .get_mut(port)
            .ok_or_else(|| OvnError::NotFound(port.to_string()))?;
        for (k, v) in external_ids {
            port.external_ids.insert(k.clone(), v.clone());
        }
        Ok(())
    }

    async fn create_address_set(
        &self,
        name: &str,
        addresses: Option<&[String]>,
    ) -> Result<(), OvnError> {
        self.address_sets
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert_with(|| addresses.map(<[String]>::to_vec).unwrap_or_default());
        Ok(())
    }

    async fn address_set_update_address(
        &self,
        name: &str,
        addresses: &[String],
    ) -> Result<(), OvnError> {
        let mut sets = self.address_sets.lock().unwrap();
        match sets.get_mut(name) {
            Some(set) => {
                *set = addresses.to_vec();
                Ok(())
            }
            None => Err(OvnError::NotFound(name.to_string())),
        }
    }

    async fn add_logical_router_policy(
        &self,
        router: &str,
        priority: i32,
        match_rule: &str,
        action: &str,
        nexthop: &str,
        _external_ids: Option<&HashMap<String, String>>,
    ) -> Result<(), OvnError> {
        if !self.routers.lock().unwrap().contains_key(router) {
            return Err(OvnError::NotFound(router.to_string()));
        }
        let policy = RecordedPolicy {
            priority,
            match_rule: match_rule.to_string(),
            action: action.to_string(),
            nexthop: nexthop.to_string(),
        };
        let mut policies = self.policies.lock().unwrap();
        let entries = policies.entry(router.to_string()).or_default();
        if !entries.contains(&policy) {
            entries.push(policy);
        }
        Ok(())
    }

    async fn delete_logical_router_static_route(
        &self,
        router: &str,
        policy: Option<&str>,
        prefix: &str,
        nexthop: &str,
    ) -> Result<(), OvnError> {
        let mut routes = self.static_routes.lock().unwrap();
        if let Some(entries) = routes.get_mut(router) {
            entries.retain(|r| {
                !(r.prefix == prefix
                    && (nexthop.is_empty() || r.nexthop == nexthop)
                    && (policy.is_none() || r.policy.as_deref() == policy))
            });
        }
        Ok(())
    }

    async fn chassis_exist(&self, chassis: &str) -> Result<bool, OvnError> {
        Ok(self.chassis.lock().unwrap().contains_key(chassis))
    }

    async fn init_chassis_node_tag(&self, chassis: &str, node: &str) -> Result<(), OvnError> {
        let mut entries = self.chassis.lock().unwrap();
        match entries.get_mut(chassis) {
            Some(tag) => {
                *tag = Some(node.to_string());
                Ok(())
            }
            None => Err(OvnError::NotFound(chassis.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn router_create_is_idempotent() {
        let mock = MockOvnNbClient::new();
        mock.create_logical_router("cluster-router").await.unwrap();
        mock.create_logical_router("cluster-router").await.unwrap();
        assert_eq!(mock.router_names(), vec!["cluster-router"]);
    }

    #[tokio::test]
    async fn legacy_external_ids_treat_empty_as_missing() {
        let mock = MockOvnNbClient::new();
        mock.add_logical_switch_port("uuid-a", "complete", &[
            ("vendor", "kube-fabric"),
            ("logical_switch", "default"),
        ]);
        mock.add_logical_switch_port("uuid-b", "empty-vendor", &[
            ("vendor", ""),
            ("logical_switch", "default"),
        ]);
        mock.add_logical_switch_port("uuid-c", "no-switch", &[("vendor", "kube-fabric")]);
        let legacy = mock.list_lsp_with_legacy_external_ids().await.unwrap();
        let mut names: Vec<&str> = legacy.iter().map(|p| p.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["empty-vendor", "no-switch"]);
    }

    #[tokio::test]
    async fn external_id_merge_never_removes() {
        let mock = MockOvnNbClient::new();
        mock.add_logical_switch_port("uuid-a", "port", &[("vendor", "kube-fabric")]);
        let patch: HashMap<String, String> =
            [("logical_switch".to_string(), "default".to_string())].into();
        mock.set_lsp_external_ids("port", &patch).await.unwrap();
        let ids = mock.port_external_ids("port").unwrap();
        assert_eq!(ids.get("vendor").map(String::as_str), Some("kube-fabric"));
        assert_eq!(ids.get("logical_switch").map(String::as_str), Some("default"));
    }

    #[tokio::test]
    async fn address_set_create_keeps_existing_members() {
        let mock = MockOvnNbClient::new();
        mock.create_address_set("as1", Some(&["10.0.0.0/24".to_string()]))
            .await
            .unwrap();
        mock.create_address_set("as1", None).await.unwrap();
        assert_eq!(mock.address_set("as1").unwrap(), vec!["10.0.0.0/24"]);
        mock.address_set_update_address("as1", &["10.1.0.0/24".to_string()])
            .await
            .unwrap();
        assert_eq!(mock.address_set("as1").unwrap(), vec!["10.1.0.0/24"]);
    }

    #[tokio::test]
    async fn deleting_absent_static_route_is_not_an_error() {
        let mock = MockOvnNbClient::new();
        mock.delete_logical_router_static_route("router", None, "10.0.0.2", "")
            .await
            .unwrap();
        mock.add_static_route("router", "10.0.0.2", "100.64.0.2");
        mock.delete_logical_router_static_route("router", None, "10.0.0.2", "")
            .await
            .unwrap();
        assert!(mock.static_routes("router").is_empty());
    }

    #[tokio::test]
    async fn chassis_tagging() {
        let mock = MockOvnNbClient::new();
        assert!(!mock.chassis_exist("ch1").await.unwrap());
        mock.add_chassis("ch1");
        assert!(mock.chassis_exist("ch1").await.unwrap());
        mock.init_chassis_node_tag("ch1", "node-1").await.unwrap();
        assert_eq!(mock.chassis_node_tag("ch1").as_deref(), Some("node-1"));
        assert!(matches!(
            mock.init_chassis_node_tag("ch2", "node-2").await,
            Err(OvnError::NotFound(_))
        ));
    }
}
