//! Northbound gateway client
//!
//! HTTP client for the logical-network northbound REST gateway. The gateway
//! exposes the northbound database as typed JSON resources under `/nb/`;
//! all mutating endpoints are idempotent.

use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::error::OvnError;
use crate::models::*;
use crate::ovn_trait::OvnNbClientTrait;

/// Client for the northbound gateway.
pub struct OvnNbClient {
    client: Client,
    base_url: String,
}

impl OvnNbClient {
    /// Create a new northbound client.
    ///
    /// # Arguments
    /// * `base_url` - gateway base URL (e.g., "http://ovn-nb-gateway:8641")
    pub fn new(base_url: String) -> Result<Self, OvnError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(OvnError::Http)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: for<'de> serde::Deserialize<'de>>(&self, path: &str) -> Result<T, OvnError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(OvnError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(OvnError::Api(format!("{} {} - {}", status, path, body)));
        }
        serde_json::from_str(&body).map_err(|e| {
            OvnError::Api(format!(
                "error decoding response body: {} - response (first 500 chars): {}",
                e,
                body.chars().take(500).collect::<String>()
            ))
        })
    }

    /// POST/PUT/DELETE with a JSON body; `tolerate_not_found` turns a 404
    /// into success for delete-style endpoints.
    async fn send_json<B: serde::Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
        tolerate_not_found: bool,
    ) -> Result<(), OvnError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let response = self.client.request(method, &url).json(body).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if tolerate_not_found {
                return Ok(());
            }
            return Err(OvnError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OvnError::Api(format!("{} {} - {}", status, path, body)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OvnNbClientTrait for OvnNbClient {
    async fn list_logical_routers(&self) -> Result<Vec<LogicalRouter>, OvnError> {
        self.get_json("/nb/logical-routers").await
    }

    async fn create_logical_router(&self, name: &str) -> Result<(), OvnError> {
        let body = CreateByNameRequest { name: name.to_string() };
        self.send_json(reqwest::Method::POST, "/nb/logical-routers", &body, false)
            .await
    }

    async fn list_logical_switches(&self) -> Result<Vec<LogicalSwitch>, OvnError> {
        self.get_json("/nb/logical-switches").await
    }

    async fn list_lsp_with_legacy_external_ids(&self) -> Result<Vec<LogicalSwitchPort>, OvnError> {
        self.get_json("/nb/logical-switch-ports?legacy-external-ids=true")
            .await
    }

    async fn set_lsp_external_ids(
        &self,
        port: &str,
        external_ids: &HashMap<String, String>,
    ) -> Result<(), OvnError> {
        let path = format!("/nb/logical-switch-ports/{}/external-ids", port);
        self.send_json(reqwest::Method::POST, &path, external_ids, false)
            .await
    }

    async fn create_address_set(
        &self,
        name: &str,
        addresses: Option<&[String]>,
    ) -> Result<(), OvnError> {
        let body = CreateAddressSetRequest {
            name: name.to_string(),
            addresses: addresses.map(<[String]>::to_vec).unwrap_or_default(),
        };
        self.send_json(reqwest::Method::POST, "/nb/address-sets", &body, false)
            .await
    }

    async fn address_set_update_address(
        &self,
        name: &str,
        addresses: &[String],
    ) -> Result<(), OvnError> {
        let path = format!("/nb/address-sets/{}/addresses", name);
        self.send_json(reqwest::Method::PUT, &path, &addresses, false)
            .await
    }

    async fn add_logical_router_policy(
        &self,
        router: &str,
        priority: i32,
        match_rule: &str,
        action: &str,
        nexthop: &str,
        external_ids: Option<&HashMap<String, String>>,
    ) -> Result<(), OvnError> {
        let body = RouterPolicyRequest {
            priority,
            match_rule: match_rule.to_string(),
            action: action.to_string(),
            nexthop: nexthop.to_string(),
            external_ids: external_ids.cloned().unwrap_or_default(),
        };
        let path = format!("/nb/logical-routers/{}/policies", router);
        self.send_json(reqwest::Method::POST, &path, &body, false).await
    }

    async fn delete_logical_router_static_route(
        &self,
        router: &str,
        policy: Option<&str>,
        prefix: &str,
        nexthop: &str,
    ) -> Result<(), OvnError> {
        let body = DeleteStaticRouteRequest {
            policy: policy.map(str::to_string),
            prefix: prefix.to_string(),
            nexthop: nexthop.to_string(),
        };
        let path = format!("/nb/logical-routers/{}/static-routes", router);
        // the route may already be gone
        self.send_json(reqwest::Method::DELETE, &path, &body, true).await
    }

    async fn chassis_exist(&self, chassis: &str) -> Result<bool, OvnError> {
        let path = format!("/nb/chassis/{}", chassis);
        match self.get_json::<serde_json::Value>(&path).await {
            Ok(_) => Ok(true),
            Err(OvnError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn init_chassis_node_tag(&self, chassis: &str, node: &str) -> Result<(), OvnError> {
        let path = format!("/nb/chassis/{}/node-tag", chassis);
        let body = CreateByNameRequest { name: node.to_string() };
        self.send_json(reqwest::Method::PUT, &path, &body, false).await
    }
}
