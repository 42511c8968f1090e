//! One-shot schema migrations
//!
//! Forward migrations on the custom records, run once after bring-up. Each
//! is idempotent: item failures abort the migrator so the next leader
//! retries, records already in the new shape are skipped.

use kube::api::{ListParams, PostParams};
use kube::ResourceExt;
use tracing::{error, info};

use crds::SubnetStatus;
use ipam::util as iputil;

use crate::controller::Controller;
use crate::error::ControllerError;

impl Controller {
    pub(crate) async fn migrate(&self) -> Result<(), ControllerError> {
        self.sync_ip_records().await?;
        self.sync_subnet_status().await?;
        self.sync_vlans().await?;
        Ok(())
    }

    /// Splits the combined `ipAddress` field into the per-family
    /// `v4IpAddress`/`v6IpAddress` fields.
    async fn sync_ip_records(&self) -> Result<(), ControllerError> {
        info!("start to sync ip records");
        let records = self.ips.list(&ListParams::default()).await?;
        for record in &records {
            let (v4, v6) = iputil::split_string_ip(&record.spec.ip_address);
            let v4 = v4.unwrap_or_default();
            let v6 = v6.unwrap_or_default();
            if record.spec.v4_ip_address == v4 && record.spec.v6_ip_address == v6 {
                continue;
            }
            let mut updated = record.clone();
            updated.spec.v4_ip_address = v4;
            updated.spec.v6_ip_address = v6;
            let name = record.name_any();
            if let Err(e) = self.ips.replace(&name, &PostParams::default(), &updated).await {
                error!("failed to sync ip record {}: {}", record.spec.ip_address, e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Recomputes every subnet's usage counters from the hydrated IPAM,
    /// dual-aware.
    async fn sync_subnet_status(&self) -> Result<(), ControllerError> {
        info!("start to sync subnets");
        let subnets = self.subnets.list(&ListParams::default()).await?;
        for subnet in &subnets {
            let name = subnet.name_any();
            let Some(usage) = self.ipam.subnet_usage(&name) else {
                continue;
            };
            let status = SubnetStatus {
                v4_using_ips: usage.v4_using.min(u64::MAX as u128) as u64,
                v4_available_ips: usage.v4_available.min(u64::MAX as u128) as u64,
                v6_using_ips: usage.v6_using.min(u64::MAX as u128) as u64,
                v6_available_ips: usage.v6_available.min(u64::MAX as u128) as u64,
            };
            if subnet.status.as_ref() == Some(&status) {
                continue;
            }
            let mut updated = subnet.clone();
            updated.status = Some(status);
            let data = serde_json::to_vec(&updated)?;
            if let Err(e) = self
                .subnets
                .replace_status(&name, &PostParams::default(), data)
                .await
            {
                error!("failed to update used ips of subnet {}: {}", name, e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Moves the legacy `vlanId`/`providerInterfaceName` fields into
    /// `id`/`provider` and clears the legacy fields.
    async fn sync_vlans(&self) -> Result<(), ControllerError> {
        info!("start to sync vlans");
        let vlans = self.vlans.list(&ListParams::default()).await?;
        for vlan in &vlans {
            let mut updated = vlan.clone();
            let mut needs_update = false;
            if updated.spec.vlan_id != 0 && updated.spec.id == 0 {
                updated.spec.id = updated.spec.vlan_id;
                updated.spec.vlan_id = 0;
                needs_update = true;
            }
            if !updated.spec.provider_interface_name.is_empty() && updated.spec.provider.is_empty() {
                updated.spec.provider = std::mem::take(&mut updated.spec.provider_interface_name);
                needs_update = true;
            }
            if needs_update {
                let name = vlan.name_any();
                if let Err(e) = self.vlans.replace(&name, &PostParams::default(), &updated).await {
                    error!("failed to update spec of vlan {}: {}", name, e);
                    return Err(e.into());
                }
            }
        }
        Ok(())
    }
}
