//! In-memory IP address management
//!
//! The allocator behind the fabric control plane: a registry of per-subnet
//! pools that owns IPv4/IPv6/MAC assignment for workload interfaces. State
//! is process-resident only; on startup the controller rebuilds it from the
//! authoritative cluster records.
//!
//! Locking: the registry's read-write lock is taken exclusively only by
//! [`Ipam::add_or_update_subnet`] and [`Ipam::delete_subnet`]. Every other
//! operation takes it shared and relies on the per-subnet lock for
//! serialization. No operation holds two subnet locks at once.

pub mod error;
pub mod ip;
pub mod range;
pub mod subnet;
pub mod util;

pub use error::IpamError;
pub use ip::{Ip, Protocol};
pub use range::{IpRange, IpRangeList};
pub use subnet::{Subnet, SubnetUsage};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

/// One address a pod holds in one subnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetAddress {
    pub subnet: String,
    pub ip: Ip,
    pub mac: String,
}

/// The subnet registry. Cheap to share behind an `Arc`.
#[derive(Default)]
pub struct Ipam {
    subnets: RwLock<HashMap<String, Arc<Subnet>>>,
}

impl Ipam {
    pub fn new() -> Self {
        Ipam::default()
    }

    fn subnet(&self, name: &str) -> Option<Arc<Subnet>> {
        self.subnets
            .read()
            .expect("ipam lock poisoned")
            .get(name)
            .cloned()
    }

    /// Creates the subnet, or mutates an existing one in place (CIDR change
    /// protocol: rebuild the range lists, then revalidate every current
    /// allocation against the new host space).
    pub fn add_or_update_subnet(
        &self,
        name: &str,
        cidr_block: &str,
        exclude_ips: &[String],
    ) -> Result<(), IpamError> {
        let mut subnets = self.subnets.write().expect("ipam lock poisoned");
        if let Some(subnet) = subnets.get(name) {
            return subnet.update(cidr_block, exclude_ips);
        }
        let subnet = Subnet::new(name, cidr_block, exclude_ips)?;
        info!("adding new subnet {}", name);
        subnets.insert(name.to_string(), Arc::new(subnet));
        Ok(())
    }

    pub fn delete_subnet(&self, name: &str) {
        let mut subnets = self.subnets.write().expect("ipam lock poisoned");
        info!("delete subnet {}", name);
        subnets.remove(name);
    }

    pub fn subnet_exists(&self, name: &str) -> bool {
        self.subnets
            .read()
            .expect("ipam lock poisoned")
            .contains_key(name)
    }

    /// Allocates the lowest free address per required family.
    pub fn get_random_address(
        &self,
        pod: &str,
        nic: &str,
        subnet_name: &str,
        skipped: &[String],
    ) -> Result<(Option<Ip>, Option<Ip>, String), IpamError> {
        let subnet = self.subnet(subnet_name).ok_or(IpamError::NoAvailable)?;
        let (v4, v6, mac) = subnet.get_random_address(pod, nic, skipped)?;
        info!(
            "allocate v4 {} v6 {} mac {} for {}",
            v4.map(|i| i.to_string()).unwrap_or_default(),
            v6.map(|i| i.to_string()).unwrap_or_default(),
            mac,
            pod
        );
        Ok((v4, v6, mac))
    }

    /// Binds specific addresses to `(pod, nic)`. `ips` is a single address
    /// or a comma-joined `"v4,v6"` pair; every part must succeed, and a
    /// partial dual-stack failure rolls back what this call allocated.
    pub fn get_static_address(
        &self,
        pod: &str,
        nic: &str,
        ips: &str,
        mac: Option<&str>,
        subnet_name: &str,
        check_conflict: bool,
    ) -> Result<(Option<Ip>, Option<Ip>, String), IpamError> {
        let subnet = self.subnet(subnet_name).ok_or(IpamError::NoAvailable)?;
        let mut v4 = None;
        let mut v6 = None;
        let mut out_mac = String::new();
        let mut fresh: Vec<Ip> = Vec::new();
        for part in ips.split(',') {
            let ip: Ip = part.parse().map_err(|_| IpamError::OutOfRange)?;
            let is_v4 = ip.family() == Protocol::IPv4;
            let (pre_v4, pre_v6, _) = subnet.nic_address(nic);
            let pre_existing = (if is_v4 { pre_v4 } else { pre_v6 }) == Some(ip);
            match subnet.get_static_address(pod, nic, ip, mac, false, check_conflict) {
                Ok((got, m)) => {
                    if !pre_existing {
                        fresh.push(got);
                    }
                    out_mac = m;
                    if is_v4 {
                        v4 = Some(got);
                    } else {
                        v6 = Some(got);
                    }
                }
                Err(e) => {
                    for ip in fresh {
                        subnet.undo_static(pod, nic, ip);
                    }
                    return Err(e);
                }
            }
        }
        info!(
            "allocate v4 {} v6 {} mac {} for {}",
            v4.map(|i| i.to_string()).unwrap_or_default(),
            v6.map(|i| i.to_string()).unwrap_or_default(),
            out_mac,
            pod
        );
        Ok((v4, v6, out_mac))
    }

    /// Completes a one-sided allocation on a dual-stack subnet with a random
    /// address of the missing family. Two addresses (or a non-dual subnet)
    /// pass through unchanged.
    pub fn check_and_append_ips_for_dual(
        &self,
        pod: &str,
        nic: &str,
        subnet_name: &str,
        ips: &[Ip],
    ) -> Result<Vec<Ip>, IpamError> {
        let subnet = self.subnet(subnet_name).ok_or(IpamError::NoAvailable)?;
        if subnet.protocol() != Protocol::Dual || ips.len() == 2 {
            return Ok(ips.to_vec());
        }
        // the nic keeps its existing address; only the missing family is new
        let (v4, v6, _) = subnet.get_random_address(pod, nic, &[])?;
        Ok([v4, v6].into_iter().flatten().collect())
    }

    /// Releases every nic the pod owns, in every subnet. Each subnet's lock
    /// is taken independently; no cross-subnet atomicity.
    pub fn release_address_by_pod(&self, pod: &str) {
        let subnets: Vec<Arc<Subnet>> = self
            .subnets
            .read()
            .expect("ipam lock poisoned")
            .values()
            .cloned()
            .collect();
        for subnet in subnets {
            subnet.release_address(pod);
        }
    }

    /// Releases a single nic of a pod in the named subnet.
    pub fn release_ip_by_pod_and_nic(
        &self,
        pod: &str,
        nic: &str,
        subnet_name: &str,
    ) -> Result<(), IpamError> {
        let subnet = self.subnet(subnet_name).ok_or(IpamError::NoAvailable)?;
        subnet.release_nic(pod, nic);
        Ok(())
    }

    /// Every address the pod holds, across all subnets. A dual-stack
    /// allocation yields one entry per family under the same nic.
    pub fn get_pod_address(&self, pod: &str) -> Vec<SubnetAddress> {
        let subnets: Vec<Arc<Subnet>> = self
            .subnets
            .read()
            .expect("ipam lock poisoned")
            .values()
            .cloned()
            .collect();
        let mut addresses = Vec::new();
        for subnet in subnets {
            for nic in subnet.pod_nics(pod) {
                let (v4, v6, mac) = subnet.nic_address(&nic);
                let mac = mac.unwrap_or_default();
                if let Some(ip) = v4 {
                    addresses.push(SubnetAddress {
                        subnet: subnet.name().to_string(),
                        ip,
                        mac: mac.clone(),
                    });
                }
                if let Some(ip) = v6 {
                    addresses.push(SubnetAddress {
                        subnet: subnet.name().to_string(),
                        ip,
                        mac: mac.clone(),
                    });
                }
            }
        }
        addresses
    }

    /// Whether the textual address is allocated in any subnet.
    pub fn contain_address(&self, address: &str) -> bool {
        let Ok(ip) = address.parse::<Ip>() else {
            return false;
        };
        let subnets: Vec<Arc<Subnet>> = self
            .subnets
            .read()
            .expect("ipam lock poisoned")
            .values()
            .cloned()
            .collect();
        subnets.iter().any(|s| s.contain_address(ip))
    }

    pub fn is_ip_assigned_to_pod(&self, address: &str, subnet_name: &str) -> bool {
        let Ok(ip) = address.parse::<Ip>() else {
            return false;
        };
        self.subnet(subnet_name)
            .map_or(false, |s| s.is_ip_assigned_to_pod(ip))
    }

    pub fn get_pod_by_ip(&self, address: &str, subnet_name: &str) -> Vec<String> {
        let Ok(ip) = address.parse::<Ip>() else {
            return Vec::new();
        };
        self.subnet(subnet_name)
            .map(|s| s.get_pod_by_ip(ip))
            .unwrap_or_default()
    }

    /// Per-family usage counters for the named subnet.
    pub fn subnet_usage(&self, name: &str) -> Option<SubnetUsage> {
        self.subnet(name).map(|s| s.usage())
    }
}
