//! Per-subnet address pool
//!
//! A `Subnet` owns the free/reserved/released range lists and the
//! nic/ip/pod bookkeeping for one subnet, single- or dual-stack. The pool
//! carries its own lock so the registry can hand out `Arc<Subnet>` handles
//! under a shared read lock; all cross-subnet coordination stays in the
//! registry.
//!
//! Free-list policy: an allocation removes the address from `free`; a release
//! appends it to `released`, which is drained back into `free` only when
//! `free` is empty at allocation time. Recently freed addresses therefore get
//! a grace period before reuse.

use std::collections::HashMap;
use std::sync::RwLock;

use ipnet::IpNet;
use tracing::{error, warn};

use crate::error::IpamError;
use crate::ip::{Ip, Protocol};
use crate::range::{IpRange, IpRangeList};
use crate::util;

/// Deterministic locally-administered unicast MAC for a nic key (FNV-1a,
/// folded into the low 40 bits).
fn derive_mac(nic: &str) -> String {
    let mut h: u64 = 0xcbf2_9ce4_8422_2325;
    for b in nic.as_bytes() {
        h ^= u64::from(*b);
        h = h.wrapping_mul(0x0000_0100_0000_01b3);
    }
    let b = h.to_be_bytes();
    format!("0a:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}", b[3], b[4], b[5], b[6], b[7])
}

/// Per-family allocation state: the range lists partition the CIDR host
/// space together with the allocated set held in the maps.
struct FamilyPool {
    cidr: IpNet,
    first: Ip,
    last: Ip,
    free: IpRangeList,
    reserved: IpRangeList,
    released: IpRangeList,
    nic_to_ip: HashMap<String, Ip>,
    ip_to_pod: HashMap<Ip, String>,
    ip_to_nic: HashMap<Ip, String>,
}

impl FamilyPool {
    fn new(cidr: IpNet, excludes: &[String]) -> Self {
        let first = util::first_host(&cidr);
        let last = util::last_host(&cidr);
        let reserved = parse_exclude_ranges(excludes);
        let free = IpRange::new(first, last)
            .map(IpRangeList::from_range)
            .unwrap_or_default();
        let mut pool = FamilyPool {
            cidr,
            first,
            last,
            free,
            reserved,
            released: IpRangeList::new(),
            nic_to_ip: HashMap::new(),
            ip_to_pod: HashMap::new(),
            ip_to_nic: HashMap::new(),
        };
        pool.join_free_with_reserve();
        pool
    }

    /// Subtracts `reserved` from `free`; run after every `free`
    /// reconstruction.
    fn join_free_with_reserve(&mut self) {
        self.free = self.free.subtract(&self.reserved);
    }

    fn in_host_range(&self, ip: Ip) -> bool {
        ip.family() == self.first.family() && self.first <= ip && ip <= self.last
    }

    /// Removes `ip` from whichever range list currently holds it, keeping
    /// the partition disjoint from the allocated set.
    fn claim(&mut self, ip: Ip) {
        if self.free.contains(ip) {
            self.free = self.free.remove(ip);
        } else if self.released.contains(ip) {
            self.released = self.released.remove(ip);
        } else if self.reserved.contains(ip) {
            // static pinning of an operator-excluded address is allowed;
            // exclusions only guard random allocation
            self.reserved = self.reserved.remove(ip);
        }
    }

    /// Lowest free address not in `skipped`. Drains `released` into `free`
    /// only when `free` is empty.
    fn random(&mut self, skipped: &[Ip]) -> Result<Ip, IpamError> {
        if self.free.is_empty() && !self.released.is_empty() {
            self.free = std::mem::take(&mut self.released);
        }
        self.free.allocate_skipping(skipped).ok_or(IpamError::NoAvailable)
    }
}

fn parse_exclude_ranges(entries: &[String]) -> IpRangeList {
    let mut list = IpRangeList::new();
    for entry in entries {
        let range = match entry.split_once("..") {
            Some((a, b)) => match (a.trim().parse::<Ip>(), b.trim().parse::<Ip>()) {
                (Ok(a), Ok(b)) => match IpRange::new(a, b) {
                    Ok(r) => r,
                    Err(_) => continue,
                },
                _ => continue,
            },
            None => match entry.trim().parse::<Ip>() {
                Ok(ip) => IpRange::single(ip),
                Err(_) => continue,
            },
        };
        list = list.add(range);
    }
    list
}

struct SubnetState {
    protocol: Protocol,
    v4: Option<FamilyPool>,
    v6: Option<FamilyPool>,
    nic_to_mac: HashMap<String, String>,
    pod_to_nics: HashMap<String, Vec<String>>,
}

/// A single subnet's address pool. Public operations serialize on the
/// internal lock; queries take it shared.
pub struct Subnet {
    name: String,
    state: RwLock<SubnetState>,
}

impl Subnet {
    pub fn new(name: &str, cidr_block: &str, exclude_ips: &[String]) -> Result<Self, IpamError> {
        let (protocol, v4, v6) = build_pools(cidr_block, exclude_ips)?;
        Ok(Subnet {
            name: name.to_string(),
            state: RwLock::new(SubnetState {
                protocol,
                v4,
                v6,
                nic_to_mac: HashMap::new(),
                pod_to_nics: HashMap::new(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol(&self) -> Protocol {
        self.state.read().expect("subnet lock poisoned").protocol
    }

    /// Replaces the CIDR and exclude set in place, then revalidates every
    /// current allocation against the new host space. Drifted allocations
    /// are logged and dropped; the call itself only fails on unparseable
    /// input.
    pub fn update(&self, cidr_block: &str, exclude_ips: &[String]) -> Result<(), IpamError> {
        let (protocol, v4, v6) = build_pools(cidr_block, exclude_ips)?;
        let mut st = self.state.write().expect("subnet lock poisoned");
        st.protocol = protocol;
        st.v4 = match (v4, st.v4.take()) {
            (Some(mut fresh), Some(old)) => {
                fresh.nic_to_ip = old.nic_to_ip;
                fresh.ip_to_pod = old.ip_to_pod;
                fresh.ip_to_nic = old.ip_to_nic;
                Some(fresh)
            }
            (pool, _) => pool,
        };
        st.v6 = match (v6, st.v6.take()) {
            (Some(mut fresh), Some(old)) => {
                fresh.nic_to_ip = old.nic_to_ip;
                fresh.ip_to_pod = old.ip_to_pod;
                fresh.ip_to_nic = old.ip_to_nic;
                Some(fresh)
            }
            (pool, _) => pool,
        };
        st.revalidate(&self.name, cidr_block);
        Ok(())
    }

    /// Allocates the lowest free address per required family, skipping any
    /// listed addresses. Dual-stack allocation is atomic: a v6 failure rolls
    /// the v4 side back.
    pub fn get_random_address(
        &self,
        pod: &str,
        nic: &str,
        skipped: &[String],
    ) -> Result<(Option<Ip>, Option<Ip>, String), IpamError> {
        let skipped: Vec<Ip> = skipped.iter().filter_map(|s| s.parse().ok()).collect();
        let mut st = self.state.write().expect("subnet lock poisoned");
        match st.protocol {
            Protocol::IPv4 => {
                let ip = st.random_alloc(true, pod, nic, &skipped)?;
                let mac = st.ensure_mac(nic);
                Ok((Some(ip), None, mac))
            }
            Protocol::IPv6 => {
                let ip = st.random_alloc(false, pod, nic, &skipped)?;
                let mac = st.ensure_mac(nic);
                Ok((None, Some(ip), mac))
            }
            Protocol::Dual => {
                let v4 = st.random_alloc(true, pod, nic, &skipped)?;
                let v6 = match st.random_alloc(false, pod, nic, &skipped) {
                    Ok(ip) => ip,
                    Err(e) => {
                        st.undo_alloc(true, pod, nic, v4);
                        return Err(e);
                    }
                };
                let mac = st.ensure_mac(nic);
                Ok((Some(v4), Some(v6), mac))
            }
        }
    }

    /// Binds a specific address to `(pod, nic)`. `force` rebinds an address
    /// held by a different pod; otherwise `check_conflict` decides between a
    /// `Conflict` failure and shared ownership.
    pub fn get_static_address(
        &self,
        pod: &str,
        nic: &str,
        ip: Ip,
        mac: Option<&str>,
        force: bool,
        check_conflict: bool,
    ) -> Result<(Ip, String), IpamError> {
        let mut st = self.state.write().expect("subnet lock poisoned");
        st.static_alloc(pod, nic, ip, mac, force, check_conflict)
    }

    /// Reverts a binding made earlier in the same logical operation,
    /// returning the address straight to `free` (it was never visible).
    pub(crate) fn undo_static(&self, pod: &str, nic: &str, ip: Ip) {
        let mut st = self.state.write().expect("subnet lock poisoned");
        st.undo_alloc(ip.family() == Protocol::IPv4, pod, nic, ip);
    }

    /// Releases every nic owned by `pod` across both families.
    pub fn release_address(&self, pod: &str) {
        let mut st = self.state.write().expect("subnet lock poisoned");
        let nics = st.pod_to_nics.get(pod).cloned().unwrap_or_default();
        for nic in nics {
            st.release_nic(pod, &nic);
        }
    }

    /// Releases a single nic owned by `pod`.
    pub fn release_nic(&self, pod: &str, nic: &str) {
        let mut st = self.state.write().expect("subnet lock poisoned");
        st.release_nic(pod, nic);
    }

    /// Whether the address is currently allocated in this subnet.
    pub fn contain_address(&self, ip: Ip) -> bool {
        let st = self.state.read().expect("subnet lock poisoned");
        st.pool(ip.family() == Protocol::IPv4)
            .map_or(false, |p| p.ip_to_pod.contains_key(&ip))
    }

    /// Whether the address is allocated and at least one of its owners has
    /// not been released.
    pub fn is_ip_assigned_to_pod(&self, ip: Ip) -> bool {
        let st = self.state.read().expect("subnet lock poisoned");
        let Some(pool) = st.pool(ip.family() == Protocol::IPv4) else {
            return false;
        };
        match pool.ip_to_pod.get(&ip) {
            Some(owners) => owners.split(',').any(|p| st.pod_to_nics.contains_key(p)),
            None => false,
        }
    }

    /// The pods currently holding the address.
    pub fn get_pod_by_ip(&self, ip: Ip) -> Vec<String> {
        let st = self.state.read().expect("subnet lock poisoned");
        st.pool(ip.family() == Protocol::IPv4)
            .and_then(|p| p.ip_to_pod.get(&ip))
            .map(|owners| owners.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }

    pub fn pod_nics(&self, pod: &str) -> Vec<String> {
        let st = self.state.read().expect("subnet lock poisoned");
        st.pod_to_nics.get(pod).cloned().unwrap_or_default()
    }

    /// The nic's bindings: `(v4, v6, mac)`.
    pub fn nic_address(&self, nic: &str) -> (Option<Ip>, Option<Ip>, Option<String>) {
        let st = self.state.read().expect("subnet lock poisoned");
        let v4 = st.v4.as_ref().and_then(|p| p.nic_to_ip.get(nic)).copied();
        let v6 = st.v6.as_ref().and_then(|p| p.nic_to_ip.get(nic)).copied();
        (v4, v6, st.nic_to_mac.get(nic).cloned())
    }

    /// Per-family `(used, available)` counts for status reporting.
    pub fn usage(&self) -> SubnetUsage {
        let st = self.state.read().expect("subnet lock poisoned");
        let count = |pool: &Option<FamilyPool>| {
            pool.as_ref().map_or((0, 0), |p| {
                (
                    p.ip_to_pod.len() as u128,
                    p.free.count().saturating_add(p.released.count()),
                )
            })
        };
        let (v4_using, v4_available) = count(&st.v4);
        let (v6_using, v6_available) = count(&st.v6);
        SubnetUsage { v4_using, v4_available, v6_using, v6_available }
    }
}

/// Usage counters for one subnet, per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubnetUsage {
    pub v4_using: u128,
    pub v4_available: u128,
    pub v6_using: u128,
    pub v6_available: u128,
}

fn build_pools(
    cidr_block: &str,
    exclude_ips: &[String],
) -> Result<(Protocol, Option<FamilyPool>, Option<FamilyPool>), IpamError> {
    let protocol = util::check_protocol(cidr_block)?;
    let cidrs = util::parse_cidrs(cidr_block)?;
    let expanded = util::expand_exclude_ips(exclude_ips, &cidrs);
    let (v4_excl, v6_excl) = util::split_ips_by_protocol(&expanded);
    let v4 = cidrs
        .iter()
        .find(|n| matches!(n, IpNet::V4(_)))
        .map(|n| FamilyPool::new(*n, &v4_excl));
    let v6 = cidrs
        .iter()
        .find(|n| matches!(n, IpNet::V6(_)))
        .map(|n| FamilyPool::new(*n, &v6_excl));
    if protocol.has_v4() != v4.is_some() || protocol.has_v6() != v6.is_some() {
        return Err(IpamError::InvalidCidr);
    }
    Ok((protocol, v4, v6))
}

impl SubnetState {
    fn pool(&self, v4: bool) -> Option<&FamilyPool> {
        if v4 { self.v4.as_ref() } else { self.v6.as_ref() }
    }

    fn pool_mut(&mut self, v4: bool) -> Option<&mut FamilyPool> {
        if v4 { self.v4.as_mut() } else { self.v6.as_mut() }
    }

    fn ensure_mac(&mut self, nic: &str) -> String {
        self.nic_to_mac
            .entry(nic.to_string())
            .or_insert_with(|| derive_mac(nic))
            .clone()
    }

    fn track_nic(&mut self, pod: &str, nic: &str) {
        let nics = self.pod_to_nics.entry(pod.to_string()).or_default();
        if !nics.iter().any(|n| n == nic) {
            nics.push(nic.to_string());
        }
    }

    fn random_alloc(&mut self, v4: bool, pod: &str, nic: &str, skipped: &[Ip]) -> Result<Ip, IpamError> {
        let existing = self
            .pool(v4)
            .ok_or(IpamError::NoAvailable)?
            .nic_to_ip
            .get(nic)
            .copied();
        if let Some(existing) = existing {
            if !skipped.contains(&existing) {
                return Ok(existing);
            }
            // the current address is being avoided; give it up and pick anew
            self.drop_family_binding(v4, pod, nic, true);
        }
        let pool = self.pool_mut(v4).ok_or(IpamError::NoAvailable)?;
        let ip = pool.random(skipped)?;
        append_owner(&mut pool.ip_to_pod, ip, pod);
        pool.nic_to_ip.insert(nic.to_string(), ip);
        pool.ip_to_nic.insert(ip, nic.to_string());
        self.track_nic(pod, nic);
        Ok(ip)
    }

    /// Reverts a just-made random allocation, returning the address straight
    /// to `free` (no tombstone: it was never visible to anyone).
    fn undo_alloc(&mut self, v4: bool, pod: &str, nic: &str, ip: Ip) {
        if let Some(pool) = self.pool_mut(v4) {
            pool.nic_to_ip.remove(nic);
            pool.ip_to_nic.remove(&ip);
            if remove_owner(&mut pool.ip_to_pod, ip, pod) {
                pool.free = pool.free.add(IpRange::single(ip));
            }
        }
        let other_bound = self
            .pool(!v4)
            .map_or(false, |p| p.nic_to_ip.contains_key(nic));
        if !other_bound {
            self.nic_to_mac.remove(nic);
            self.untrack_nic(pod, nic);
        }
    }

    fn static_alloc(
        &mut self,
        pod: &str,
        nic: &str,
        ip: Ip,
        mac: Option<&str>,
        force: bool,
        check_conflict: bool,
    ) -> Result<(Ip, String), IpamError> {
        let v4 = ip.family() == Protocol::IPv4;
        {
            let pool = self.pool(v4).ok_or(IpamError::OutOfRange)?;
            if !pool.in_host_range(ip) {
                return Err(IpamError::OutOfRange);
            }
        }
        let mac = match mac.filter(|m| !m.is_empty()) {
            Some(m) => {
                self.nic_to_mac.insert(nic.to_string(), m.to_string());
                m.to_string()
            }
            None => self.ensure_mac(nic),
        };
        let pool = self.pool_mut(v4).ok_or(IpamError::OutOfRange)?;
        if let Some(owners) = pool.ip_to_pod.get(&ip) {
            if !owners.split(',').any(|p| p == pod) {
                if force {
                    // take the address over: the previous owners lose it
                    let stale: Vec<String> = pool
                        .nic_to_ip
                        .iter()
                        .filter(|(_, bound)| **bound == ip)
                        .map(|(n, _)| n.clone())
                        .collect();
                    for n in stale {
                        pool.nic_to_ip.remove(&n);
                    }
                    pool.ip_to_pod.insert(ip, pod.to_string());
                } else if check_conflict {
                    warn!("static address {} already bound to {}", ip, owners);
                    return Err(IpamError::Conflict);
                } else {
                    let appended = format!("{},{}", owners, pod);
                    pool.ip_to_pod.insert(ip, appended);
                }
            }
        } else {
            pool.ip_to_pod.insert(ip, pod.to_string());
        }
        pool.claim(ip);
        pool.nic_to_ip.insert(nic.to_string(), ip);
        pool.ip_to_nic.insert(ip, nic.to_string());
        self.track_nic(pod, nic);
        Ok((ip, mac))
    }

    fn release_nic(&mut self, pod: &str, nic: &str) {
        if !self.pod_to_nics.get(pod).map_or(false, |nics| nics.iter().any(|n| n == nic)) {
            return;
        }
        for v4 in [true, false] {
            let Some(pool) = self.pool_mut(v4) else { continue };
            if let Some(ip) = pool.nic_to_ip.remove(nic) {
                if remove_owner(&mut pool.ip_to_pod, ip, pod) {
                    pool.ip_to_nic.remove(&ip);
                    if pool.in_host_range(ip) {
                        pool.released = pool.released.add(IpRange::single(ip));
                    }
                }
            }
        }
        self.nic_to_mac.remove(nic);
        self.untrack_nic(pod, nic);
    }

    fn untrack_nic(&mut self, pod: &str, nic: &str) {
        if let Some(nics) = self.pod_to_nics.get_mut(pod) {
            nics.retain(|n| n != nic);
            if nics.is_empty() {
                self.pod_to_nics.remove(pod);
            }
        }
    }

    /// Removes one family's binding without tombstoning the address (used
    /// when the address is leaving the pool, not returning to it).
    fn drop_family_binding(&mut self, v4: bool, pod: &str, nic: &str, reusable: bool) {
        if let Some(pool) = self.pool_mut(v4) {
            if let Some(ip) = pool.nic_to_ip.remove(nic) {
                if remove_owner(&mut pool.ip_to_pod, ip, pod) {
                    pool.ip_to_nic.remove(&ip);
                    if reusable && pool.in_host_range(ip) {
                        pool.released = pool.released.add(IpRange::single(ip));
                    }
                }
            }
        }
        let other_bound = self
            .pool(!v4)
            .map_or(false, |p| p.nic_to_ip.contains_key(nic));
        if !other_bound {
            self.nic_to_mac.remove(nic);
            self.untrack_nic(pod, nic);
        }
    }

    /// Re-checks every allocation against the (possibly rewritten) host
    /// space. Addresses that no longer fit are dropped from the pool.
    fn revalidate(&mut self, subnet: &str, cidr_block: &str) {
        for v4 in [true, false] {
            let entries: Vec<(String, Ip, String)> = match self.pool(v4) {
                Some(pool) => pool
                    .nic_to_ip
                    .iter()
                    .map(|(nic, ip)| {
                        let owners = pool.ip_to_pod.get(ip).cloned().unwrap_or_default();
                        (nic.clone(), *ip, owners)
                    })
                    .collect(),
                None => Vec::new(),
            };
            for (nic, ip, owners) in entries {
                let mac = self.nic_to_mac.get(&nic).cloned();
                for pod in owners.split(',').filter(|p| !p.is_empty()) {
                    if let Err(e) =
                        self.static_alloc(pod, &nic, ip, mac.as_deref(), true, true)
                    {
                        error!(
                            "{} address {} no longer fits subnet {} cidr {}: {}",
                            pod, ip, subnet, cidr_block, e
                        );
                        self.drop_family_binding(v4, pod, &nic, false);
                    }
                }
            }
        }
    }
}

/// Appends `pod` to the comma-joined owner list for `ip`.
fn append_owner(map: &mut HashMap<Ip, String>, ip: Ip, pod: &str) {
    match map.get_mut(&ip) {
        Some(owners) if !owners.split(',').any(|p| p == pod) => {
            owners.push(',');
            owners.push_str(pod);
        }
        Some(_) => {}
        None => {
            map.insert(ip, pod.to_string());
        }
    }
}

/// Removes `pod` from the owner list; returns true when the address has no
/// owners left and should leave the allocated set.
fn remove_owner(map: &mut HashMap<Ip, String>, ip: Ip, pod: &str) -> bool {
    let Some(owners) = map.get(&ip) else {
        return false;
    };
    let remaining: Vec<&str> = owners.split(',').filter(|p| *p != pod && !p.is_empty()).collect();
    if remaining.is_empty() {
        map.remove(&ip);
        true
    } else {
        map.insert(ip, remaining.join(","));
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ip {
        s.parse().unwrap()
    }

    #[test]
    fn sequential_allocation_until_exhausted() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &["10.0.0.1".to_string()]).unwrap();
        let mut got = Vec::new();
        for i in 0..5 {
            let (v4, _, _) = subnet
                .get_random_address(&format!("ns/pod{}", i), &format!("nic{}", i), &[])
                .unwrap();
            got.push(v4.unwrap().to_string());
        }
        assert_eq!(got, vec!["10.0.0.2", "10.0.0.3", "10.0.0.4", "10.0.0.5", "10.0.0.6"]);
        assert_eq!(
            subnet.get_random_address("ns/pod5", "nic5", &[]),
            Err(IpamError::NoAvailable)
        );
    }

    #[test]
    fn random_allocation_is_idempotent_per_nic() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        let (a, _, mac_a) = subnet.get_random_address("ns/a", "nic-a", &[]).unwrap();
        let (b, _, mac_b) = subnet.get_random_address("ns/a", "nic-a", &[]).unwrap();
        assert_eq!(a, b);
        assert_eq!(mac_a, mac_b);
    }

    #[test]
    fn skipped_addresses_are_avoided() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        let (v4, _, _) = subnet
            .get_random_address("ns/a", "nic-a", &["10.0.0.1".to_string(), "10.0.0.2".to_string()])
            .unwrap();
        assert_eq!(v4.unwrap().to_string(), "10.0.0.3");
    }

    #[test]
    fn static_conflict_and_sharing() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.3"), None, false, true)
            .unwrap();
        // same address for a different pod with conflict checking fails
        assert_eq!(
            subnet
                .get_static_address("B/b", "b.nic", ip("10.0.0.3"), None, false, true)
                .map(|_| ()),
            Err(IpamError::Conflict)
        );
        // without conflict checking the address is shared and the new pod
        // becomes an owner
        subnet
            .get_static_address("B/b", "b.nic", ip("10.0.0.3"), None, false, false)
            .unwrap();
        let owners = subnet.get_pod_by_ip(ip("10.0.0.3"));
        assert_eq!(owners, vec!["A/a", "B/b"]);
        let (v4, _, _) = subnet.nic_address("b.nic");
        assert_eq!(v4, Some(ip("10.0.0.3")));
    }

    #[test]
    fn static_force_rebinds() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.3"), None, false, true)
            .unwrap();
        subnet
            .get_static_address("B/b", "b.nic", ip("10.0.0.3"), None, true, true)
            .unwrap();
        assert_eq!(subnet.get_pod_by_ip(ip("10.0.0.3")), vec!["B/b"]);
        let (v4, _, _) = subnet.nic_address("a.nic");
        assert_eq!(v4, None);
    }

    #[test]
    fn static_boundaries() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        // first and last host succeed
        subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.1"), None, false, true)
            .unwrap();
        subnet
            .get_static_address("B/b", "b.nic", ip("10.0.0.6"), None, false, true)
            .unwrap();
        // network, broadcast and outside fail
        for bad in ["10.0.0.0", "10.0.0.7", "10.0.1.1"] {
            assert_eq!(
                subnet
                    .get_static_address("C/c", "c.nic", ip(bad), None, false, true)
                    .map(|_| ()),
                Err(IpamError::OutOfRange)
            );
        }
        // wrong family on a v4-only subnet
        assert_eq!(
            subnet
                .get_static_address("C/c", "c.nic", ip("fd00::2"), None, false, true)
                .map(|_| ()),
            Err(IpamError::OutOfRange)
        );
    }

    #[test]
    fn static_can_pin_excluded_address() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &["10.0.0.2".to_string()]).unwrap();
        subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.2"), None, false, true)
            .unwrap();
        assert!(subnet.contain_address(ip("10.0.0.2")));
    }

    #[test]
    fn released_addresses_get_a_grace_period() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        let (first, _, _) = subnet.get_random_address("ns/a", "a.nic", &[]).unwrap();
        assert_eq!(first.unwrap().to_string(), "10.0.0.1");
        subnet.release_address("ns/a");
        // free is not empty, so the released address is not handed out again
        let (next, _, _) = subnet.get_random_address("ns/b", "b.nic", &[]).unwrap();
        assert_eq!(next.unwrap().to_string(), "10.0.0.2");
    }

    #[test]
    fn released_addresses_recirculate_when_free_is_empty() {
        let subnet = Subnet::new("s1", "10.0.0.0/30", &[]).unwrap();
        // /30 has two hosts: .1 and .2
        subnet.get_random_address("ns/a", "a.nic", &[]).unwrap();
        subnet.get_random_address("ns/b", "b.nic", &[]).unwrap();
        subnet.release_address("ns/a");
        let (v4, _, _) = subnet.get_random_address("ns/c", "c.nic", &[]).unwrap();
        assert_eq!(v4.unwrap().to_string(), "10.0.0.1");
    }

    #[test]
    fn dual_stack_random_is_atomic() {
        // one v4 host but no usable v6 hosts: v6 allocation fails and the
        // v4 side must be rolled back
        let subnet = Subnet::new("s1", "10.0.0.0/30,fd00::/125", &[
            "fd00::1..fd00::7".to_string(),
        ])
        .unwrap();
        assert_eq!(
            subnet.get_random_address("ns/a", "a.nic", &[]),
            Err(IpamError::NoAvailable)
        );
        assert!(!subnet.contain_address(ip("10.0.0.1")));
        // the rolled back address is immediately allocatable again
        let (got, _) = subnet
            .get_static_address("ns/b", "b.nic", ip("10.0.0.1"), None, false, true)
            .unwrap();
        assert_eq!(got.to_string(), "10.0.0.1");
    }

    #[test]
    fn dual_stack_random_allocates_both_families() {
        let subnet = Subnet::new("s1", "10.0.0.0/29,fd00::/125", &[]).unwrap();
        let (v4, v6, mac) = subnet.get_random_address("ns/a", "a.nic", &[]).unwrap();
        assert_eq!(v4.unwrap().to_string(), "10.0.0.1");
        assert_eq!(v6.unwrap().to_string(), "fd00::1");
        assert!(!mac.is_empty());
    }

    #[test]
    fn mac_is_deterministic_and_stable_per_nic() {
        assert_eq!(derive_mac("pod.default"), derive_mac("pod.default"));
        assert_ne!(derive_mac("pod.default"), derive_mac("other.default"));
        // locally administered unicast prefix
        assert!(derive_mac("pod.default").starts_with("0a:"));

        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        let (_, _, mac) = subnet.get_random_address("ns/a", "a.nic", &[]).unwrap();
        assert_eq!(mac, derive_mac("a.nic"));
    }

    #[test]
    fn explicit_mac_is_kept() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        let (_, mac) = subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.2"), Some("00:00:00:11:22:33"), false, true)
            .unwrap();
        assert_eq!(mac, "00:00:00:11:22:33");
        let (_, _, stored) = subnet.nic_address("a.nic");
        assert_eq!(stored.as_deref(), Some("00:00:00:11:22:33"));
    }

    #[test]
    fn release_forgets_pod_state() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        subnet.get_random_address("ns/a", "a.nic", &[]).unwrap();
        assert!(subnet.is_ip_assigned_to_pod(ip("10.0.0.1")));
        subnet.release_address("ns/a");
        assert!(!subnet.is_ip_assigned_to_pod(ip("10.0.0.1")));
        assert!(!subnet.contain_address(ip("10.0.0.1")));
        assert!(subnet.pod_nics("ns/a").is_empty());
    }

    #[test]
    fn shared_address_survives_one_owner_release() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.3"), None, false, true)
            .unwrap();
        subnet
            .get_static_address("B/b", "b.nic", ip("10.0.0.3"), None, false, false)
            .unwrap();
        subnet.release_address("A/a");
        assert!(subnet.contain_address(ip("10.0.0.3")));
        assert_eq!(subnet.get_pod_by_ip(ip("10.0.0.3")), vec!["B/b"]);
    }

    #[test]
    fn update_preserves_fitting_allocations() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &[]).unwrap();
        subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.3"), None, false, true)
            .unwrap();
        subnet.update("10.0.0.0/28", &[]).unwrap();
        assert!(subnet.contain_address(ip("10.0.0.3")));
        // the surviving allocation is not double-allocatable
        assert_eq!(
            subnet
                .get_static_address("B/b", "b.nic", ip("10.0.0.3"), None, false, true)
                .map(|_| ()),
            Err(IpamError::Conflict)
        );
    }

    #[test]
    fn update_drops_drifted_allocations() {
        let subnet = Subnet::new("s1", "10.0.0.0/28", &[]).unwrap();
        subnet
            .get_static_address("A/a", "a.nic", ip("10.0.0.14"), None, false, true)
            .unwrap();
        subnet.update("10.0.0.0/29", &[]).unwrap();
        assert!(!subnet.contain_address(ip("10.0.0.14")));
        // the shrunk pool still allocates normally
        let (v4, _, _) = subnet.get_random_address("ns/b", "b.nic", &[]).unwrap();
        assert_eq!(v4.unwrap().to_string(), "10.0.0.1");
    }

    #[test]
    fn usage_counters() {
        let subnet = Subnet::new("s1", "10.0.0.0/29", &["10.0.0.1".to_string()]).unwrap();
        subnet.get_random_address("ns/a", "a.nic", &[]).unwrap();
        let usage = subnet.usage();
        assert_eq!(usage.v4_using, 1);
        // 6 hosts - 1 excluded - 1 allocated
        assert_eq!(usage.v4_available, 4);
        assert_eq!(usage.v6_using, 0);
    }
}
