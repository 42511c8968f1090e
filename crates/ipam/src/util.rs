//! Protocol and CIDR string helpers
//!
//! Cluster records carry addresses and CIDR blocks as text, with dual-stack
//! values comma-joined as `"v4,v6"`. These helpers classify and split that
//! text and compute the usable host span of a CIDR block.

use ipnet::IpNet;
use std::net::IpAddr;

use crate::error::IpamError;
use crate::ip::{Ip, Protocol};

/// Classifies a comma-joined CIDR or address string.
///
/// A single entry yields its family; exactly one entry per family yields
/// `Dual`. Anything else fails.
pub fn check_protocol(s: &str) -> Result<Protocol, IpamError> {
    let mut v4 = 0;
    let mut v6 = 0;
    for part in s.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(IpamError::InvalidCidr);
        }
        let addr = match part.split('/').next().unwrap_or(part).parse::<IpAddr>() {
            Ok(a) => a,
            Err(_) => return Err(IpamError::InvalidCidr),
        };
        match addr {
            IpAddr::V4(_) => v4 += 1,
            IpAddr::V6(_) => v6 += 1,
        }
    }
    match (v4, v6) {
        (1, 0) => Ok(Protocol::IPv4),
        (0, 1) => Ok(Protocol::IPv6),
        (1, 1) => Ok(Protocol::Dual),
        _ => Err(IpamError::InvalidCidr),
    }
}

/// Parses a comma-joined CIDR string into its blocks.
pub fn parse_cidrs(s: &str) -> Result<Vec<IpNet>, IpamError> {
    let mut cidrs = Vec::new();
    for part in s.split(',') {
        let net: IpNet = part.trim().parse().map_err(|_| IpamError::InvalidCidr)?;
        cidrs.push(net.trunc());
    }
    Ok(cidrs)
}

/// Splits a `"v4,v6"` (or single) address string into per-family parts.
pub fn split_string_ip(s: &str) -> (Option<String>, Option<String>) {
    let mut v4 = None;
    let mut v6 = None;
    for part in s.split(',') {
        let part = part.trim();
        match part.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => v4 = Some(part.to_string()),
            Ok(IpAddr::V6(_)) => v6 = Some(part.to_string()),
            Err(_) => {}
        }
    }
    (v4, v6)
}

/// Splits entries (single addresses or `a..b` spans) by family, keyed on the
/// entry's first address. Malformed entries are dropped.
pub fn split_ips_by_protocol(entries: &[String]) -> (Vec<String>, Vec<String>) {
    let mut v4 = Vec::new();
    let mut v6 = Vec::new();
    for entry in entries {
        let head = entry.split("..").next().unwrap_or(entry).trim();
        match head.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => v4.push(entry.clone()),
            Ok(IpAddr::V6(_)) => v6.push(entry.clone()),
            Err(_) => {}
        }
    }
    (v4, v6)
}

/// First usable host address of a CIDR block (one past the network address).
pub fn first_host(net: &IpNet) -> Ip {
    Ip::from(net.network()).next()
}

/// Last usable host address: one before the broadcast address for IPv4, the
/// last address for IPv6 (which has no broadcast).
pub fn last_host(net: &IpNet) -> Ip {
    match net {
        IpNet::V4(_) => Ip::from(net.broadcast()).prev(),
        IpNet::V6(_) => Ip::from(net.broadcast()),
    }
}

/// Whether `ip` lies inside the usable host span of `net`.
pub fn host_range_contains(net: &IpNet, ip: Ip) -> bool {
    let first = first_host(net);
    let last = last_host(net);
    ip.family() == first.family() && first <= ip && ip <= last && first <= last
}

/// Whether a textual CIDR contains a textual address. Either side failing to
/// parse yields false.
pub fn cidr_contains_ip(cidr: &str, ip: &str) -> bool {
    let net: IpNet = match cidr.trim().parse() {
        Ok(n) => n,
        Err(_) => return false,
    };
    let addr: IpAddr = match ip.trim().parse() {
        Ok(a) => a,
        Err(_) => return false,
    };
    net.contains(&addr)
}

/// Normalizes an operator-supplied exclude list against a set of CIDR
/// blocks: entries are single addresses or `a..b` spans, clamped to the
/// matching block's host span; entries that do not parse or fall wholly
/// outside every block are dropped.
pub fn expand_exclude_ips(excludes: &[String], cidrs: &[IpNet]) -> Vec<String> {
    let mut out = Vec::new();
    for entry in excludes {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (start, end) = match entry.split_once("..") {
            Some((a, b)) => match (a.trim().parse::<Ip>(), b.trim().parse::<Ip>()) {
                (Ok(a), Ok(b)) if a.family() == b.family() && a <= b => (a, b),
                _ => continue,
            },
            None => match entry.parse::<Ip>() {
                Ok(ip) => (ip, ip),
                Err(_) => continue,
            },
        };
        let Some(net) = cidrs.iter().find(|n| {
            first_host(n).family() == start.family()
                && !(end < first_host(n) || last_host(n) < start)
        }) else {
            continue;
        };
        let lo = if start < first_host(net) { first_host(net) } else { start };
        let hi = if end > last_host(net) { last_host(net) } else { end };
        if lo == hi {
            out.push(lo.to_string());
        } else {
            out.push(format!("{}..{}", lo, hi));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_classification() {
        assert_eq!(check_protocol("10.16.0.0/16").unwrap(), Protocol::IPv4);
        assert_eq!(check_protocol("fd00::/64").unwrap(), Protocol::IPv6);
        assert_eq!(check_protocol("10.16.0.0/16,fd00::/64").unwrap(), Protocol::Dual);
        assert_eq!(check_protocol("10.0.0.2,fd00::2").unwrap(), Protocol::Dual);
        assert!(check_protocol("").is_err());
        assert!(check_protocol("10.16.0.0/16,10.17.0.0/16").is_err());
        assert!(check_protocol("not-a-cidr").is_err());
    }

    #[test]
    fn split_string_ip_handles_single_and_dual() {
        assert_eq!(split_string_ip("10.0.0.2"), (Some("10.0.0.2".into()), None));
        assert_eq!(split_string_ip("fd00::2"), (None, Some("fd00::2".into())));
        assert_eq!(
            split_string_ip("10.0.0.2,fd00::2"),
            (Some("10.0.0.2".into()), Some("fd00::2".into()))
        );
    }

    #[test]
    fn host_span_bounds() {
        let net: IpNet = "10.0.0.0/29".parse().unwrap();
        assert_eq!(first_host(&net).to_string(), "10.0.0.1");
        assert_eq!(last_host(&net).to_string(), "10.0.0.6");
        assert!(host_range_contains(&net, "10.0.0.1".parse().unwrap()));
        assert!(host_range_contains(&net, "10.0.0.6".parse().unwrap()));
        assert!(!host_range_contains(&net, "10.0.0.0".parse().unwrap()));
        assert!(!host_range_contains(&net, "10.0.0.7".parse().unwrap()));

        let v6: IpNet = "fd00::/125".parse().unwrap();
        assert_eq!(first_host(&v6).to_string(), "fd00::1");
        assert_eq!(last_host(&v6).to_string(), "fd00::7");
    }

    #[test]
    fn exclude_expansion_clamps_and_drops() {
        let cidrs = vec!["10.0.0.0/24".parse().unwrap()];
        let excludes = vec![
            "10.0.0.1".to_string(),
            "10.0.0.10..10.0.0.20".to_string(),
            "10.0.0.250..10.0.1.5".to_string(), // clamped to .254
            "192.168.0.1".to_string(),          // outside
            "fd00::1".to_string(),              // wrong family
            "bogus".to_string(),
        ];
        let got = expand_exclude_ips(&excludes, &cidrs);
        assert_eq!(
            got,
            vec!["10.0.0.1", "10.0.0.10..10.0.0.20", "10.0.0.250..10.0.0.254"]
        );
    }

    #[test]
    fn split_by_protocol_keys_on_first_address() {
        let entries = vec![
            "10.0.0.1".to_string(),
            "10.0.0.4..10.0.0.6".to_string(),
            "fd00::1".to_string(),
        ];
        let (v4, v6) = split_ips_by_protocol(&entries);
        assert_eq!(v4, vec!["10.0.0.1", "10.0.0.4..10.0.0.6"]);
        assert_eq!(v6, vec!["fd00::1"]);
    }
}
