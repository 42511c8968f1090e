//! Inclusive address ranges and the range-list algebra
//!
//! An `IpRangeList` is the unit the subnet pools are built from: ranges are
//! kept sorted ascending, non-overlapping, with adjacent ranges merged. The
//! set operations (`add`, `remove`, `subtract`) are pure and return a new
//! list, which keeps the pool code easy to reason about and the properties
//! easy to test.

use std::fmt;

use crate::error::IpamError;
use crate::ip::Ip;

/// An inclusive `[start, end]` span of addresses of one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    start: Ip,
    end: Ip,
}

impl IpRange {
    pub fn new(start: Ip, end: Ip) -> Result<Self, IpamError> {
        if start.family() != end.family() || start > end {
            return Err(IpamError::InvalidCidr);
        }
        Ok(IpRange { start, end })
    }

    pub fn single(ip: Ip) -> Self {
        IpRange { start: ip, end: ip }
    }

    pub fn start(&self) -> Ip {
        self.start
    }

    pub fn end(&self) -> Ip {
        self.end
    }

    pub fn contains(&self, ip: Ip) -> bool {
        ip.family() == self.start.family() && self.start <= ip && ip <= self.end
    }

    pub fn count(&self) -> u128 {
        self.start.span(self.end)
    }

    /// Splits into the adjacent halves `[start, at]` and `[at+1, end]`.
    /// `at` must lie inside the range and must not be the end.
    pub fn split(&self, at: Ip) -> Option<(IpRange, IpRange)> {
        if !self.contains(at) || at == self.end {
            return None;
        }
        let lo = IpRange { start: self.start, end: at };
        let hi = IpRange { start: at.next(), end: self.end };
        Some((lo, hi))
    }

    /// Merges with an overlapping or adjacent range of the same family.
    pub fn merge(&self, other: &IpRange) -> Option<IpRange> {
        if self.start.family() != other.start.family() {
            return None;
        }
        let (lo, hi) = if self.start <= other.start { (self, other) } else { (other, self) };
        // adjacent when hi starts exactly one past lo's end
        if hi.start > lo.end && hi.start != lo.end.next() {
            return None;
        }
        Some(IpRange {
            start: lo.start,
            end: if lo.end >= hi.end { lo.end } else { hi.end },
        })
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..{}", self.start, self.end)
        }
    }
}

/// A sorted, non-overlapping, adjacency-merged list of ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IpRangeList {
    ranges: Vec<IpRange>,
}

impl IpRangeList {
    pub fn new() -> Self {
        IpRangeList { ranges: Vec::new() }
    }

    pub fn from_range(range: IpRange) -> Self {
        IpRangeList { ranges: vec![range] }
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpRange> {
        self.ranges.iter()
    }

    /// Total number of addresses across all ranges.
    pub fn count(&self) -> u128 {
        self.ranges.iter().fold(0u128, |acc, r| acc.saturating_add(r.count()))
    }

    pub fn contains(&self, ip: Ip) -> bool {
        self.ranges.iter().any(|r| r.contains(ip))
    }

    /// Inserts a range, coalescing with any ranges it overlaps or touches.
    pub fn add(&self, range: IpRange) -> IpRangeList {
        let mut merged = range;
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        let mut placed = false;
        for r in &self.ranges {
            if let Some(m) = merged.merge(r) {
                merged = m;
            } else if r.start() < merged.start() {
                out.push(*r);
            } else {
                if !placed {
                    out.push(merged);
                    placed = true;
                }
                out.push(*r);
            }
        }
        if !placed {
            out.push(merged);
        }
        IpRangeList { ranges: out }
    }

    /// Removes a single address, splitting its range when it is interior.
    pub fn remove(&self, ip: Ip) -> IpRangeList {
        let mut out = Vec::with_capacity(self.ranges.len() + 1);
        for r in &self.ranges {
            if !r.contains(ip) {
                out.push(*r);
            } else if r.start() == r.end() {
                // the whole range was this one address
            } else if ip == r.start() {
                out.push(IpRange { start: ip.next(), end: r.end() });
            } else if ip == r.end() {
                out.push(IpRange { start: r.start(), end: ip.prev() });
            } else {
                out.push(IpRange { start: r.start(), end: ip.prev() });
                out.push(IpRange { start: ip.next(), end: r.end() });
            }
        }
        IpRangeList { ranges: out }
    }

    /// Set difference: every address of `self` not covered by `other`.
    pub fn subtract(&self, other: &IpRangeList) -> IpRangeList {
        let mut current = self.ranges.clone();
        for o in &other.ranges {
            let mut next = Vec::with_capacity(current.len() + 1);
            for r in &current {
                if o.end() < r.start() || r.end() < o.start() || o.start().family() != r.start().family() {
                    next.push(*r);
                    continue;
                }
                if r.start() < o.start() {
                    next.push(IpRange { start: r.start(), end: o.start().prev() });
                }
                if o.end() < r.end() {
                    next.push(IpRange { start: o.end().next(), end: r.end() });
                }
            }
            current = next;
        }
        IpRangeList { ranges: current }
    }

    /// Removes and returns the lowest address in the list.
    pub fn pop(&mut self) -> Option<Ip> {
        let first = self.ranges.first().copied()?;
        let ip = first.start();
        *self = self.remove(ip);
        Some(ip)
    }

    /// Removes and returns the lowest address not present in `skipped`.
    pub fn allocate_skipping(&mut self, skipped: &[Ip]) -> Option<Ip> {
        let mut found = None;
        'ranges: for r in &self.ranges {
            let mut candidate = r.start();
            loop {
                if !skipped.contains(&candidate) {
                    found = Some(candidate);
                    break 'ranges;
                }
                if candidate == r.end() {
                    break;
                }
                candidate = candidate.next();
            }
        }
        let ip = found?;
        *self = self.remove(ip);
        Some(ip)
    }
}

impl fmt::Display for IpRangeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> Ip {
        s.parse().unwrap()
    }

    fn range(a: &str, b: &str) -> IpRange {
        IpRange::new(ip(a), ip(b)).unwrap()
    }

    #[test]
    fn range_rejects_inverted_and_mixed() {
        assert!(IpRange::new(ip("10.0.0.9"), ip("10.0.0.1")).is_err());
        assert!(IpRange::new(ip("10.0.0.1"), ip("fd00::1")).is_err());
    }

    #[test]
    fn range_split_produces_adjacent_halves() {
        let r = range("10.0.0.1", "10.0.0.10");
        let (lo, hi) = r.split(ip("10.0.0.4")).unwrap();
        assert_eq!(lo, range("10.0.0.1", "10.0.0.4"));
        assert_eq!(hi, range("10.0.0.5", "10.0.0.10"));
        assert!(r.split(ip("10.0.0.10")).is_none());
        assert!(r.split(ip("10.0.0.11")).is_none());
    }

    #[test]
    fn range_merge_overlapping_and_adjacent() {
        let a = range("10.0.0.1", "10.0.0.5");
        assert_eq!(a.merge(&range("10.0.0.3", "10.0.0.9")), Some(range("10.0.0.1", "10.0.0.9")));
        assert_eq!(a.merge(&range("10.0.0.6", "10.0.0.9")), Some(range("10.0.0.1", "10.0.0.9")));
        assert_eq!(a.merge(&range("10.0.0.7", "10.0.0.9")), None);
    }

    #[test]
    fn add_keeps_sorted_and_coalesced() {
        let list = IpRangeList::new()
            .add(range("10.0.0.20", "10.0.0.30"))
            .add(range("10.0.0.1", "10.0.0.5"))
            .add(range("10.0.0.6", "10.0.0.10"));
        let got: Vec<String> = list.iter().map(|r| r.to_string()).collect();
        assert_eq!(got, vec!["10.0.0.1..10.0.0.10", "10.0.0.20..10.0.0.30"]);
        assert_eq!(list.count(), 21);
    }

    #[test]
    fn add_then_remove_is_identity() {
        let base = IpRangeList::from_range(range("10.0.0.1", "10.0.0.10"));
        let touched = base.add(IpRange::single(ip("10.0.0.50"))).remove(ip("10.0.0.50"));
        assert_eq!(touched, base);
    }

    #[test]
    fn remove_interior_splits() {
        let list = IpRangeList::from_range(range("10.0.0.1", "10.0.0.10")).remove(ip("10.0.0.4"));
        let got: Vec<String> = list.iter().map(|r| r.to_string()).collect();
        assert_eq!(got, vec!["10.0.0.1..10.0.0.3", "10.0.0.5..10.0.0.10"]);
    }

    #[test]
    fn remove_edges_and_singleton() {
        let list = IpRangeList::from_range(range("10.0.0.1", "10.0.0.3"));
        assert_eq!(list.remove(ip("10.0.0.1")).to_string(), "[10.0.0.2..10.0.0.3]");
        assert_eq!(list.remove(ip("10.0.0.3")).to_string(), "[10.0.0.1..10.0.0.2]");
        let one = IpRangeList::from_range(IpRange::single(ip("10.0.0.1")));
        assert!(one.remove(ip("10.0.0.1")).is_empty());
    }

    #[test]
    fn subtract_is_set_difference() {
        let free = IpRangeList::from_range(range("10.0.0.1", "10.0.0.14"));
        let reserved = IpRangeList::new()
            .add(IpRange::single(ip("10.0.0.1")))
            .add(range("10.0.0.5", "10.0.0.7"));
        let got = free.subtract(&reserved);
        assert_eq!(got.to_string(), "[10.0.0.2..10.0.0.4, 10.0.0.8..10.0.0.14]");
        assert_eq!(got.count(), 10);
        // subtracting something disjoint changes nothing
        assert_eq!(got.subtract(&IpRangeList::from_range(range("10.1.0.1", "10.1.0.9"))), got);
    }

    #[test]
    fn pop_takes_lowest_first() {
        let mut list = IpRangeList::new()
            .add(range("10.0.0.8", "10.0.0.9"))
            .add(range("10.0.0.2", "10.0.0.3"));
        assert_eq!(list.pop(), Some(ip("10.0.0.2")));
        assert_eq!(list.pop(), Some(ip("10.0.0.3")));
        assert_eq!(list.pop(), Some(ip("10.0.0.8")));
        assert_eq!(list.pop(), Some(ip("10.0.0.9")));
        assert_eq!(list.pop(), None);
    }

    #[test]
    fn allocate_skipping_steps_over_listed_addresses() {
        let mut list = IpRangeList::from_range(range("10.0.0.2", "10.0.0.6"));
        let skipped = vec![ip("10.0.0.2"), ip("10.0.0.3")];
        assert_eq!(list.allocate_skipping(&skipped), Some(ip("10.0.0.4")));
        assert!(list.contains(ip("10.0.0.2")));
        assert!(!list.contains(ip("10.0.0.4")));
    }

    #[test]
    fn allocate_skipping_exhausted() {
        let mut list = IpRangeList::from_range(range("10.0.0.2", "10.0.0.3"));
        let skipped = vec![ip("10.0.0.2"), ip("10.0.0.3")];
        assert_eq!(list.allocate_skipping(&skipped), None);
        assert_eq!(list.count(), 2);
    }

    #[test]
    fn v6_algebra() {
        let list = IpRangeList::from_range(range("fd00::2", "fd00::6")).remove(ip("fd00::4"));
        assert_eq!(list.to_string(), "[fd00::2..fd00::3, fd00::5..fd00::6]");
        let back = list.add(IpRange::single(ip("fd00::4")));
        assert_eq!(back.to_string(), "[fd00::2..fd00::6]");
    }
}
