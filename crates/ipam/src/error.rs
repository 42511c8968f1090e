//! IPAM errors

use thiserror::Error;

/// Errors that can occur during address management.
///
/// These are stable identifiers: callers match on the variant, never on the
/// message text.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum IpamError {
    /// Static address not within the subnet CIDR host space
    #[error("address out of range")]
    OutOfRange,

    /// Requested address already bound to a different pod
    #[error("address conflict")]
    Conflict,

    /// Subnet absent, or the required family is exhausted
    #[error("no available address")]
    NoAvailable,

    /// CIDR text does not parse, or families do not match the subnet protocol
    #[error("invalid CIDR")]
    InvalidCidr,
}
