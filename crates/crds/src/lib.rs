//! Fabric CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the fabric control plane:
//! subnets, VPCs, VLANs, provider networks, IP records and QoS tiers.
//! All kinds are cluster-scoped under `kubefabric.io/v1`.

pub mod htb_qos;
pub mod ip;
pub mod provider_network;
pub mod subnet;
pub mod vlan;
pub mod vpc;

pub use htb_qos::*;
pub use ip::*;
pub use provider_network::*;
pub use subnet::*;
pub use vlan::*;
pub use vpc::*;
