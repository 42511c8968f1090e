//! Controller-specific error types.

use ipam::IpamError;
use kube::Error as KubeError;
use ovn_client::OvnError;
use thiserror::Error;

/// Errors that can occur in the fabric controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Northbound database error
    #[error("northbound error: {0}")]
    Ovn(#[from] OvnError),

    /// Address management error
    #[error("IPAM error: {0}")]
    Ipam(#[from] IpamError),

    /// JSON serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
