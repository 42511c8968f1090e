//! Logical-network northbound client
//!
//! Typed operations against the northbound database the fabric control
//! plane drives: logical routers and switches, switch ports and their
//! external-IDs, address sets, router policies and chassis tags.
//!
//! # Example
//!
//! ```no_run
//! use ovn_client::{OvnNbClient, OvnNbClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OvnNbClient::new("http://ovn-nb-gateway:8641".to_string())?;
//!
//! // Ensure the cluster router exists
//! let routers = client.list_logical_routers().await?;
//! if !routers.iter().any(|r| r.name == "cluster-router") {
//!     client.create_logical_router("cluster-router").await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod ovn_trait;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::OvnNbClient;
pub use error::OvnError;
pub use models::*;
pub use ovn_trait::OvnNbClientTrait;
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockOvnNbClient;
