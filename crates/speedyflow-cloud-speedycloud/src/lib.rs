//! SpeedyCloud provider for SpeedyFlow
//!
//! Implements [`speedyflow_cloud::ComputeGateway`] on top of the SpeedyCloud
//! products API.
//!
//! # Features
//!
//! - Cloud server provisioning, power actions and deletion
//! - SSH key pair registration, lookup by display name, deletion
//! - HMAC-SHA256 request signing
//!
//! # Example
//!
//! ```ignore
//! use speedyflow_cloud::ComputeGateway;
//! use speedyflow_cloud_speedycloud::{DEFAULT_ENDPOINT, SpeedyCloudGateway};
//!
//! let gateway = SpeedyCloudGateway::new(DEFAULT_ENDPOINT, api_key, api_secret);
//! let record = gateway.get_instance("1024").await?;
//! println!("{}", record.status);
//! ```

pub mod client;
pub mod error;
pub mod provider;
pub mod records;

pub use client::{Credentials, ProviderClient, ServiceClient};
pub use error::{Result, SpeedyCloudError};
pub use provider::{DEFAULT_ENDPOINT, SpeedyCloudGateway};
pub use records::{KeyPairRecord, ServerRecord, decode_key_pair, decode_key_pairs, decode_server};
