//! SpeedyFlow Cloud core
//!
//! Drives the lifecycle of a single remote compute instance on top of an
//! eventually-consistent provider control plane. Provider specifics live
//! behind [`ComputeGateway`]; everything here is provider-agnostic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 speedyflow CLI                   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               speedyflow-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │   MachineSession (lifecycle)              │   │
//! │  └──┬──────────────┬──────────────┬─────────┘   │
//! │  ┌──▼─────────┐ ┌──▼─────────┐ ┌──▼─────────┐   │
//! │  │  KeyPair   │ │  Address   │ │  Status    │   │
//! │  │  Resolver  │ │  Resolver  │ │  Mapper    │   │
//! │  └──┬─────────┘ └──┬─────────┘ └────────────┘   │
//! │     └──── Poller ──┘       MachineStore         │
//! └─────────────────┬───────────────────────────────┘
//!                   │ trait ComputeGateway
//! ┌─────────────────▼───────────────────────────────┐
//! │          speedyflow-cloud-speedycloud            │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod address;
pub mod error;
pub mod keypair;
pub mod lifecycle;
pub mod model;
pub mod poller;
pub mod provider;
pub mod state;
pub mod status;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-exports
pub use address::{classify, resolve_address, select_address};
pub use error::{CloudError, Result};
pub use keypair::{
    KeyGenerator, KeyPairResolver, KeyStore, SshKeygen, generated_key_pair_name,
    sanitize_key_pair_name,
};
pub use lifecycle::{LifecycleOptions, LifecyclePhase, MachineSession};
pub use model::{
    AddressClass, Instance, InstanceRecord, InstanceSpec, IpAddress, IpVersion, KeyPair,
};
pub use poller::{PollConfig, poll_until};
pub use provider::ComputeGateway;
pub use state::{MachineRecord, MachineStore, validate_machine_name};
pub use status::{CanonicalState, map_state};
