//! Instance lifecycle orchestration
//!
//! A [`MachineSession`] drives one machine through
//! `Uninitialized → KeyReady → Created → Active → AddressResolved`, with
//! `Failed` reachable from any stage and a separate `Deleting → Deleted` path.
//! Every stage blocks until it succeeds, fails terminally, or runs out of
//! attempts. Start, stop, restart and kill are single gateway calls.

use crate::address::{classify, resolve_address};
use crate::error::{CloudError, Result};
use crate::keypair::{KeyGenerator, KeyPairResolver, KeyStore, SshKeygen};
use crate::model::{AddressClass, Instance, InstanceSpec, IpAddress, KeyPair};
use crate::poller::{PollConfig, poll_until};
use crate::provider::ComputeGateway;
use crate::status::{
    CanonicalState, PROVIDER_ERROR_STATUS, PROVIDER_RUNNING_STATUS, PROVIDER_STOPPED_STATUS,
    map_state,
};
use std::path::PathBuf;
use std::time::Duration;

/// Docker daemon port used in machine URLs
pub const DOCKER_PORT: u16 = 2376;

pub const DEFAULT_ACTIVE_TIMEOUT: Duration = Duration::from_secs(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Uninitialized,
    KeyReady,
    Created,
    Active,
    AddressResolved,
    Failed,
    Deleting,
    Deleted,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LifecyclePhase::Uninitialized => "uninitialized",
            LifecyclePhase::KeyReady => "key-ready",
            LifecyclePhase::Created => "created",
            LifecyclePhase::Active => "active",
            LifecyclePhase::AddressResolved => "address-resolved",
            LifecyclePhase::Failed => "failed",
            LifecyclePhase::Deleting => "deleting",
            LifecyclePhase::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Read-only knobs consumed by a session
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Total budget for each status wait; polled every 4 seconds
    pub active_timeout: Duration,

    pub address_class: AddressClass,

    /// Existing key pair to import; `None` generates a new one
    pub key_pair_name: Option<String>,

    /// Local private key matching `key_pair_name`
    pub private_key_file: Option<PathBuf>,

    pub address_poll: PollConfig,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            active_timeout: DEFAULT_ACTIVE_TIMEOUT,
            address_class: AddressClass::default(),
            key_pair_name: None,
            private_key_file: None,
            address_poll: PollConfig::for_address(),
        }
    }
}

impl LifecycleOptions {
    pub fn status_poll(&self) -> PollConfig {
        PollConfig::for_status(self.active_timeout)
    }
}

/// Owns everything needed to drive a single machine: the gateway (and with
/// it the cached client handles), the key slot, and the instance handle.
pub struct MachineSession<G> {
    name: String,
    gateway: G,
    keys: KeyStore,
    generator: Box<dyn KeyGenerator>,
    options: LifecycleOptions,
    phase: LifecyclePhase,
    instance: Option<Instance>,
    key_pair: Option<KeyPair>,
    ip_address: Option<String>,
    submitted: bool,
}

impl<G: ComputeGateway> MachineSession<G> {
    pub fn new(
        name: impl Into<String>,
        gateway: G,
        keys: KeyStore,
        options: LifecycleOptions,
    ) -> Self {
        Self {
            name: name.into(),
            gateway,
            keys,
            generator: Box::new(SshKeygen::new()),
            options,
            phase: LifecyclePhase::Uninitialized,
            instance: None,
            key_pair: None,
            ip_address: None,
            submitted: false,
        }
    }

    pub fn with_key_generator(mut self, generator: impl KeyGenerator + 'static) -> Self {
        self.generator = Box::new(generator);
        self
    }

    /// Resume control of an instance created by an earlier session
    pub fn attach(mut self, instance_id: impl Into<String>) -> Self {
        self.instance = Some(Instance::new(instance_id));
        self.submitted = true;
        self.phase = LifecyclePhase::Created;
        self
    }

    /// Seed the address cache from a previous resolution
    pub fn with_ip_address(mut self, ip_address: impl Into<String>) -> Self {
        let ip_address = ip_address.into();
        if !ip_address.is_empty() {
            self.ip_address = Some(ip_address);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn instance(&self) -> Option<&Instance> {
        self.instance.as_ref()
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance.as_ref().map(Instance::id)
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    fn transition(&mut self, phase: LifecyclePhase) {
        tracing::debug!("{}: {} -> {}", self.name, self.phase, phase);
        self.phase = phase;
    }

    fn fail<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            tracing::debug!("{}: stage failed: {}", self.name, e);
            self.transition(LifecyclePhase::Failed);
        }
        result
    }

    fn require_instance_id(&self) -> Result<String> {
        self.instance_id()
            .map(str::to_string)
            .ok_or_else(|| CloudError::NotFound(format!("instance for machine '{}'", self.name)))
    }

    /// The key pair is named after the session, so the instance must be too
    fn check_spec(&self, spec: &InstanceSpec) -> Result<()> {
        spec.validate()?;
        if spec.name != self.name {
            return Err(CloudError::Configuration(format!(
                "instance name '{}' does not match machine '{}'",
                spec.name, self.name
            )));
        }
        Ok(())
    }

    /// Full creation flow: key pair, submission, active wait, address
    ///
    /// A failure after submission leaves the instance in place; its id stays
    /// available through [`MachineSession::instance_id`].
    pub async fn create(&mut self, spec: &InstanceSpec) -> Result<String> {
        self.check_spec(spec)?;
        self.prepare_key_pair().await?;
        self.submit(spec).await?;
        self.wait_for_active().await?;
        self.resolve_address().await
    }

    /// `Uninitialized → KeyReady`
    pub async fn prepare_key_pair(&mut self) -> Result<()> {
        if self.submitted {
            return Err(CloudError::Configuration(format!(
                "machine '{}' already has an instance",
                self.name
            )));
        }

        let result = KeyPairResolver::new(&self.gateway, &self.keys, self.generator.as_ref())
            .resolve(
                &self.name,
                self.options.key_pair_name.as_deref(),
                self.options.private_key_file.as_deref(),
            )
            .await;
        if result.is_err() {
            if let Err(e) = self.keys.discard().await {
                tracing::warn!("Failed to discard key slot of {}: {}", self.name, e);
            }
        }
        let key_pair = self.fail(result)?;

        tracing::info!("Using key pair {}", key_pair.display_name);
        self.key_pair = Some(key_pair);
        self.transition(LifecyclePhase::KeyReady);
        Ok(())
    }

    /// `KeyReady → Created`. Runs at most once per session.
    pub async fn submit(&mut self, spec: &InstanceSpec) -> Result<String> {
        if self.submitted {
            return Err(CloudError::Configuration(format!(
                "machine '{}' was already submitted",
                self.name
            )));
        }
        self.check_spec(spec)?;

        let key_pair_id = match &self.key_pair {
            Some(kp) => kp.id.clone(),
            None => {
                return Err(CloudError::Configuration(
                    "key pair must be resolved before creating the instance".to_string(),
                ));
            }
        };

        tracing::info!("Creating instance {}...", spec.name);
        // a failed submission must not be retried, even by the same caller
        self.submitted = true;
        let result = self.gateway.create_instance(spec, &key_pair_id).await;
        let id = self.fail(result)?;

        tracing::info!("Instance {} created with id {}", spec.name, id);
        self.instance = Some(Instance::new(id.clone()));
        self.transition(LifecyclePhase::Created);
        Ok(id)
    }

    /// `Created → Active`
    pub async fn wait_for_active(&mut self) -> Result<()> {
        tracing::info!("Waiting for instance {} to become active...", self.name);
        let result = self.wait_for_status(PROVIDER_RUNNING_STATUS).await;
        self.fail(result)?;
        self.transition(LifecyclePhase::Active);
        Ok(())
    }

    /// `Active → AddressResolved`
    pub async fn resolve_address(&mut self) -> Result<String> {
        let id = self.require_instance_id()?;
        let result = resolve_address(
            &self.gateway,
            &id,
            self.options.address_class,
            &self.options.address_poll,
        )
        .await;
        let address = self.fail(result)?;

        if let Some(instance) = self.instance.as_mut() {
            if !instance.addresses.iter().any(|a| a.address == address) {
                instance.addresses.push(IpAddress::new(&address));
            }
        }
        tracing::info!(
            "Instance {} has {} address {}",
            self.name,
            classify(&address),
            address
        );
        self.ip_address = Some(address.clone());
        self.transition(LifecyclePhase::AddressResolved);
        Ok(address)
    }

    /// Poll until the raw provider status equals `target` exactly
    ///
    /// `ERROR` aborts with [`CloudError::TerminalProvider`]. Read-only, so it
    /// can be repeated safely.
    pub async fn wait_for_status(&mut self, target: &str) -> Result<()> {
        let id = self.require_instance_id()?;
        let config = self.options.status_poll();
        let operation = format!("wait for {} status", target);

        let gateway = &self.gateway;
        let instance_id = id.as_str();

        let outcome = poll_until(&operation, &config, move || async move {
            let record = gateway.get_instance(instance_id).await?;
            tracing::debug!("instance {} status: {}", instance_id, record.status);

            if record.status == PROVIDER_ERROR_STATUS {
                return Err(CloudError::TerminalProvider {
                    instance_id: instance_id.to_string(),
                    status: record.status,
                });
            }
            Ok((record.status == target).then_some(record))
        })
        .await;

        if let Some(instance) = self.instance.as_mut() {
            match &outcome {
                Ok(record) => instance.observe(record),
                Err(CloudError::TerminalProvider { status, .. }) => {
                    instance.raw_status = status.clone();
                    instance.state = CanonicalState::Error;
                }
                Err(_) => {}
            }
        }
        outcome.map(|_| ())
    }

    /// Current canonical state, straight from the provider
    pub async fn state(&mut self) -> Result<CanonicalState> {
        let id = self.require_instance_id()?;
        let record = self.gateway.get_instance(&id).await?;

        if !CanonicalState::is_known_status(&record.status) {
            tracing::warn!(
                "Instance {} reported unrecognised status {:?}; treating it as Unknown",
                id,
                record.status
            );
        }

        let state = map_state(&record.status);
        if let Some(instance) = self.instance.as_mut() {
            instance.observe(&record);
        }
        Ok(state)
    }

    /// Cached address, resolving it first when needed
    pub async fn ip(&mut self) -> Result<String> {
        if let Some(ip) = &self.ip_address {
            return Ok(ip.clone());
        }
        self.resolve_address().await
    }

    pub async fn ssh_hostname(&mut self) -> Result<String> {
        self.ip().await
    }

    /// `tcp://<ip>:2376`; the machine must be running
    pub async fn url(&mut self) -> Result<String> {
        let state = self.state().await?;
        if state != CanonicalState::Running {
            return Err(CloudError::NotRunning {
                name: self.name.clone(),
                state: state.to_string(),
            });
        }

        let ip = self.ip().await?;
        if ip.is_empty() {
            return Ok(String::new());
        }
        Ok(format!("tcp://{}:{}", ip, DOCKER_PORT))
    }

    pub async fn start(&self) -> Result<()> {
        let id = self.require_instance_id()?;
        tracing::info!("Starting instance {}...", self.name);
        self.gateway.start_instance(&id).await
    }

    pub async fn stop(&self) -> Result<()> {
        let id = self.require_instance_id()?;
        tracing::info!("Stopping instance {}...", self.name);
        self.gateway.stop_instance(&id).await
    }

    pub async fn restart(&self) -> Result<()> {
        let id = self.require_instance_id()?;
        tracing::info!("Restarting instance {}...", self.name);
        self.gateway.reboot_instance(&id).await
    }

    /// The provider has no forced power-off; same as [`MachineSession::stop`]
    pub async fn kill(&self) -> Result<()> {
        self.stop().await
    }

    /// Stop (unless already stopped) and delete the instance
    ///
    /// Stopping is best effort: a failed stop or an expired stop wait is logged
    /// and the delete call is still made. Only the delete error propagates.
    pub async fn remove(&mut self) -> Result<()> {
        let id = self.require_instance_id()?;
        self.transition(LifecyclePhase::Deleting);

        let state = match self.state().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Could not query state of {} before removal: {}", self.name, e);
                CanonicalState::Unknown
            }
        };

        if state != CanonicalState::Stopped {
            tracing::info!("Stopping instance {} before removal...", self.name);
            match self.gateway.stop_instance(&id).await {
                Ok(()) => {
                    if let Err(e) = self.wait_for_status(PROVIDER_STOPPED_STATUS).await {
                        tracing::warn!("Instance {} did not stop: {}; deleting anyway", self.name, e);
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to stop instance {}: {}; deleting anyway", self.name, e);
                }
            }
        }

        tracing::info!("Deleting instance {}...", self.name);
        let result = self.gateway.delete_instance(&id).await;
        self.fail(result)?;

        self.instance = None;
        self.ip_address = None;
        self.transition(LifecyclePhase::Deleted);
        Ok(())
    }

    /// Delete the key pair registered under `display_name` on the provider
    pub async fn remove_key_pair(&self, display_name: &str) -> Result<()> {
        let key_pair = self.gateway.get_key_pair_by_display_name(display_name).await?;
        tracing::info!("Deleting key pair {}...", key_pair.display_name);
        self.gateway.delete_key_pair(&key_pair.id).await
    }
}
