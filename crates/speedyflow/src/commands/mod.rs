pub mod create;
pub mod ip;
pub mod rm;
pub mod start;
pub mod status;
pub mod stop;

use speedyflow_cloud::{MachineRecord, MachineSession, MachineStore};
use speedyflow_cloud_speedycloud::SpeedyCloudGateway;
use speedyflow_config::DriverConfig;

pub type Session = MachineSession<SpeedyCloudGateway>;

/// Configuration plus the machine store it points at
pub struct Context {
    pub config: DriverConfig,
    pub store: MachineStore,
}

impl Context {
    pub fn new(config: DriverConfig) -> anyhow::Result<Self> {
        let store = MachineStore::new(config.storage_dir()?);
        tracing::debug!("Machine store: {}", store.root().display());
        Ok(Self { config, store })
    }

    fn gateway(&self) -> SpeedyCloudGateway {
        SpeedyCloudGateway::new(
            &self.config.endpoint,
            &self.config.api_key,
            &self.config.api_secret,
        )
    }

    /// Fresh session for a machine that does not exist yet
    pub fn new_session(&self, name: &str) -> anyhow::Result<Session> {
        self.config.validate()?;
        Ok(MachineSession::new(
            name,
            self.gateway(),
            self.store.key_store(name)?,
            self.config.lifecycle_options()?,
        ))
    }

    /// Session bound to the instance recorded for `name`
    pub async fn open(&self, name: &str) -> anyhow::Result<(MachineRecord, Session)> {
        self.config.validate()?;
        let record = self.store.load(name).await?;

        let mut options = self.config.lifecycle_options()?;
        options.address_class = record.address_class;

        let mut session = MachineSession::new(
            name,
            self.gateway(),
            self.store.key_store(name)?,
            options,
        );
        if let Some(id) = &record.instance_id {
            session = session.attach(id.clone());
        }
        if let Some(ip) = &record.ip_address {
            session = session.with_ip_address(ip.clone());
        }
        Ok((record, session))
    }
}
