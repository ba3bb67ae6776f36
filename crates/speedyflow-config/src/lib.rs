//! Driver configuration for SpeedyFlow
//!
//! A flat option set with defaults. Values come from CLI flags or their
//! environment variables (see [`env`] and [`flag`]); [`DriverConfig::validate`]
//! rejects an unusable configuration before any remote call is made.

pub mod error;

pub use error::*;

use speedyflow_cloud::{AddressClass, InstanceSpec, LifecycleOptions};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable names
pub mod env {
    pub const URL: &str = "SPEED_CLOUD_URL";
    pub const API_KEY: &str = "SPEED_CLOUD_API_KEY";
    pub const API_SECRET: &str = "SPEED_CLOUD_API_SECRET";
    pub const KEYPAIR_NAME: &str = "SPEED_CLOUD_KEYPAIR_NAME";
    pub const AVAILABILITY_ZONE: &str = "SPEED_CLOUD_AVAILABILITY_ZONE";
    pub const PRIVATE_KEY_FILE: &str = "SPEED_CLOUD_PRIVATE_KEY_FILE";
    pub const USER_DATA_FILE: &str = "SPEED_CLOUD_USER_DATA_FILE";
    pub const NETWORK_NAME: &str = "SPEED_CLOUD_NETWORK_NAME";
    pub const SSH_USER: &str = "SPEED_CLOUD_SSH_USER";
    pub const SSH_PORT: &str = "SPEED_CLOUD_SSH_PORT";
    pub const ACTIVE_TIMEOUT: &str = "SPEED_CLOUD_ACTIVE_TIMEOUT";
    pub const CPU_NUMBER: &str = "SPEED_CLOUD_CPU_NUMBER";
    pub const MEMORY: &str = "SPEED_CLOUD_MEMORY";
    pub const DISK_TYPE: &str = "SPEED_CLOUD_DISKTYPE";
    pub const DISK_CAPACITY: &str = "SPEED_CLOUD_DISKCAPACITY";
    pub const ISP: &str = "SPEED_CLOUD_ISP";
    pub const BANDWIDTH: &str = "SPEED_CLOUD_BANDWIDTH";
    pub const IMAGE_TYPE: &str = "SPEED_CLOUD_IMAGE_TYPE";
    pub const IP_TYPE: &str = "SPEED_CLOUD_IP_TYPE";
    pub const STORAGE_PATH: &str = "SPEEDYFLOW_STORAGE_PATH";
}

/// CLI option names, as shown in error messages
pub mod flag {
    pub const URL: &str = "--speedycloud-url";
    pub const API_KEY: &str = "--speedycloud-api-key";
    pub const API_SECRET: &str = "--speedycloud-api-secret";
    pub const PRIVATE_KEY_FILE: &str = "--speedycloud-private-key-file";
    pub const AVAILABILITY_ZONE: &str = "--speedycloud-availability-zone";
    pub const SSH_USER: &str = "--speedycloud-ssh-user";
    pub const SSH_PORT: &str = "--speedycloud-ssh-port";
    pub const ACTIVE_TIMEOUT: &str = "--speedycloud-active-timeout";
    pub const CPU_NUMBER: &str = "--speedycloud-cpu-number";
    pub const MEMORY: &str = "--speedycloud-memory";
    pub const DISK_CAPACITY: &str = "--speedycloud-disk-capacity";
    pub const BANDWIDTH: &str = "--speedycloud-bandwidth";
    pub const IMAGE_TYPE: &str = "--speedycloud-image-type";
    pub const IP_TYPE: &str = "--speedycloud-ip-type";
}

pub const DEFAULT_URL: &str = "http://api.speedycloud.cn/api/v1/products";
pub const DEFAULT_AVAILABILITY_ZONE: &str = "SPC-BJ-15-A";
pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_ACTIVE_TIMEOUT: u64 = 200;
pub const DEFAULT_CPU_NUMBER: u32 = 2;
pub const DEFAULT_MEMORY: u32 = 1024;
pub const DEFAULT_DISK_TYPE: &str = "Normal";
pub const DEFAULT_DISK_CAPACITY: u32 = 20;
pub const DEFAULT_ISP: &str = "Private";
pub const DEFAULT_BANDWIDTH: u32 = 2;
pub const DEFAULT_IMAGE_TYPE: &str = "Ubuntu 14.04";
pub const DEFAULT_IP_TYPE: &str = "inner";

/// Every option the driver understands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_secret: String,
    /// Existing key pair to import; `None` generates one per machine
    pub key_pair_name: Option<String>,
    pub availability_zone: String,
    pub private_key_file: Option<PathBuf>,
    /// Boot script handed to the instance at first boot
    pub user_data_file: Option<PathBuf>,
    pub network_name: String,
    pub ssh_user: String,
    pub ssh_port: u16,
    /// Seconds
    pub active_timeout: u64,
    pub cpu: u32,
    /// MB
    pub memory: u32,
    pub disk_type: String,
    /// GB
    pub disk_capacity: u32,
    pub isp: String,
    pub bandwidth: u32,
    pub image: String,
    /// `inner`/`outer` (or `internal`/`external`)
    pub ip_type: String,
    pub storage_path: Option<PathBuf>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_URL.to_string(),
            api_key: String::new(),
            api_secret: String::new(),
            key_pair_name: None,
            availability_zone: DEFAULT_AVAILABILITY_ZONE.to_string(),
            private_key_file: None,
            user_data_file: None,
            network_name: String::new(),
            ssh_user: DEFAULT_SSH_USER.to_string(),
            ssh_port: DEFAULT_SSH_PORT,
            active_timeout: DEFAULT_ACTIVE_TIMEOUT,
            cpu: DEFAULT_CPU_NUMBER,
            memory: DEFAULT_MEMORY,
            disk_type: DEFAULT_DISK_TYPE.to_string(),
            disk_capacity: DEFAULT_DISK_CAPACITY,
            isp: DEFAULT_ISP.to_string(),
            bandwidth: DEFAULT_BANDWIDTH,
            image: DEFAULT_IMAGE_TYPE.to_string(),
            ip_type: DEFAULT_IP_TYPE.to_string(),
            storage_path: None,
        }
    }
}

fn require(value: &str, what: &'static str, env: &'static str, flag: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::Missing { what, env, flag });
    }
    Ok(())
}

fn positive(value: u64, flag: &'static str) -> Result<()> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            flag,
            value: value.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}

impl DriverConfig {
    /// Fail fast on anything that would make a remote call pointless
    pub fn validate(&self) -> Result<()> {
        require(&self.endpoint, "SpeedyCloud URL", env::URL, flag::URL)?;
        require(&self.api_key, "SpeedyCloud API key", env::API_KEY, flag::API_KEY)?;
        require(
            &self.api_secret,
            "SpeedyCloud API secret",
            env::API_SECRET,
            flag::API_SECRET,
        )?;
        require(
            &self.availability_zone,
            "Availability zone",
            env::AVAILABILITY_ZONE,
            flag::AVAILABILITY_ZONE,
        )?;
        require(&self.ssh_user, "SSH user", env::SSH_USER, flag::SSH_USER)?;
        require(&self.image, "Image type", env::IMAGE_TYPE, flag::IMAGE_TYPE)?;

        positive(self.cpu.into(), flag::CPU_NUMBER)?;
        positive(self.memory.into(), flag::MEMORY)?;
        positive(self.disk_capacity.into(), flag::DISK_CAPACITY)?;
        positive(self.bandwidth.into(), flag::BANDWIDTH)?;
        positive(self.ssh_port.into(), flag::SSH_PORT)?;
        positive(self.active_timeout, flag::ACTIVE_TIMEOUT)?;

        self.address_class()?;

        let importing = self
            .key_pair_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty());
        if importing && self.private_key_file.is_none() {
            return Err(ConfigError::Missing {
                what: "Private key file",
                env: env::PRIVATE_KEY_FILE,
                flag: flag::PRIVATE_KEY_FILE,
            });
        }
        Ok(())
    }

    pub fn address_class(&self) -> Result<AddressClass> {
        AddressClass::parse(&self.ip_type).ok_or_else(|| ConfigError::Invalid {
            flag: flag::IP_TYPE,
            value: self.ip_type.clone(),
            reason: "expected 'inner' or 'outer'".to_string(),
        })
    }

    /// Read the boot-script file, if one is configured
    pub fn load_boot_script(&self) -> Result<Option<String>> {
        match &self.user_data_file {
            Some(path) => std::fs::read_to_string(path)
                .map(Some)
                .map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Instance description for machine `name`
    pub fn instance_spec(&self, name: &str) -> Result<InstanceSpec> {
        Ok(InstanceSpec {
            name: name.to_string(),
            cpu: self.cpu,
            memory_mb: self.memory,
            disk_type: self.disk_type.clone(),
            disk_capacity_gb: self.disk_capacity,
            isp: self.isp.clone(),
            bandwidth: self.bandwidth,
            image: self.image.clone(),
            availability_zone: self.availability_zone.clone(),
            network: self.network_name.clone(),
            boot_script: self.load_boot_script()?,
        })
    }

    pub fn lifecycle_options(&self) -> Result<LifecycleOptions> {
        Ok(LifecycleOptions {
            active_timeout: Duration::from_secs(self.active_timeout),
            address_class: self.address_class()?,
            key_pair_name: self
                .key_pair_name
                .clone()
                .filter(|name| !name.trim().is_empty()),
            private_key_file: self.private_key_file.clone(),
            ..LifecycleOptions::default()
        })
    }

    /// Machine store root: `--storage-path`, else `<data dir>/speedyflow`
    pub fn storage_dir(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join("speedyflow"))
            .ok_or(ConfigError::DataDirNotFound(env::STORAGE_PATH))
    }
}
