//! Driver flags shared by every subcommand

use clap::Args;
use speedyflow_config::{self as config, DriverConfig, env};
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct DriverArgs {
    /// SpeedyCloud API endpoint
    #[arg(long = "speedycloud-url", env = env::URL, default_value = config::DEFAULT_URL, global = true)]
    pub url: String,

    /// SpeedyCloud API key
    #[arg(long = "speedycloud-api-key", env = env::API_KEY, default_value = "", hide_env_values = true, global = true)]
    pub api_key: String,

    /// SpeedyCloud API secret
    #[arg(long = "speedycloud-api-secret", env = env::API_SECRET, default_value = "", hide_env_values = true, global = true)]
    pub api_secret: String,

    /// Existing key pair to use instead of generating one
    #[arg(long = "speedycloud-keypair-name", env = env::KEYPAIR_NAME, global = true)]
    pub keypair_name: Option<String>,

    /// Availability zone
    #[arg(long = "speedycloud-availability-zone", env = env::AVAILABILITY_ZONE, default_value = config::DEFAULT_AVAILABILITY_ZONE, global = true)]
    pub availability_zone: String,

    /// Private key matching --speedycloud-keypair-name
    #[arg(long = "speedycloud-private-key-file", env = env::PRIVATE_KEY_FILE, global = true)]
    pub private_key_file: Option<PathBuf>,

    /// Boot script passed to the instance
    #[arg(long = "speedycloud-user-data-file", env = env::USER_DATA_FILE, global = true)]
    pub user_data_file: Option<PathBuf>,

    /// Network name
    #[arg(long = "speedycloud-net-name", env = env::NETWORK_NAME, default_value = "", global = true)]
    pub net_name: String,

    /// SSH user
    #[arg(long = "speedycloud-ssh-user", env = env::SSH_USER, default_value = config::DEFAULT_SSH_USER, global = true)]
    pub ssh_user: String,

    /// SSH port
    #[arg(long = "speedycloud-ssh-port", env = env::SSH_PORT, default_value_t = config::DEFAULT_SSH_PORT, global = true)]
    pub ssh_port: u16,

    /// Seconds to wait for a status change
    #[arg(long = "speedycloud-active-timeout", env = env::ACTIVE_TIMEOUT, default_value_t = config::DEFAULT_ACTIVE_TIMEOUT, global = true)]
    pub active_timeout: u64,

    /// Number of CPUs
    #[arg(long = "speedycloud-cpu-number", env = env::CPU_NUMBER, default_value_t = config::DEFAULT_CPU_NUMBER, global = true)]
    pub cpu_number: u32,

    /// Memory in MB
    #[arg(long = "speedycloud-memory", env = env::MEMORY, default_value_t = config::DEFAULT_MEMORY, global = true)]
    pub memory: u32,

    /// Disk type
    #[arg(long = "speedycloud-disk-type", env = env::DISK_TYPE, default_value = config::DEFAULT_DISK_TYPE, global = true)]
    pub disk_type: String,

    /// Disk capacity in GB
    #[arg(long = "speedycloud-disk-capacity", env = env::DISK_CAPACITY, default_value_t = config::DEFAULT_DISK_CAPACITY, global = true)]
    pub disk_capacity: u32,

    /// ISP
    #[arg(long = "speedycloud-isp", env = env::ISP, default_value = config::DEFAULT_ISP, global = true)]
    pub isp: String,

    /// Bandwidth in Mbps
    #[arg(long = "speedycloud-bandwidth", env = env::BANDWIDTH, default_value_t = config::DEFAULT_BANDWIDTH, global = true)]
    pub bandwidth: u32,

    /// Image
    #[arg(long = "speedycloud-image-type", env = env::IMAGE_TYPE, default_value = config::DEFAULT_IMAGE_TYPE, global = true)]
    pub image_type: String,

    /// Address to use: inner or outer
    #[arg(long = "speedycloud-ip-type", env = env::IP_TYPE, default_value = config::DEFAULT_IP_TYPE, global = true)]
    pub ip_type: String,

    /// Where machine records and keys are stored
    #[arg(long = "storage-path", env = env::STORAGE_PATH, global = true)]
    pub storage_path: Option<PathBuf>,
}

impl From<DriverArgs> for DriverConfig {
    fn from(args: DriverArgs) -> Self {
        DriverConfig {
            endpoint: args.url,
            api_key: args.api_key,
            api_secret: args.api_secret,
            key_pair_name: args.keypair_name.filter(|n| !n.trim().is_empty()),
            availability_zone: args.availability_zone,
            private_key_file: args.private_key_file,
            user_data_file: args.user_data_file,
            network_name: args.net_name,
            ssh_user: args.ssh_user,
            ssh_port: args.ssh_port,
            active_timeout: args.active_timeout,
            cpu: args.cpu_number,
            memory: args.memory,
            disk_type: args.disk_type,
            disk_capacity: args.disk_capacity,
            isp: args.isp,
            bandwidth: args.bandwidth,
            image: args.image_type,
            ip_type: args.ip_type,
            storage_path: args.storage_path,
        }
    }
}
