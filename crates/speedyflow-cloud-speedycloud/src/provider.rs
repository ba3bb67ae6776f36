//! SpeedyCloud implementation of [`ComputeGateway`]

use crate::client::{Credentials, ProviderClient, ServiceClient};
use crate::error::{Result, SpeedyCloudError};
use crate::records::{decode_key_pairs, decode_server};
use async_trait::async_trait;
use speedyflow_cloud::{ComputeGateway, InstanceRecord, InstanceSpec, KeyPair};
use tokio::sync::OnceCell;

pub const DEFAULT_ENDPOINT: &str = "http://api.speedycloud.cn/api/v1/products";

const SERVERS_PATH: &str = "cloud_servers";
const KEYPAIRS_PATH: &str = "sshkey";

/// Gateway to the SpeedyCloud products API
///
/// Client handles are created on first use and reused for the lifetime of the
/// gateway. Each gateway owns its own handles.
#[derive(Debug)]
pub struct SpeedyCloudGateway {
    endpoint: String,
    credentials: Credentials,
    provider: OnceCell<ProviderClient>,
    compute: OnceCell<ServiceClient>,
}

impl SpeedyCloudGateway {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            credentials: Credentials::new(api_key, api_secret),
            provider: OnceCell::new(),
            compute: OnceCell::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn provider_client(&self) -> Result<&ProviderClient> {
        self.provider
            .get_or_try_init(|| async {
                tracing::debug!("Initializing SpeedyCloud provider client");
                ProviderClient::new(self.credentials.clone())
            })
            .await
    }

    async fn compute_client(&self) -> Result<&ServiceClient> {
        self.compute
            .get_or_try_init(|| async {
                let provider = self.provider_client().await?.clone();
                tracing::debug!("Initializing SpeedyCloud compute client for {}", self.endpoint);
                Ok(ServiceClient::new(provider, &self.endpoint))
            })
            .await
    }

    async fn fetch_server(&self, id: &str) -> Result<InstanceRecord> {
        let compute = self.compute_client().await?;
        let value = compute.post(&format!("{}/{}", SERVERS_PATH, id), &[]).await?;
        Ok(decode_server(&value)?.into())
    }

    async fn server_action(&self, id: &str, action: &str) -> Result<()> {
        let compute = self.compute_client().await?;
        compute
            .post(&format!("{}/{}/{}", SERVERS_PATH, id, action), &[])
            .await?;
        Ok(())
    }

    async fn provision(&self, spec: &InstanceSpec, key_pair_id: &str) -> Result<String> {
        let compute = self.compute_client().await?;
        let form = provision_form(spec, key_pair_id);

        tracing::info!("Creating machine {}...", spec.name);
        let value = compute
            .post(&format!("{}/provision", SERVERS_PATH), &form)
            .await?;
        let server = decode_server(&value)?;
        Ok(server.id)
    }

    async fn find_key_pair(&self, display_name: &str) -> Result<KeyPair> {
        let compute = self.compute_client().await?;
        let value = compute.post(KEYPAIRS_PATH, &[]).await?;
        decode_key_pairs(&value)?
            .into_iter()
            .find(|k| k.display_name == display_name)
            .map(KeyPair::from)
            .ok_or_else(|| SpeedyCloudError::KeyPairNotFound(display_name.to_string()))
    }

    async fn register_key_pair(&self, display_name: &str, public_key: &str) -> Result<()> {
        let compute = self.compute_client().await?;
        let form = [
            ("display_name", display_name.to_string()),
            ("public_key", public_key.to_string()),
        ];
        compute
            .post(&format!("{}/create", KEYPAIRS_PATH), &form)
            .await?;
        Ok(())
    }

    async fn drop_key_pair(&self, id: &str) -> Result<()> {
        let compute = self.compute_client().await?;
        compute
            .post(&format!("{}/delete", KEYPAIRS_PATH), &[("id", id.to_string())])
            .await?;
        Ok(())
    }
}

/// Form fields for `cloud_servers/provision`
pub fn provision_form(spec: &InstanceSpec, key_pair_id: &str) -> Vec<(&'static str, String)> {
    let mut form = vec![
        ("image", spec.image.clone()),
        ("network", spec.network.clone()),
        ("cpu", spec.cpu.to_string()),
        ("memory", spec.memory_mb.to_string()),
        ("disk_type", spec.disk_type.clone()),
        ("disk_capacity", spec.disk_capacity_gb.to_string()),
        ("isp", spec.isp.clone()),
        ("bandwidth", spec.bandwidth.to_string()),
        ("ssh_key", key_pair_id.to_string()),
        ("name", spec.name.clone()),
        ("availability_zone", spec.availability_zone.clone()),
    ];
    if let Some(script) = spec.boot_script.as_ref().filter(|s| !s.is_empty()) {
        form.push(("bootscript", script.clone()));
    }
    form
}

#[async_trait]
impl ComputeGateway for SpeedyCloudGateway {
    fn name(&self) -> &str {
        "speedycloud"
    }

    async fn create_instance(
        &self,
        spec: &InstanceSpec,
        key_pair_id: &str,
    ) -> speedyflow_cloud::Result<String> {
        Ok(self.provision(spec, key_pair_id).await?)
    }

    async fn get_instance(&self, id: &str) -> speedyflow_cloud::Result<InstanceRecord> {
        Ok(self.fetch_server(id).await?)
    }

    async fn delete_instance(&self, id: &str) -> speedyflow_cloud::Result<()> {
        Ok(self.server_action(id, "delete").await?)
    }

    async fn start_instance(&self, id: &str) -> speedyflow_cloud::Result<()> {
        Ok(self.server_action(id, "start").await?)
    }

    async fn stop_instance(&self, id: &str) -> speedyflow_cloud::Result<()> {
        Ok(self.server_action(id, "stop").await?)
    }

    async fn reboot_instance(&self, id: &str) -> speedyflow_cloud::Result<()> {
        Ok(self.server_action(id, "restart").await?)
    }

    async fn list_addresses(&self, id: &str) -> speedyflow_cloud::Result<Vec<String>> {
        Ok(self.fetch_server(id).await?.ips)
    }

    async fn create_key_pair(
        &self,
        display_name: &str,
        public_key: &str,
    ) -> speedyflow_cloud::Result<()> {
        Ok(self.register_key_pair(display_name, public_key).await?)
    }

    async fn get_key_pair_by_display_name(
        &self,
        display_name: &str,
    ) -> speedyflow_cloud::Result<KeyPair> {
        Ok(self.find_key_pair(display_name).await?)
    }

    async fn delete_key_pair(&self, id: &str) -> speedyflow_cloud::Result<()> {
        Ok(self.drop_key_pair(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedyflow_cloud::CloudError;

    fn spec() -> InstanceSpec {
        InstanceSpec {
            name: "host1".to_string(),
            cpu: 2,
            memory_mb: 1024,
            disk_type: "Normal".to_string(),
            disk_capacity_gb: 20,
            isp: "Private".to_string(),
            bandwidth: 2,
            image: "Ubuntu 14.04".to_string(),
            availability_zone: "SPC-BJ-15-A".to_string(),
            network: String::new(),
            boot_script: None,
        }
    }

    #[test]
    fn test_provision_form() {
        let form = provision_form(&spec(), "kp-3");
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("cpu"), Some("2"));
        assert_eq!(get("memory"), Some("1024"));
        assert_eq!(get("image"), Some("Ubuntu 14.04"));
        assert_eq!(get("availability_zone"), Some("SPC-BJ-15-A"));
        assert_eq!(get("ssh_key"), Some("kp-3"));
        assert_eq!(get("bootscript"), None);

        let mut with_script = spec();
        with_script.boot_script = Some("#!/bin/sh\necho hi\n".to_string());
        let form = provision_form(&with_script, "kp-3");
        assert!(form.iter().any(|(k, _)| *k == "bootscript"));
    }

    #[tokio::test]
    async fn test_client_handles_are_initialized_once() {
        let gateway = SpeedyCloudGateway::new(DEFAULT_ENDPOINT, "key", "secret");
        assert!(!gateway.compute.initialized());

        let first = gateway.compute_client().await.unwrap() as *const ServiceClient;
        let second = gateway.compute_client().await.unwrap() as *const ServiceClient;

        assert_eq!(first, second);
        assert!(gateway.provider.initialized());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_remote_error() {
        // grab a free port, then release it so nothing listens there
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let endpoint = format!("http://127.0.0.1:{}", port);
        let gateway = SpeedyCloudGateway::new(endpoint, "key", "secret");
        let err = gateway.get_instance("1").await.unwrap_err();
        assert!(matches!(err, CloudError::RemoteApi(_)));
    }
}
