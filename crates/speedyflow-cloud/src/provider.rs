//! Cloud API Gateway trait definition

use crate::error::Result;
use crate::model::{InstanceRecord, InstanceSpec, KeyPair};
use async_trait::async_trait;

/// Authenticated calls against a compute provider
///
/// Every call is a single request with no built-in retry. Any HTTP-level or
/// business-level failure comes back as [`crate::CloudError::RemoteApi`], except
/// key-pair lookups by display name, which return
/// [`crate::CloudError::NotFound`] when no key pair carries that name.
#[async_trait]
pub trait ComputeGateway: Send + Sync {
    /// Returns the provider name (e.g., "speedycloud")
    fn name(&self) -> &str;

    /// Submit an instance; returns the provider-assigned identifier
    async fn create_instance(&self, spec: &InstanceSpec, key_pair_id: &str) -> Result<String>;

    async fn get_instance(&self, id: &str) -> Result<InstanceRecord>;

    async fn delete_instance(&self, id: &str) -> Result<()>;

    async fn start_instance(&self, id: &str) -> Result<()>;

    async fn stop_instance(&self, id: &str) -> Result<()>;

    async fn reboot_instance(&self, id: &str) -> Result<()>;

    /// Addresses currently attached to the instance, in provider order
    async fn list_addresses(&self, id: &str) -> Result<Vec<String>>;

    async fn create_key_pair(&self, display_name: &str, public_key: &str) -> Result<()>;

    async fn get_key_pair_by_display_name(&self, display_name: &str) -> Result<KeyPair>;

    async fn delete_key_pair(&self, id: &str) -> Result<()>;
}

#[async_trait]
impl<G: ComputeGateway + ?Sized> ComputeGateway for Box<G> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn create_instance(&self, spec: &InstanceSpec, key_pair_id: &str) -> Result<String> {
        (**self).create_instance(spec, key_pair_id).await
    }

    async fn get_instance(&self, id: &str) -> Result<InstanceRecord> {
        (**self).get_instance(id).await
    }

    async fn delete_instance(&self, id: &str) -> Result<()> {
        (**self).delete_instance(id).await
    }

    async fn start_instance(&self, id: &str) -> Result<()> {
        (**self).start_instance(id).await
    }

    async fn stop_instance(&self, id: &str) -> Result<()> {
        (**self).stop_instance(id).await
    }

    async fn reboot_instance(&self, id: &str) -> Result<()> {
        (**self).reboot_instance(id).await
    }

    async fn list_addresses(&self, id: &str) -> Result<Vec<String>> {
        (**self).list_addresses(id).await
    }

    async fn create_key_pair(&self, display_name: &str, public_key: &str) -> Result<()> {
        (**self).create_key_pair(display_name, public_key).await
    }

    async fn get_key_pair_by_display_name(&self, display_name: &str) -> Result<KeyPair> {
        (**self).get_key_pair_by_display_name(display_name).await
    }

    async fn delete_key_pair(&self, id: &str) -> Result<()> {
        (**self).delete_key_pair(id).await
    }
}
