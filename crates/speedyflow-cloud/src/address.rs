//! Address selection policy and the address-wait loop
//!
//! Network attachment is asynchronous relative to instance creation: the
//! provider may report an instance as Running before any address is
//! assigned, so address resolution polls on its own.

use crate::error::{CloudError, Result};
use crate::model::AddressClass;
use crate::poller::{PollConfig, poll_until};
use crate::provider::ComputeGateway;

/// Leading digits treated as private ranges. Plain string prefix match.
const PRIVATE_PREFIXES: &[&str] = &["192", "172", "10"];

/// Classify an address string as internal (private range) or external
pub fn classify(address: &str) -> AddressClass {
    if PRIVATE_PREFIXES.iter().any(|p| address.starts_with(p)) {
        AddressClass::Internal
    } else {
        AddressClass::External
    }
}

/// First address of the requested class, in list order
pub fn select_address<'a, S: AsRef<str>>(addresses: &'a [S], class: AddressClass) -> Option<&'a str> {
    addresses
        .iter()
        .map(|a| a.as_ref().trim())
        .find(|a| !a.is_empty() && classify(a) == class)
}

/// Poll the gateway until an address of `class` is attached to the instance
///
/// Gateway errors abort immediately. Running out of attempts yields
/// [`CloudError::NoAddressFound`].
pub async fn resolve_address<G>(
    gateway: &G,
    instance_id: &str,
    class: AddressClass,
    config: &PollConfig,
) -> Result<String>
where
    G: ComputeGateway + ?Sized,
{
    tracing::debug!(
        "Looking for the {} IP address of instance {}...",
        class,
        instance_id
    );

    let outcome = poll_until("resolve address", config, move || async move {
        let addresses = gateway.list_addresses(instance_id).await?;
        Ok(select_address(&addresses, class).map(str::to_string))
    })
    .await;

    match outcome {
        Ok(address) => {
            tracing::debug!("the address is {}", address);
            Ok(address)
        }
        Err(CloudError::Timeout { attempts, .. }) => Err(CloudError::NoAddressFound {
            instance_id: instance_id.to_string(),
            attempts,
        }),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGateway;
    use std::time::Duration;

    #[test]
    fn test_classify() {
        assert_eq!(classify("10.0.0.5"), AddressClass::Internal);
        assert_eq!(classify("172.16.3.4"), AddressClass::Internal);
        assert_eq!(classify("192.168.1.1"), AddressClass::Internal);
        assert_eq!(classify("203.0.113.9"), AddressClass::External);
        assert_eq!(classify("8.8.8.8"), AddressClass::External);
    }

    #[test]
    fn test_select_by_class() {
        let addresses = ["10.0.0.5", "203.0.113.9"];
        assert_eq!(
            select_address(&addresses, AddressClass::Internal),
            Some("10.0.0.5")
        );
        assert_eq!(
            select_address(&addresses, AddressClass::External),
            Some("203.0.113.9")
        );
        assert_eq!(select_address(&["203.0.113.9"], AddressClass::Internal), None);
        assert_eq!(select_address::<&str>(&[], AddressClass::External), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_internal_and_external() {
        let gateway = ScriptedGateway::new();
        gateway.push_addresses(&["10.0.0.5", "203.0.113.9"]);
        gateway.push_addresses(&["10.0.0.5", "203.0.113.9"]);

        let cfg = PollConfig::for_address();
        let inner = resolve_address(&gateway, "srv-1", AddressClass::Internal, &cfg)
            .await
            .unwrap();
        let outer = resolve_address(&gateway, "srv-1", AddressClass::External, &cfg)
            .await
            .unwrap();

        assert_eq!(inner, "10.0.0.5");
        assert_eq!(outer, "203.0.113.9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_waits_for_late_address() {
        let gateway = ScriptedGateway::new();
        gateway.push_addresses(&[]);
        gateway.push_addresses(&[]);
        gateway.push_addresses(&["192.168.0.7"]);

        let cfg = PollConfig::new(10, Duration::from_secs(2));
        let address = resolve_address(&gateway, "srv-1", AddressClass::Internal, &cfg)
            .await
            .unwrap();

        assert_eq!(address, "192.168.0.7");
        assert_eq!(gateway.count("list_addresses"), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_exhausts_attempts() {
        let gateway = ScriptedGateway::new();
        gateway.set_default_addresses(&["203.0.113.9"]);

        let cfg = PollConfig::for_address();
        let err = resolve_address(&gateway, "srv-1", AddressClass::Internal, &cfg)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CloudError::NoAddressFound { attempts: 200, .. }
        ));
        assert_eq!(gateway.count("list_addresses"), 200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_propagates_gateway_error() {
        let gateway = ScriptedGateway::new();
        gateway.fail_next("list_addresses", "503 Service Unavailable");

        let err = resolve_address(
            &gateway,
            "srv-1",
            AddressClass::Internal,
            &PollConfig::for_address(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, CloudError::RemoteApi(_)));
        assert_eq!(gateway.count("list_addresses"), 1);
    }
}
