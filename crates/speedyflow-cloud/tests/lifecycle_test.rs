//! End-to-end lifecycle scenarios against the scripted gateway

use speedyflow_cloud::testing::{FakeKeyGenerator, ScriptedGateway};
use speedyflow_cloud::{
    AddressClass, CanonicalState, CloudError, InstanceSpec, KeyStore, LifecycleOptions,
    LifecyclePhase, MachineSession,
};
use tempfile::{TempDir, tempdir};
use tokio_test::{assert_err, assert_ok};

fn ubuntu_spec() -> InstanceSpec {
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

fn new_session(
    gateway: ScriptedGateway,
    options: LifecycleOptions,
) -> (MachineSession<ScriptedGateway>, TempDir) {
    let temp_dir = tempdir().unwrap();
    let keys = KeyStore::new(temp_dir.path().join("machines").join("host1"));
    let session = MachineSession::new("host1", gateway, keys, options)
        .with_key_generator(FakeKeyGenerator::default());
    (session, temp_dir)
}

#[tokio::test(start_paused = true)]
async fn test_create_generate_path_end_to_end() {
    let gateway = ScriptedGateway::new();
    gateway.set_instance_id("7f3a");
    gateway.push_status("Provisioning");
    gateway.push_status("Provisioning");
    gateway.push_status("Running");
    gateway.set_default_addresses(&["10.0.0.5", "203.0.113.9"]);

    let (mut session, dir) = new_session(gateway, LifecycleOptions::default());

    let address = assert_ok!(session.create(&ubuntu_spec()).await);

    assert_eq!(address, "10.0.0.5");
    assert_eq!(session.phase(), LifecyclePhase::AddressResolved);

    let key_pair = session.key_pair().unwrap().clone();
    assert!(key_pair.display_name.starts_with("host1-"));
    assert!(key_pair.private_key.is_some());

    let gateway = session.gateway();
    assert_eq!(gateway.count("create_key_pair"), 1);
    assert_eq!(gateway.count("create_instance"), 1);
    assert_eq!(gateway.count("get_instance"), 3);

    let submitted = gateway.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].0, ubuntu_spec());
    assert_eq!(submitted[0].1, key_pair.id);

    let instance = session.instance().unwrap();
    assert_eq!(instance.id(), "7f3a");
    assert_eq!(instance.state, CanonicalState::Running);
    assert!(!instance.addresses.is_empty());
    assert_eq!(instance.addresses[0].class, AddressClass::Internal);

    let slot = dir.path().join("machines").join("host1");
    assert!(slot.join("id_rsa").exists());
    assert!(slot.join("id_rsa.pub").exists());
}

#[tokio::test(start_paused = true)]
async fn test_create_import_path_external_address() {
    let dir = tempdir().unwrap();
    let private_key_file = dir.path().join("cloudos.pem");
    std::fs::write(&private_key_file, "PRIVATE").unwrap();

    let gateway = ScriptedGateway::new();
    gateway.add_key_pair("kp-42", "cloudos", "ssh-rsa AAAAcloudos");
    gateway.set_default_addresses(&["10.0.0.5", "203.0.113.9"]);

    let options = LifecycleOptions {
        key_pair_name: Some("cloudos".to_string()),
        private_key_file: Some(private_key_file),
        address_class: AddressClass::External,
        ..LifecycleOptions::default()
    };
    let (mut session, _keys) = new_session(gateway, options);

    let address = assert_ok!(session.create(&ubuntu_spec()).await);

    assert_eq!(address, "203.0.113.9");
    assert_eq!(session.gateway().count("create_key_pair"), 0);
    assert_eq!(session.gateway().submitted()[0].1, "kp-42");
}

#[tokio::test(start_paused = true)]
async fn test_key_registration_failure_blocks_creation() {
    let gateway = ScriptedGateway::new();
    gateway.fail_next("create_key_pair", "duplicate name");
    let (mut session, dir) = new_session(gateway, LifecycleOptions::default());

    let err = assert_err!(session.create(&ubuntu_spec()).await);

    assert!(matches!(err, CloudError::RemoteApi(_)));
    assert_eq!(session.phase(), LifecyclePhase::Failed);
    assert_eq!(session.gateway().count("create_instance"), 0);
    // no record was written, so no orphaned key slot either
    assert!(!dir.path().join("machines").join("host1").exists());
}

#[tokio::test(start_paused = true)]
async fn test_delete_stopped_instance_skips_stop() {
    let gateway = ScriptedGateway::new();
    gateway.set_default_status("Stopped");
    let (session, _dir) = new_session(gateway, LifecycleOptions::default());
    let mut session = session.attach("srv-1");

    assert_ok!(session.remove().await);

    assert_eq!(session.gateway().count("stop_instance"), 0);
    assert_eq!(session.gateway().count("delete_instance"), 1);
    assert_eq!(session.phase(), LifecyclePhase::Deleted);
    assert!(session.instance().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_delete_running_instance_stops_first() {
    let gateway = ScriptedGateway::new();
    gateway.push_status("Running");
    gateway.push_status("Running");
    gateway.push_status("Stopped");
    let (session, _dir) = new_session(gateway, LifecycleOptions::default());
    let mut session = session.attach("srv-1");

    assert_ok!(session.remove().await);

    let calls = session.gateway().calls();
    assert_eq!(
        calls,
        vec![
            "get_instance:srv-1",
            "stop_instance:srv-1",
            "get_instance:srv-1",
            "get_instance:srv-1",
            "delete_instance:srv-1",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_delete_proceeds_after_stop_wait_timeout() {
    let gateway = ScriptedGateway::new();
    gateway.set_default_status("Running");
    let options = LifecycleOptions {
        active_timeout: std::time::Duration::from_secs(20),
        ..LifecycleOptions::default()
    };
    let (session, _dir) = new_session(gateway, options);
    let mut session = session.attach("srv-1");

    assert_ok!(session.remove().await);

    let gateway = session.gateway();
    assert_eq!(gateway.count("stop_instance"), 1);
    // one state query plus the five-attempt stop wait
    assert_eq!(gateway.count("get_instance"), 6);
    assert_eq!(gateway.count("delete_instance"), 1);
    assert_eq!(session.phase(), LifecyclePhase::Deleted);
}

#[tokio::test(start_paused = true)]
async fn test_delete_proceeds_after_stop_failure() {
    let gateway = ScriptedGateway::new();
    gateway.fail_next("stop_instance", "conflict");
    let (session, _dir) = new_session(gateway, LifecycleOptions::default());
    let mut session = session.attach("srv-1");

    assert_ok!(session.remove().await);

    assert_eq!(session.gateway().count("delete_instance"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_delete_error_propagates() {
    let gateway = ScriptedGateway::new();
    gateway.set_default_status("Stopped");
    gateway.fail_next("delete_instance", "403 Forbidden");
    let (session, _dir) = new_session(gateway, LifecycleOptions::default());
    let mut session = session.attach("srv-1");

    let err = assert_err!(session.remove().await);

    assert!(matches!(err, CloudError::RemoteApi(_)));
    assert_eq!(session.phase(), LifecyclePhase::Failed);
    assert_eq!(session.instance_id(), Some("srv-1"));
}
