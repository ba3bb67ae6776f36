//! SSH key pair resolution
//!
//! Key material has to exist before an instance is submitted because the
//! provider embeds the public key at boot. Two mutually exclusive paths:
//!
//! - **import**: a key-pair name was configured. The private key is read from a
//!   local file, the public half is fetched from the provider by display name,
//!   and both are copied into the machine's key slot. Nothing changes on the
//!   provider side.
//! - **generate**: no name was configured. A fresh pair is generated into the
//!   key slot and the public half is registered under a derived display name.

use crate::error::{CloudError, Result};
use crate::model::KeyPair;
use crate::provider::ComputeGateway;
use async_trait::async_trait;
use rand::RngCore;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const PRIVATE_KEY_FILE: &str = "id_rsa";
const PUBLIC_KEY_FILE: &str = "id_rsa.pub";

/// The provider rejects dots in key-pair display names
pub fn sanitize_key_pair_name(name: &str) -> String {
    name.replace('.', "_")
}

/// Random hex suffix used for collision avoidance, not for uniqueness guarantees
pub fn random_suffix() -> String {
    let mut buf = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

/// Display name for a generated key pair: `<machine>-<random>`, sanitized
pub fn generated_key_pair_name(machine_name: &str) -> String {
    sanitize_key_pair_name(&format!("{}-{}", machine_name, random_suffix()))
}

/// Per-machine SSH key slot on local disk
#[derive(Debug, Clone)]
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(PRIVATE_KEY_FILE)
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(PUBLIC_KEY_FILE)
    }

    /// Read a key file from an arbitrary caller-supplied path
    pub async fn read_key_file(path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CloudError::local_io(path, e))
    }

    pub async fn read_public_key(&self) -> Result<String> {
        Self::read_key_file(&self.public_key_path()).await
    }

    pub async fn read_private_key(&self) -> Result<String> {
        Self::read_key_file(&self.private_key_path()).await
    }

    async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CloudError::local_io(&self.dir, e))
    }

    /// Write both halves into the slot with owner-only permissions
    pub async fn write_key_pair(&self, private_key: &str, public_key: &str) -> Result<()> {
        self.ensure_dir().await?;
        write_owner_only(&self.private_key_path(), private_key.as_bytes()).await?;
        write_owner_only(&self.public_key_path(), public_key.as_bytes()).await?;
        Ok(())
    }

    /// Remove any existing key files so a generator can write fresh ones
    pub async fn clear(&self) -> Result<()> {
        self.ensure_dir().await?;
        for path in [self.private_key_path(), self.public_key_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CloudError::local_io(&path, e)),
            }
        }
        Ok(())
    }

    /// Drop both key files and the slot directory when nothing else is in it
    pub async fn discard(&self) -> Result<()> {
        for path in [self.private_key_path(), self.public_key_path()] {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CloudError::local_io(&path, e)),
            }
        }
        // a slot shared with a machine record stays in place
        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            tracing::debug!("Keeping key slot {}: {}", self.dir.display(), e);
        }
        Ok(())
    }

    /// Tighten permissions on whatever a generator left in the slot
    pub async fn restrict_permissions(&self) -> Result<()> {
        for path in [self.private_key_path(), self.public_key_path()] {
            set_owner_only(&path).await?;
        }
        Ok(())
    }
}

async fn write_owner_only(path: &Path, contents: &[u8]) -> Result<()> {
    use tokio::io::AsyncWriteExt;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| CloudError::local_io(path, e))?;
    file.write_all(contents)
        .await
        .map_err(|e| CloudError::local_io(path, e))?;
    file.flush().await.map_err(|e| CloudError::local_io(path, e))?;

    // mode() only applies on creation; an existing file keeps its old bits
    set_owner_only(path).await
}

#[cfg(unix)]
async fn set_owner_only(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .await
        .map_err(|e| CloudError::local_io(path, e))
}

#[cfg(not(unix))]
async fn set_owner_only(_path: &Path) -> Result<()> {
    Ok(())
}

/// Produces a new key pair at `<path>` (private) and `<path>.pub` (public)
#[async_trait]
pub trait KeyGenerator: Send + Sync {
    async fn generate(&self, private_key_path: &Path) -> Result<()>;
}

/// `ssh-keygen` CLI wrapper
#[derive(Debug, Clone)]
pub struct SshKeygen {
    program: String,
    bits: u32,
}

impl Default for SshKeygen {
    fn default() -> Self {
        Self {
            program: "ssh-keygen".to_string(),
            bits: 2048,
        }
    }
}

impl SshKeygen {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyGenerator for SshKeygen {
    async fn generate(&self, private_key_path: &Path) -> Result<()> {
        let bits = self.bits.to_string();
        let mut cmd = Command::new(&self.program);
        cmd.args(["-t", "rsa", "-b", bits.as_str(), "-N", "", "-q", "-f"]);
        cmd.arg(private_key_path);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!(
            "Running: {} -t rsa -b {} -f {}",
            self.program,
            bits,
            private_key_path.display()
        );

        let output = cmd
            .output()
            .await
            .map_err(|e| CloudError::local_io(private_key_path, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CloudError::local_io(
                private_key_path,
                std::io::Error::other(format!("{} failed: {}", self.program, stderr.trim())),
            ));
        }
        Ok(())
    }
}

/// Ensures key material exists locally and on the provider
pub struct KeyPairResolver<'a, G: ?Sized> {
    gateway: &'a G,
    store: &'a KeyStore,
    generator: &'a dyn KeyGenerator,
}

impl<'a, G> KeyPairResolver<'a, G>
where
    G: ComputeGateway + ?Sized,
{
    pub fn new(gateway: &'a G, store: &'a KeyStore, generator: &'a dyn KeyGenerator) -> Self {
        Self {
            gateway,
            store,
            generator,
        }
    }

    /// Pick the import or generate path depending on `key_pair_name`
    pub async fn resolve(
        &self,
        machine_name: &str,
        key_pair_name: Option<&str>,
        private_key_file: Option<&Path>,
    ) -> Result<KeyPair> {
        match key_pair_name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => {
                let private_key_file = private_key_file.ok_or_else(|| {
                    CloudError::Configuration(format!(
                        "a private key file is required to use the existing key pair '{}'",
                        name
                    ))
                })?;
                self.import(name, private_key_file).await
            }
            None => self.generate(machine_name).await,
        }
    }

    /// Import path: no provider-side mutation
    pub async fn import(&self, name: &str, private_key_file: &Path) -> Result<KeyPair> {
        tracing::debug!("Loading Key Pair {}", name);
        tracing::debug!("Loading Private Key from {}", private_key_file.display());

        let private_key = KeyStore::read_key_file(private_key_file).await?;
        let remote = self.gateway.get_key_pair_by_display_name(name).await?;

        self.store
            .write_key_pair(&private_key, &remote.public_key)
            .await?;

        Ok(KeyPair {
            id: remote.id,
            display_name: remote.display_name,
            public_key: remote.public_key,
            private_key: None,
        })
    }

    /// Generate path: local generation, then registration under a derived name
    pub async fn generate(&self, machine_name: &str) -> Result<KeyPair> {
        let display_name = generated_key_pair_name(machine_name);
        tracing::debug!("Creating Key Pair {}...", display_name);

        self.store.clear().await?;
        self.generator
            .generate(&self.store.private_key_path())
            .await?;
        self.store.restrict_permissions().await?;

        let public_key = self.store.read_public_key().await?;
        let private_key = self.store.read_private_key().await?;

        self.gateway
            .create_key_pair(&display_name, public_key.trim())
            .await?;

        // the create call does not hand back the identifier
        let registered = self
            .gateway
            .get_key_pair_by_display_name(&display_name)
            .await?;

        Ok(KeyPair {
            id: registered.id,
            display_name,
            public_key,
            private_key: Some(private_key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeKeyGenerator, ScriptedGateway};
    use tempfile::tempdir;

    #[test]
    fn test_sanitize_key_pair_name() {
        assert_eq!(sanitize_key_pair_name("host1"), "host1");
        assert_eq!(sanitize_key_pair_name("host.example"), "host_example");
        assert_eq!(sanitize_key_pair_name("a.b.c"), "a_b_c");
    }

    #[test]
    fn test_generated_names_differ() {
        let a = generated_key_pair_name("host.example");
        let b = generated_key_pair_name("host.example");
        assert_ne!(a, b);
        assert!(a.starts_with("host_example-"));
        assert!(!a.contains('.'));
        assert_eq!(random_suffix().len(), 32);
    }

    #[tokio::test]
    async fn test_generate_path_registers_public_key() {
        let temp_dir = tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path().join("host1"));
        let gateway = ScriptedGateway::new();
        let generator = FakeKeyGenerator::default();

        let resolver = KeyPairResolver::new(&gateway, &store, &generator);
        let kp = resolver.resolve("host1", None, None).await.unwrap();

        assert!(kp.display_name.starts_with("host1-"));
        assert!(kp.private_key.is_some());
        assert!(!kp.id.is_empty());
        assert_eq!(gateway.count("create_key_pair"), 1);
        assert_eq!(
            gateway.key_pair(&kp.display_name).unwrap().public_key,
            FakeKeyGenerator::PUBLIC_KEY
        );
        assert!(store.private_key_path().exists());
        assert!(store.public_key_path().exists());
    }

    #[tokio::test]
    async fn test_generate_path_registration_failure() {
        let temp_dir = tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path());
        let gateway = ScriptedGateway::new();
        gateway.fail_next("create_key_pair", "quota exceeded");
        let generator = FakeKeyGenerator::default();

        let err = KeyPairResolver::new(&gateway, &store, &generator)
            .resolve("host1", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::RemoteApi(_)));
    }

    #[tokio::test]
    async fn test_generate_path_generator_failure() {
        let temp_dir = tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path());
        let gateway = ScriptedGateway::new();
        let generator = FakeKeyGenerator::failing();

        let err = KeyPairResolver::new(&gateway, &store, &generator)
            .resolve("host1", None, None)
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::LocalIo { .. }));
        assert_eq!(gateway.count("create_key_pair"), 0);
    }

    #[tokio::test]
    async fn test_import_path_copies_keys() {
        let temp_dir = tempdir().unwrap();
        let private_key_file = temp_dir.path().join("cloudos");
        std::fs::write(&private_key_file, "PRIVATE").unwrap();

        let store = KeyStore::new(temp_dir.path().join("machine"));
        let gateway = ScriptedGateway::new();
        gateway.add_key_pair("kp-7", "cloudos", "ssh-rsa AAAAimported");
        let generator = FakeKeyGenerator::default();

        let kp = KeyPairResolver::new(&gateway, &store, &generator)
            .resolve("host1", Some("cloudos"), Some(&private_key_file))
            .await
            .unwrap();

        assert_eq!(kp.id, "kp-7");
        assert!(kp.private_key.is_none());
        assert_eq!(store.read_private_key().await.unwrap(), "PRIVATE");
        assert_eq!(
            store.read_public_key().await.unwrap(),
            "ssh-rsa AAAAimported"
        );
        assert_eq!(gateway.count("create_key_pair"), 0);
        assert_eq!(generator.calls(), 0);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.private_key_path())
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_import_path_missing_local_file() {
        let temp_dir = tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path());
        let gateway = ScriptedGateway::new();
        gateway.add_key_pair("kp-7", "cloudos", "ssh-rsa AAAA");
        let generator = FakeKeyGenerator::default();

        let err = KeyPairResolver::new(&gateway, &store, &generator)
            .resolve(
                "host1",
                Some("cloudos"),
                Some(&temp_dir.path().join("does-not-exist")),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::LocalIo { .. }));
    }

    #[tokio::test]
    async fn test_import_path_unknown_key_pair() {
        let temp_dir = tempdir().unwrap();
        let private_key_file = temp_dir.path().join("cloudos");
        std::fs::write(&private_key_file, "PRIVATE").unwrap();
        let store = KeyStore::new(temp_dir.path().join("machine"));
        let gateway = ScriptedGateway::new();
        let generator = FakeKeyGenerator::default();

        let err = KeyPairResolver::new(&gateway, &store, &generator)
            .resolve("host1", Some("cloudos"), Some(&private_key_file))
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::NotFound(_)));
        assert!(!store.private_key_path().exists());
    }

    #[tokio::test]
    async fn test_import_path_requires_private_key_file() {
        let temp_dir = tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path());
        let gateway = ScriptedGateway::new();
        let generator = FakeKeyGenerator::default();

        let err = KeyPairResolver::new(&gateway, &store, &generator)
            .resolve("host1", Some("cloudos"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, CloudError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_discard_keeps_slot_with_other_files() {
        let temp_dir = tempdir().unwrap();
        let store = KeyStore::new(temp_dir.path().join("machine"));
        store.write_key_pair("PRIVATE", "ssh-rsa AAAA").await.unwrap();
        std::fs::write(store.dir().join("machine.json"), "{}").unwrap();

        store.discard().await.unwrap();
        assert!(!store.private_key_path().exists());
        assert!(!store.public_key_path().exists());
        assert!(store.dir().join("machine.json").exists());

        std::fs::remove_file(store.dir().join("machine.json")).unwrap();
        store.discard().await.unwrap();
        assert!(!store.dir().exists());
    }
}
