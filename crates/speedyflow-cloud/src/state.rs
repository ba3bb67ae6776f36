//! Machine record persistence
//!
//! Each machine lives under `<root>/machines/<name>/`:
//!
//! ```text
//! machines/host1/
//!   machine.json         # MachineRecord
//!   machine.json.backup  # previous record
//!   id_rsa / id_rsa.pub  # key slot
//! ```

use crate::error::{CloudError, Result};
use crate::keypair::KeyStore;
use crate::model::AddressClass;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

const RECORD_VERSION: u32 = 1;
const MACHINES_DIR: &str = "machines";
const RECORD_FILE: &str = "machine.json";
const RECORD_BACKUP: &str = "machine.json.backup";

/// What has to survive between two invocations to drive the same instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineRecord {
    pub version: u32,

    pub name: String,

    /// Provider-assigned identifier, set once the instance was submitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    /// Display name of the key pair the instance was created with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pair_name: Option<String>,

    /// Whether the key pair was generated for this machine
    #[serde(default)]
    pub key_pair_generated: bool,

    #[serde(default)]
    pub address_class: AddressClass,

    pub ssh_user: String,

    pub ssh_port: u16,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl MachineRecord {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            version: RECORD_VERSION,
            name: name.into(),
            instance_id: None,
            ip_address: None,
            key_pair_name: None,
            key_pair_generated: false,
            address_class: AddressClass::default(),
            ssh_user: "root".to_string(),
            ssh_port: 22,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Machine names become directory names: an ASCII letter or digit followed by
/// letters, digits, `.`, `_` or `-`
pub fn validate_machine_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphanumeric())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !valid {
        return Err(CloudError::Configuration(format!(
            "invalid machine name '{}': use letters, digits, '.', '_' or '-', starting with a letter or digit",
            name
        )));
    }
    Ok(())
}

/// Reads and writes machine records below a storage root
#[derive(Debug, Clone)]
pub struct MachineStore {
    root: PathBuf,
}

impl MachineStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/machines/<name>`; fails for names that are not a single plain path segment
    pub fn machine_dir(&self, name: &str) -> Result<PathBuf> {
        validate_machine_name(name)?;
        Ok(self.root.join(MACHINES_DIR).join(name))
    }

    fn record_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.machine_dir(name)?.join(RECORD_FILE))
    }

    fn backup_path(&self, name: &str) -> Result<PathBuf> {
        Ok(self.machine_dir(name)?.join(RECORD_BACKUP))
    }

    /// Key slot for `name`
    pub fn key_store(&self, name: &str) -> Result<KeyStore> {
        Ok(KeyStore::new(self.machine_dir(name)?))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.record_path(name).is_ok_and(|path| path.exists())
    }

    async fn ensure_machine_dir(&self, name: &str) -> Result<()> {
        let dir = self.machine_dir(name)?;
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| CloudError::local_io(&dir, e))?;
            tracing::debug!("Created machine directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the record for `name`
    pub async fn load(&self, name: &str) -> Result<MachineRecord> {
        let path = self.record_path(name)?;
        if !path.exists() {
            return Err(CloudError::NotFound(format!("machine '{}'", name)));
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| CloudError::local_io(&path, e))?;
        let record: MachineRecord = serde_json::from_str(&content)?;

        if record.version > RECORD_VERSION {
            return Err(CloudError::Record(format!(
                "Record version {} is newer than supported version {}",
                record.version, RECORD_VERSION
            )));
        }

        tracing::debug!("Loaded machine record for {}", name);
        Ok(record)
    }

    /// Save the record, keeping the previous one as a backup
    pub async fn save(&self, record: &MachineRecord) -> Result<()> {
        self.ensure_machine_dir(&record.name).await?;

        let path = self.record_path(&record.name)?;
        let backup = self.backup_path(&record.name)?;

        if path.exists() {
            fs::rename(&path, &backup)
                .await
                .map_err(|e| CloudError::local_io(&backup, e))?;
        }

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&path, content)
            .await
            .map_err(|e| CloudError::local_io(&path, e))?;

        tracing::debug!("Saved machine record for {}", record.name);
        Ok(())
    }

    /// Delete the machine directory including its key slot
    pub async fn remove(&self, name: &str) -> Result<()> {
        let dir = self.machine_dir(name)?;
        match fs::remove_dir_all(&dir).await {
            Ok(()) => {
                tracing::debug!("Removed machine directory: {}", dir.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CloudError::local_io(&dir, e)),
        }
    }

    /// Names of every machine with a record, sorted
    pub async fn list(&self) -> Result<Vec<String>> {
        let dir = self.root.join(MACHINES_DIR);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(CloudError::local_io(&dir, e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CloudError::local_io(&dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if validate_machine_name(&name).is_ok() && entry.path().join(RECORD_FILE).exists() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }
}
