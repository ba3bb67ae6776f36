//! Response records and their decoders
//!
//! The API is weakly typed: numeric fields arrive as either JSON numbers or
//! strings, and nested objects sometimes collapse to plain strings. Each
//! record has one explicit decode function that accepts both shapes.

use crate::error::{Result, SpeedyCloudError};
use serde_json::{Map, Value};
use speedyflow_cloud::{InstanceRecord, KeyPair};

/// `cloud_servers/<id>` response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerRecord {
    pub id: String,
    pub name: String,
    pub status: String,
    pub ips: Vec<String>,
    pub image: String,
    pub availability_zone: String,
    pub network: String,
    pub cpu: Option<u32>,
    pub memory: Option<u32>,
    pub disk: Option<u32>,
    pub disk_type: String,
    pub bandwidth: Option<u32>,
    pub created_at: String,
}

/// Entry of the `sshkey` listing
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyPairRecord {
    pub id: String,
    pub name: String,
    pub display_name: String,
    pub public_key: String,
    pub fingerprint: String,
    pub created_at: String,
}

fn as_object<'a>(value: &'a Value, record: &'static str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| SpeedyCloudError::decode(record, format!("expected an object, got {}", value)))
}

/// String or number rendered as a string; missing and null become empty
fn text(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn required_text(obj: &Map<String, Value>, key: &str, record: &'static str) -> Result<String> {
    let value = text(obj, key);
    if value.is_empty() {
        return Err(SpeedyCloudError::decode(record, format!("missing '{}'", key)));
    }
    Ok(value)
}

/// Number or numeric string; anything else is `None`
fn number(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    match obj.get(key) {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
}

/// `{"name": ..., "display_name": ...}` or a bare string
fn named(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::Object(inner)) => {
            let name = text(inner, "name");
            if name.is_empty() {
                text(inner, "display_name")
            } else {
                name
            }
        }
        _ => text(obj, key),
    }
}

/// Array of strings, or a single comma-separated string
fn string_list(obj: &Map<String, Value>, key: &str) -> Vec<String> {
    match obj.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

pub fn decode_server(value: &Value) -> Result<ServerRecord> {
    let obj = as_object(value, "server")?;
    Ok(ServerRecord {
        id: required_text(obj, "id", "server")?,
        name: text(obj, "name"),
        status: text(obj, "status"),
        ips: string_list(obj, "ips"),
        image: text(obj, "image"),
        availability_zone: named(obj, "availability_zone"),
        network: named(obj, "network"),
        cpu: number(obj, "cpu"),
        memory: number(obj, "memory"),
        disk: number(obj, "disk"),
        disk_type: text(obj, "disk_type"),
        bandwidth: number(obj, "bandwidth"),
        created_at: text(obj, "created_at"),
    })
}

pub fn decode_key_pair(value: &Value) -> Result<KeyPairRecord> {
    let obj = as_object(value, "key pair")?;
    Ok(KeyPairRecord {
        id: required_text(obj, "id", "key pair")?,
        name: text(obj, "name"),
        display_name: text(obj, "display_name"),
        public_key: text(obj, "ssh_public_key_content"),
        fingerprint: text(obj, "fingerprint"),
        created_at: text(obj, "created_at"),
    })
}

/// Key-pair listing: a bare array, or an object wrapping one under `sshkeys`
pub fn decode_key_pairs(value: &Value) -> Result<Vec<KeyPairRecord>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(obj) => match obj.get("sshkeys") {
            Some(Value::Array(items)) => items,
            _ => return Err(SpeedyCloudError::decode("key pair list", "missing 'sshkeys'")),
        },
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(SpeedyCloudError::decode(
                "key pair list",
                format!("expected an array, got {}", other),
            ));
        }
    };
    items.iter().map(decode_key_pair).collect()
}

impl From<ServerRecord> for InstanceRecord {
    fn from(server: ServerRecord) -> Self {
        InstanceRecord {
            id: server.id,
            name: server.name,
            status: server.status,
            ips: server.ips,
        }
    }
}

impl From<KeyPairRecord> for KeyPair {
    fn from(record: KeyPairRecord) -> Self {
        KeyPair {
            id: record.id,
            display_name: record.display_name,
            public_key: record.public_key,
            private_key: None,
        }
    }
}
