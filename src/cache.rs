//! Persisted state between two check runs.
//!
//! One directory per polled device (`<host>_SNMPv<version>[_<context>]`)
//! holding:
//! - `index.json`: interface index to `ifDescr`/`ifName`, refreshed on expiry;
//! - `<interface>.json`: the last snapshot of each checked interface.
//!
//! All writes go through a temporary file and a rename so that a reader
//! never observes a half-written document.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::snapshot::Snapshot;

pub const INDEX_FILE: &str = "index.json";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: invalid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("index for interface {0} not found")]
    InterfaceNotFound(String),
}

/// Names of one interface as listed by the device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_descr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_name: Option<String>,
}

/// Interface index (`ifIndex`) to names.
pub type InterfaceIndex = BTreeMap<u32, IndexEntry>;

/// Lowest index whose `ifName` or `ifDescr` equals `interface`.
pub fn find_index(index: &InterfaceIndex, interface: &str) -> Option<u32> {
    index
        .iter()
        .find(|(_, e)| {
            e.if_name.as_deref() == Some(interface) || e.if_descr.as_deref() == Some(interface)
        })
        .map(|(i, _)| *i)
}

/// Cache directory of a single device.
#[derive(Clone, Debug)]
pub struct DeviceCache {
    dir: PathBuf,
}

impl DeviceCache {
    pub fn new(
        base: impl AsRef<Path>,
        host: &str,
        snmp_version: &str,
        context: Option<&str>,
    ) -> Self {
        let dir = device_dir_name(host, snmp_version, context);
        Self::from_dir(base.as_ref().join(dir))
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn ensure_dir(&self) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })
    }

    // ---------------------------------------------------------------------------
    // Interface snapshots
    // ---------------------------------------------------------------------------

    /// Previous snapshot of `interface`, `None` on first poll.
    pub fn load_snapshot(&self, interface: &str) -> Result<Option<Snapshot>, CacheError> {
        self.read_json(&interface_file_name(interface))
    }

    pub fn store_snapshot(&self, interface: &str, snapshot: &Snapshot) -> Result<(), CacheError> {
        self.write_json(&interface_file_name(interface), snapshot)
    }

    // ---------------------------------------------------------------------------
    // Interface index
    // ---------------------------------------------------------------------------

    pub fn load_index(&self) -> Result<Option<InterfaceIndex>, CacheError> {
        self.read_json(INDEX_FILE)
    }

    pub fn store_index(&self, index: &InterfaceIndex) -> Result<(), CacheError> {
        info!(entries = index.len(), dir = %self.dir.display(), "interface index written");
        self.write_json(INDEX_FILE, index)
    }

    /// True when the index is missing or was last written more than `max_age` before `now`.
    pub fn index_expired(&self, max_age: Duration, now: SystemTime) -> Result<bool, CacheError> {
        let path = self.dir.join(INDEX_FILE);
        let modified = match fs::metadata(&path).and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(true),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        let (age_secs, max_age_secs) = (age.as_secs(), max_age.as_secs());
        debug!(age_secs, max_age_secs, "index age");
        Ok(age > max_age)
    }

    // ---------------------------------------------------------------------------
    // JSON helpers
    // ---------------------------------------------------------------------------

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, CacheError> {
        let path = self.dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "not cached yet");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Json { path, source })
    }

    /// Atomic write via a `.tmp` sibling unique to this process.
    fn write_json<T: Serialize>(&self, name: &str, value: &T) -> Result<(), CacheError> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let tmp_name = format!("{name}.{}.tmp", std::process::id());
        let tmp_path = self.dir.join(tmp_name);

        let bytes = serde_json::to_vec_pretty(value).map_err(|source| CacheError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&tmp_path, bytes).map_err(|source| CacheError::Io {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, &path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "written");
        Ok(())
    }
}

/// `<host>_SNMPv<version>` with `_<context>` appended when a context is set.
pub fn device_dir_name(host: &str, snmp_version: &str, context: Option<&str>) -> String {
    match context.filter(|c| !c.is_empty()) {
        Some(ctx) => format!("{host}_SNMPv{snmp_version}_{ctx}"),
        None => format!("{host}_SNMPv{snmp_version}"),
    }
}

/// Interface name with path separators replaced, plus `.json`.
pub fn interface_file_name(interface: &str) -> String {
    format!("{}.json", interface.replace('/', "_"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::CounterId;
    use crate::snapshot::{Counters, InterfaceInfo};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn index() -> InterfaceIndex {
        let gi = IndexEntry {
            if_descr: Some("GigabitEthernet0/1".into()),
            if_name: Some("Gi0/1".into()),
        };
        let vlan = IndexEntry {
            if_descr: Some("Vlan100".into()),
            if_name: None,
        };
        InterfaceIndex::from([(1, gi), (7, vlan)])
    }

    #[test]
    fn test_device_dir_name() {
        let plain = device_dir_name("10.0.0.1", "2c", None);
        assert_eq!(plain, "10.0.0.1_SNMPv2c");
        let with_context = device_dir_name("sw1", "3", Some("vrf-a"));
        assert_eq!(with_context, "sw1_SNMPv3_vrf-a");
        assert_eq!(device_dir_name("sw1", "3", Some("")), "sw1_SNMPv3");
    }

    #[test]
    fn test_interface_file_name() {
        assert_eq!(interface_file_name("Gi0/1/2"), "Gi0_1_2.json");
        assert_eq!(interface_file_name("eth0"), "eth0.json");
    }

    #[test]
    fn test_find_index_by_name_or_descr() {
        let idx = index();
        assert_eq!(find_index(&idx, "Gi0/1"), Some(1));
        assert_eq!(find_index(&idx, "GigabitEthernet0/1"), Some(1));
        assert_eq!(find_index(&idx, "Vlan100"), Some(7));
        assert_eq!(find_index(&idx, "gi0/1"), None);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempdir().unwrap();
        let cache = DeviceCache::new(dir.path(), "sw1", "2c", None);
        assert_eq!(cache.load_snapshot("Gi0/1").unwrap(), None);

        let snap = Snapshot {
            timestamp: 42,
            uptime_ticks: None,
            interface: InterfaceInfo {
                name: Some("Gi0/1".into()),
                ..InterfaceInfo::default()
            },
            counters: Counters::new().with(CounterId::InOctets, 0),
        };
        cache.store_snapshot("Gi0/1", &snap).unwrap();

        assert!(dir.path().join("sw1_SNMPv2c").join("Gi0_1.json").exists());
        assert_eq!(cache.load_snapshot("Gi0/1").unwrap(), Some(snap));

        let leftovers: Vec<_> = fs::read_dir(cache.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_index_round_trip_and_expiry() {
        let dir = tempdir().unwrap();
        let cache = DeviceCache::from_dir(dir.path().join("dev"));
        let max_age = Duration::from_secs(3600);

        assert!(cache.index_expired(max_age, SystemTime::now()).unwrap());
        cache.store_index(&index()).unwrap();
        assert_eq!(cache.load_index().unwrap(), Some(index()));

        assert!(!cache.index_expired(max_age, SystemTime::now()).unwrap());
        let later = SystemTime::now() + Duration::from_secs(7200);
        assert!(cache.index_expired(max_age, later).unwrap());
    }

    #[test]
    fn test_corrupted_file_is_an_error() {
        let dir = tempdir().unwrap();
        let cache = DeviceCache::from_dir(dir.path());
        let path = dir.path().join("eth0.json");
        fs::write(&path, b"{ not json").unwrap();
        let err = cache.load_snapshot("eth0").unwrap_err();
        assert!(matches!(err, CacheError::Json { .. }));
    }
}
