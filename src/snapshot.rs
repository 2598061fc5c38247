//! Snapshot structures for one interface at one point in time.
//!
//! A snapshot is what the SNMP collaborator hands over after a poll and
//! what the cache persists between two check runs. Every value that the
//! device may not expose is optional: an absent counter is never the same
//! as a counter reading zero, and serialization keeps it absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::counter::{CounterId, CounterReading};

/// Counter values keyed by counter identity. A missing key is an absent counter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counters {
    values: BTreeMap<CounterId, u64>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: CounterId) -> Option<u64> {
        self.values.get(&id).copied()
    }

    pub fn reading(&self, id: CounterId) -> CounterReading {
        CounterReading::new(id, self.get(id))
    }

    pub fn contains(&self, id: CounterId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn set(&mut self, id: CounterId, value: u64) {
        self.values.insert(id, value);
    }

    /// Builder-style setter, handy for constructing fixtures.
    pub fn with(mut self, id: CounterId, value: u64) -> Self {
        self.set(id, value);
        self
    }

    /// Zeroes every listed counter that currently has a value.
    /// Absent counters stay absent. Returns how many were reset.
    pub fn reset_present(&mut self, ids: &[CounterId]) -> usize {
        let mut reset = 0;
        for id in ids {
            if let Some(v) = self.values.get_mut(id) {
                *v = 0;
                reset += 1;
            }
        }
        reset
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Interface operational / administrative state (`ifOperStatus`, `ifAdminStatus`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperStatus {
    Up,
    Down,
    Testing,
    Unknown,
    Dormant,
    NotPresent,
    LowerLayerDown,
}

impl OperStatus {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(OperStatus::Up),
            2 => Some(OperStatus::Down),
            3 => Some(OperStatus::Testing),
            4 => Some(OperStatus::Unknown),
            5 => Some(OperStatus::Dormant),
            6 => Some(OperStatus::NotPresent),
            7 => Some(OperStatus::LowerLayerDown),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            OperStatus::Up => "UP",
            OperStatus::Down => "DOWN",
            OperStatus::Testing => "TESTING",
            OperStatus::Unknown => "UNKNOWN",
            OperStatus::Dormant => "DORMANT",
            OperStatus::NotPresent => "NOTPRESENT",
            OperStatus::LowerLayerDown => "LAYERDOWN",
        }
    }
}

/// Link duplex mode (`dot3StatsDuplexStatus`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DuplexStatus {
    Unknown,
    Half,
    Full,
}

impl DuplexStatus {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(DuplexStatus::Unknown),
            2 => Some(DuplexStatus::Half),
            3 => Some(DuplexStatus::Full),
            _ => None,
        }
    }

    pub fn raw(self) -> u32 {
        match self {
            DuplexStatus::Unknown => 1,
            DuplexStatus::Half => 2,
            DuplexStatus::Full => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DuplexStatus::Unknown => "Unknown",
            DuplexStatus::Half => "Half-Duplex",
            DuplexStatus::Full => "Full-Duplex",
        }
    }
}

/// Descriptive (non-counter) interface attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceInfo {
    /// `ifIndex` the snapshot was polled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// `ifName` (e.g. `Gi0/1`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// `ifDescr`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,

    /// `ifAlias`, the operator-set description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,

    /// `ifSpeed` in bits/sec (saturates at `u32::MAX`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<u64>,

    /// `ifHighSpeed` in Mbits/sec.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high_speed: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_status: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oper_status: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplex_status: Option<u32>,
}

impl InterfaceInfo {
    pub fn admin(&self) -> Option<OperStatus> {
        self.admin_status.and_then(OperStatus::from_raw)
    }

    pub fn oper(&self) -> Option<OperStatus> {
        self.oper_status.and_then(OperStatus::from_raw)
    }

    pub fn duplex(&self) -> Option<DuplexStatus> {
        self.duplex_status.and_then(DuplexStatus::from_raw)
    }

    /// Best human label: name, then description, then the index.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.descr.clone())
            .or_else(|| self.index.map(|i| format!("ifIndex {i}")))
            .unwrap_or_else(|| "unknown interface".to_string())
    }
}

/// A point-in-time capture of one interface.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix timestamp (seconds since epoch) of the poll.
    #[serde(default)]
    pub timestamp: i64,

    /// Device uptime in hundredths of a second (`sysUpTime` TimeTicks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_ticks: Option<u64>,

    #[serde(default)]
    pub interface: InterfaceInfo,

    #[serde(default)]
    pub counters: Counters,
}

impl Snapshot {
    /// Device uptime in whole seconds.
    pub fn uptime_secs(&self) -> Option<u64> {
        self.uptime_ticks.map(|t| t / 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Snapshot {
        Snapshot {
            timestamp: 1_700_000_000,
            uptime_ticks: Some(123_456),
            interface: InterfaceInfo {
                index: Some(3),
                name: Some("Gi0/1".to_string()),
                high_speed: Some(1000),
                oper_status: Some(1),
                ..InterfaceInfo::default()
            },
            counters: Counters::new()
                .with(CounterId::HcInOctets, 10)
                .with(CounterId::InErrors, 0),
        }
    }

    #[test]
    fn test_json_round_trip_keeps_absent_fields_absent() {
        let snap = sample();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(!json.contains("descr"));
        assert!(!json.contains("hc_out_octets"));

        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
        assert_eq!(back.counters.get(CounterId::HcOutOctets), None);
        assert_eq!(back.counters.get(CounterId::InErrors), Some(0));
        assert_eq!(back.interface.descr, None);
    }

    #[test]
    fn test_counters_serialize_by_name() {
        let c = Counters::new().with(CounterId::LocIfInCrc, 7);
        assert_eq!(serde_json::to_string(&c).unwrap(), r#"{"loc_if_in_crc":7}"#);
    }

    #[test]
    fn test_reset_present_leaves_absent_counters_absent() {
        let mut c = Counters::new()
            .with(CounterId::InOctets, 500)
            .with(CounterId::OutErrors, 3);
        let reset = c.reset_present(&CounterId::ALL);
        assert_eq!(reset, 2);
        assert!(!c.is_empty());
        assert!(Counters::new().is_empty());
        assert_eq!(c.get(CounterId::InOctets), Some(0));
        assert_eq!(c.get(CounterId::OutErrors), Some(0));
        assert!(!c.contains(CounterId::HcInOctets));
    }

    #[test]
    fn test_status_decoding() {
        let info = InterfaceInfo {
            admin_status: Some(2),
            oper_status: Some(7),
            duplex_status: Some(2),
            ..InterfaceInfo::default()
        };
        assert_eq!(info.admin(), Some(OperStatus::Down));
        assert_eq!(info.oper(), Some(OperStatus::LowerLayerDown));
        assert_eq!(info.duplex(), Some(DuplexStatus::Half));
        assert_eq!(OperStatus::from_raw(9), None);
        assert_eq!(DuplexStatus::from_raw(0), None);
    }

    #[test]
    fn test_uptime_secs_truncates_ticks() {
        let snap = Snapshot {
            uptime_ticks: Some(12_399),
            ..Snapshot::default()
        };
        assert_eq!(snap.uptime_secs(), Some(123));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut info = InterfaceInfo::default();
        assert_eq!(info.display_name(), "unknown interface");
        info.index = Some(4);
        assert_eq!(info.display_name(), "ifIndex 4");
        info.descr = Some("GigabitEthernet0/1".into());
        assert_eq!(info.display_name(), "GigabitEthernet0/1");
    }
}
