//! Boundary with the SNMP collaborator.
//!
//! The SNMP transport is an external program; it hands over everything it
//! walked on the device as one JSON [`PollDocument`]: the interface index
//! (`ifDescr`/`ifName` per `ifIndex`) and one raw [`Snapshot`] per polled
//! interface.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::cache::InterfaceIndex;
use crate::snapshot::Snapshot;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("reading poll from stdin: {0}")]
    Stdin(#[source] io::Error),

    #[error("invalid poll document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("poll has no data for interface index {0}")]
    MissingInterface(u32),
}

/// Everything one SNMP poll returned for a device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollDocument {
    /// Poll time (Unix seconds), used for snapshots that carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,

    /// Device `sysUpTime`, used for snapshots that carry none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_ticks: Option<u64>,

    #[serde(default)]
    pub index: InterfaceIndex,

    /// Raw snapshots keyed by `ifIndex`.
    #[serde(default)]
    pub interfaces: BTreeMap<u32, Snapshot>,
}

impl PollDocument {
    /// The snapshot of interface `index`, completed with device-level
    /// fields and a sanitized alias. `now` stamps snapshots that have no time.
    pub fn snapshot(&self, index: u32, now: i64) -> Result<Snapshot, PollError> {
        let mut snap = self
            .interfaces
            .get(&index)
            .cloned()
            .ok_or(PollError::MissingInterface(index))?;

        snap.interface.index = Some(index);
        if snap.uptime_ticks.is_none() {
            snap.uptime_ticks = self.uptime_ticks;
        }
        if snap.timestamp == 0 {
            snap.timestamp = self.timestamp.unwrap_or(now);
        }
        if let Some(alias) = snap.interface.alias.as_mut() {
            *alias = sanitize_alias(alias);
        }
        if snap.counters.is_empty() {
            warn!(index, "poll carries no counters for interface");
        }
        let timestamp = snap.timestamp;
        let counters = snap.counters.len();
        debug!(index, timestamp, counters, "snapshot taken from poll");
        Ok(snap)
    }
}

/// `|` separates performance data in monitoring output; aliases use `!` instead.
pub fn sanitize_alias(alias: &str) -> String {
    alias.replace('|', "!")
}

pub trait PollSource {
    fn poll(&self) -> Result<PollDocument, PollError>;
}

/// An already materialized poll.
impl PollSource for PollDocument {
    fn poll(&self) -> Result<PollDocument, PollError> {
        Ok(self.clone())
    }
}

/// Poll document read from a file, or from stdin for `-`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JsonPollSource {
    File(PathBuf),
    Stdin,
}

impl JsonPollSource {
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            JsonPollSource::Stdin
        } else {
            JsonPollSource::File(PathBuf::from(arg))
        }
    }
}

impl PollSource for JsonPollSource {
    fn poll(&self) -> Result<PollDocument, PollError> {
        let raw = match self {
            JsonPollSource::File(path) => {
                let io_error = |source| PollError::Io {
                    path: path.clone(),
                    source,
                };
                fs::read_to_string(path).map_err(io_error)?
            }
            JsonPollSource::Stdin => {
                let mut buf = String::new();
                io::stdin()
                    .read_to_string(&mut buf)
                    .map_err(PollError::Stdin)?;
                buf
            }
        };
        Ok(serde_json::from_str(&raw)?)
    }
}
