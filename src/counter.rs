//! Interface counter identifiers and wraparound-safe counter arithmetic.
//!
//! SNMP interface counters are monotonically increasing unsigned integers
//! that silently wrap to zero at their maximum value. Each counter has a
//! fixed width (32-bit `ifTable` counters or 64-bit `ifXTable` "high
//! capacity" counters) which decides where the wrap happens.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Bit width of a hardware counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CounterWidth {
    Bits32,
    Bits64,
}

impl CounterWidth {
    /// Largest value the counter can hold before wrapping.
    pub fn max_value(self) -> u64 {
        match self {
            CounterWidth::Bits32 => u32::MAX as u64,
            CounterWidth::Bits64 => u64::MAX,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            CounterWidth::Bits32 => 32,
            CounterWidth::Bits64 => 64,
        }
    }
}

/// Every counter the evaluator knows about.
///
/// Declaration order is the serialization order of [`crate::snapshot::Counters`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterId {
    // ifTable (Counter32)
    InOctets,
    InUcastPkts,
    InNUcastPkts,
    InDiscards,
    InErrors,
    OutOctets,
    OutUcastPkts,
    OutNUcastPkts,
    OutDiscards,
    OutErrors,
    // ifXTable (Counter64)
    HcInOctets,
    HcInUcastPkts,
    HcInMulticastPkts,
    HcInBroadcastPkts,
    HcOutOctets,
    HcOutUcastPkts,
    HcOutMulticastPkts,
    HcOutBroadcastPkts,
    /// Vendor CRC error counter (Cisco `locIfInCRC`).
    LocIfInCrc,
}

impl CounterId {
    pub const ALL: [CounterId; 19] = [
        CounterId::InOctets,
        CounterId::InUcastPkts,
        CounterId::InNUcastPkts,
        CounterId::InDiscards,
        CounterId::InErrors,
        CounterId::OutOctets,
        CounterId::OutUcastPkts,
        CounterId::OutNUcastPkts,
        CounterId::OutDiscards,
        CounterId::OutErrors,
        CounterId::HcInOctets,
        CounterId::HcInUcastPkts,
        CounterId::HcInMulticastPkts,
        CounterId::HcInBroadcastPkts,
        CounterId::HcOutOctets,
        CounterId::HcOutUcastPkts,
        CounterId::HcOutMulticastPkts,
        CounterId::HcOutBroadcastPkts,
        CounterId::LocIfInCrc,
    ];

    pub fn width(self) -> CounterWidth {
        match self {
            CounterId::HcInOctets
            | CounterId::HcInUcastPkts
            | CounterId::HcInMulticastPkts
            | CounterId::HcInBroadcastPkts
            | CounterId::HcOutOctets
            | CounterId::HcOutUcastPkts
            | CounterId::HcOutMulticastPkts
            | CounterId::HcOutBroadcastPkts => CounterWidth::Bits64,
            _ => CounterWidth::Bits32,
        }
    }

    /// MIB object name, used in log lines.
    pub fn mib_name(self) -> &'static str {
        match self {
            CounterId::InOctets => "ifInOctets",
            CounterId::InUcastPkts => "ifInUcastPkts",
            CounterId::InNUcastPkts => "ifInNUcastPkts",
            CounterId::InDiscards => "ifInDiscards",
            CounterId::InErrors => "ifInErrors",
            CounterId::OutOctets => "ifOutOctets",
            CounterId::OutUcastPkts => "ifOutUcastPkts",
            CounterId::OutNUcastPkts => "ifOutNUcastPkts",
            CounterId::OutDiscards => "ifOutDiscards",
            CounterId::OutErrors => "ifOutErrors",
            CounterId::HcInOctets => "ifHCInOctets",
            CounterId::HcInUcastPkts => "ifHCInUcastPkts",
            CounterId::HcInMulticastPkts => "ifHCInMulticastPkts",
            CounterId::HcInBroadcastPkts => "ifHCInBroadcastPkts",
            CounterId::HcOutOctets => "ifHCOutOctets",
            CounterId::HcOutUcastPkts => "ifHCOutUcastPkts",
            CounterId::HcOutMulticastPkts => "ifHCOutMulticastPkts",
            CounterId::HcOutBroadcastPkts => "ifHCOutBroadcastPkts",
            CounterId::LocIfInCrc => "locIfInCRC",
        }
    }
}

/// Counter arithmetic failure.
///
/// Only raised for readings that cannot come out of a correctly built
/// snapshot, so callers abort the run instead of guessing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CounterError {
    #[error("{value} does not fit a {bits}-bit counter")]
    OutOfRange { value: u64, bits: u32 },

    #[error("cannot compare {new:?} with {old:?}: counters differ")]
    Mismatch { new: CounterId, old: CounterId },
}

/// Distance travelled by a counter between two readings.
///
/// Returns `Ok(None)` when either reading is absent. A quarantined run
/// yields `Some(0)` for any present pair. A reading lower than its
/// predecessor is treated as a single wrap past `width.max_value()`.
pub fn delta(
    new: Option<u64>,
    old: Option<u64>,
    width: CounterWidth,
    quarantined: bool,
) -> Result<Option<u64>, CounterError> {
    let (Some(new), Some(old)) = (new, old) else {
        debug!("new or previous value unavailable, skip until next poll");
        return Ok(None);
    };

    let max = width.max_value();
    for value in [new, old] {
        if value > max {
            return Err(CounterError::OutOfRange {
                value,
                bits: width.bits(),
            });
        }
    }

    let d = if new == old {
        0
    } else if quarantined {
        debug!("run quarantined, delta forced to 0");
        0
    } else if new > old {
        new - old
    } else {
        // new < old, so (max - old) + new never exceeds max
        (max - old) + new
    };

    Ok(Some(d))
}

/// A single counter value tagged with its identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CounterReading {
    pub id: CounterId,
    pub value: Option<u64>,
}

impl CounterReading {
    pub fn new(id: CounterId, value: Option<u64>) -> Self {
        Self { id, value }
    }

    /// [`delta`] of `self` against an older reading of the same counter.
    pub fn delta_since(
        &self,
        old: &CounterReading,
        quarantined: bool,
    ) -> Result<Option<u64>, CounterError> {
        if self.id != old.id {
            return Err(CounterError::Mismatch {
                new: self.id,
                old: old.id,
            });
        }
        let d = delta(self.value, old.value, self.id.width(), quarantined)?;
        debug!(
            counter = self.id.mib_name(),
            new = ?self.value,
            old = ?old.value,
            delta = ?d,
            "counter delta"
        );
        Ok(d)
    }
}
