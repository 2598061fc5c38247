//! ifcheck - network interface health check library.
//!
//! Compares two SNMP counter snapshots of one interface and turns the
//! difference into rates, utilization and a monitoring severity:
//! - `check` - one full run (index lookup, status gates, cache update)
//! - `evaluate` - the metric pipeline over two snapshots
//! - `report` - plain-text output with performance data

pub mod anomaly;
pub mod cache;
pub mod check;
pub mod counter;
pub mod evaluate;
pub mod fmt;
pub mod poll;
pub mod rates;
pub mod report;
pub mod snapshot;
pub mod threshold;
