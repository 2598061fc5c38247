//! One evaluation run: a previous and a current snapshot in, per-metric
//! results and an aggregate severity out.
//!
//! The run is a fixed sequence of [`MetricEvaluator`]s sharing a
//! [`RunContext`]. Order matters: speed feeds bandwidth, bandwidth may
//! quarantine the run, and packet totals feed errors and discards.

pub mod bandwidth;
pub mod duplex;
pub mod faults;
pub mod packets;
pub mod reboot;
pub mod speed;

use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::anomaly::AnomalyLimits;
use crate::counter::{CounterError, CounterId};
use crate::rates::Normalized;
use crate::snapshot::{Counters, DuplexStatus, InterfaceInfo, Snapshot};
use crate::threshold::{ConfigError, Severity, ThresholdSet};

pub use reboot::{RebootCheck, RebootVerdict};

/// Interfaces matching this pattern (name or description) get no utilization percentage.
pub const DEFAULT_VIRTUAL_PATTERN: &str = "(?i)vlan";

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Counter(#[from] CounterError),
}

// ============================================================
// Result types
// ============================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::In, Direction::Out];

    pub fn label(self) -> &'static str {
        match self {
            Direction::In => "In",
            Direction::Out => "Out",
        }
    }
}

/// A value per traffic direction.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Directional<T> {
    pub inbound: T,
    pub outbound: T,
}

impl<T> Directional<T> {
    pub fn get(&self, dir: Direction) -> &T {
        match dir {
            Direction::In => &self.inbound,
            Direction::Out => &self.outbound,
        }
    }

    pub fn get_mut(&mut self, dir: Direction) -> &mut T {
        match dir {
            Direction::In => &mut self.inbound,
            Direction::Out => &mut self.outbound,
        }
    }
}

/// Rate and percentage of one metric. `rate` is `None` when the source
/// counter was absent; `percentage` is `None` when no capacity was known.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricResult {
    pub rate: Option<f64>,
    pub percentage: Option<f64>,
    pub severity: Severity,
}

impl From<Normalized> for MetricResult {
    fn from(n: Normalized) -> Self {
        Self {
            rate: Some(n.rate),
            percentage: n.percentage,
            severity: Severity::Ok,
        }
    }
}

/// Per-direction packet mix. Sub-type percentages are shares of `total`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PacketBreakdown {
    /// Packets seen during the interval, `None` when no packet counter was computable.
    pub total: Option<u64>,
    pub total_rate: Option<f64>,
    pub unicast: MetricResult,
    pub multicast: MetricResult,
    pub broadcast: MetricResult,
    /// Combined 32-bit multicast + broadcast counter, used when the split
    /// 64-bit counters are missing.
    pub non_unicast: MetricResult,
}

/// Everything computed by one run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Metrics {
    /// Effective link speed in bits/sec, 0 when unknown.
    pub speed_bps: u64,
    pub bandwidth: Directional<MetricResult>,
    pub packets: Directional<PacketBreakdown>,
    pub errors: Directional<MetricResult>,
    /// Vendor CRC errors, inbound only. Reported, never thresholded.
    pub crc: MetricResult,
    pub discards: Directional<MetricResult>,
    pub duplex: Option<DuplexStatus>,
}

/// A threshold breach or fault condition worth reporting.
#[derive(Clone, Debug, PartialEq)]
pub struct Finding {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub title: String,
    pub value: f64,
}

/// `"Very high"` for critical breaches, `"High"` otherwise.
pub(crate) fn intensity(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "Very high",
        _ => "High",
    }
}

// ============================================================
// Settings and run context
// ============================================================

/// Operator configuration consumed by the evaluators.
#[derive(Clone, Debug)]
pub struct EvalSettings {
    pub thresholds: ThresholdSet,
    pub limits: AnomalyLimits,
    pub virtual_pattern: Regex,
}

impl EvalSettings {
    pub fn new(
        thresholds: ThresholdSet,
        limits: AnomalyLimits,
        virtual_pattern: &str,
    ) -> Result<Self, ConfigError> {
        let virtual_pattern =
            Regex::new(virtual_pattern).map_err(|source| ConfigError::InvalidPattern {
                name: "virtual interface",
                source,
            })?;
        Ok(Self {
            thresholds,
            limits,
            virtual_pattern,
        })
    }

    /// Default thresholds, ceilings and virtual-interface pattern.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Self::new(
            ThresholdSet::default(),
            AnomalyLimits::default(),
            DEFAULT_VIRTUAL_PATTERN,
        )
    }

    /// True when the interface name or description looks like a virtual sub-interface.
    pub fn is_virtual(&self, info: &InterfaceInfo) -> bool {
        [info.name.as_deref(), info.descr.as_deref()]
            .into_iter()
            .flatten()
            .any(|s| self.virtual_pattern.is_match(s))
    }
}

/// State shared by the evaluators of a single run. Dropped at the end of the run.
pub struct RunContext<'a> {
    pub current: &'a Snapshot,
    /// Previous counters, zeroed when a reboot was inferred.
    pub previous: Counters,
    pub interval_secs: f64,
    pub reboot: RebootVerdict,
    pub settings: &'a EvalSettings,
    /// Raised by the bandwidth check. Forces every packet-family delta of
    /// the rest of the run to 0.
    pub quarantined: bool,
    pub metrics: Metrics,
}

impl<'a> RunContext<'a> {
    pub fn new(previous: &Snapshot, current: &'a Snapshot, settings: &'a EvalSettings) -> Self {
        let check = reboot::disambiguate(previous, current);
        let mut counters = previous.counters.clone();
        if let RebootVerdict::Rebooted { uptime_secs } = check.verdict {
            let reset = counters.reset_present(&CounterId::ALL);
            info!(
                uptime_secs,
                reset, "device rebooted since last poll, previous counters zeroed"
            );
        }
        debug!(
            interval_secs = check.interval_secs,
            verdict = ?check.verdict,
            "run context ready"
        );

        Self {
            current,
            previous: counters,
            interval_secs: check.interval_secs,
            reboot: check.verdict,
            settings,
            quarantined: false,
            metrics: Metrics::default(),
        }
    }

    /// True when the current snapshot carries counter `id`.
    pub fn has(&self, id: CounterId) -> bool {
        self.current.counters.contains(id)
    }

    /// Delta of an octet counter. Never quarantined.
    pub fn octet_delta(&self, id: CounterId) -> Result<Option<u64>, CounterError> {
        self.delta(id, false)
    }

    /// Delta of a packet, error, discard or CRC counter, honouring quarantine.
    pub fn packet_delta(&self, id: CounterId) -> Result<Option<u64>, CounterError> {
        self.delta(id, self.quarantined)
    }

    fn delta(&self, id: CounterId, quarantined: bool) -> Result<Option<u64>, CounterError> {
        self.current
            .counters
            .reading(id)
            .delta_since(&self.previous.reading(id), quarantined)
    }
}

// ============================================================
// Pipeline
// ============================================================

pub trait MetricEvaluator: Send + Sync {
    fn id(&self) -> &'static str;
    fn evaluate(&self, ctx: &mut RunContext<'_>) -> Result<Vec<Finding>, EvalError>;
}

/// Evaluators in execution order.
pub fn pipeline() -> Vec<Box<dyn MetricEvaluator>> {
    vec![
        Box::new(speed::SpeedEvaluator),
        Box::new(bandwidth::BandwidthEvaluator),
        Box::new(packets::PacketsEvaluator),
        Box::new(faults::FaultEvaluator::errors()),
        Box::new(faults::FaultEvaluator::discards()),
        Box::new(duplex::DuplexEvaluator),
    ]
}

/// Output of [`evaluate`].
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub findings: Vec<Finding>,
    /// Maximum severity over all findings.
    pub severity: Severity,
    pub quarantined: bool,
    pub reboot: RebootVerdict,
    pub interval_secs: f64,
}

/// Runs the full pipeline over two snapshots of the same interface.
pub fn evaluate(
    previous: &Snapshot,
    current: &Snapshot,
    settings: &EvalSettings,
) -> Result<Evaluation, EvalError> {
    let mut ctx = RunContext::new(previous, current, settings);
    let mut findings = Vec::new();
    for evaluator in pipeline() {
        let found = evaluator.evaluate(&mut ctx)?;
        let id = evaluator.id();
        let count = found.len();
        debug!(id, count, quarantined = ctx.quarantined, "evaluator done");
        findings.extend(found);
    }

    let severity = findings.iter().map(|f| f.severity).max();

    Ok(Evaluation {
        metrics: ctx.metrics,
        findings,
        severity: severity.unwrap_or_default(),
        quarantined: ctx.quarantined,
        reboot: ctx.reboot,
        interval_secs: ctx.interval_secs,
    })
}
