//! Plain-text rendering of a [`CheckResult`] for a monitoring system.
//!
//! First line: `STATUS: summary | perfdata`. Following lines: findings,
//! then the detail summary in verbose mode.

use std::fmt;

use crate::check::{CheckResult, Outcome};
use crate::evaluate::{Direction, Evaluation, MetricResult, PacketBreakdown, RebootVerdict};
use crate::fmt::{format_bandwidth, format_duration, format_pct, format_pps, format_speed};
use crate::snapshot::InterfaceInfo;
use crate::threshold::{MetricFamily, Severity, ThresholdSet, ThresholdUnit};

const NOT_DETERMINED: &str = "Can't be determined";

pub fn headline(severity: Severity) -> &'static str {
    match severity {
        Severity::Ok => "No error found on the interface.",
        Severity::Warning => "Error(s) found on the interface:",
        Severity::Critical | Severity::Unknown => "Critical Error(s) found on the interface:",
    }
}

/// One `label=value[uom];warn;crit;min;max` entry.
#[derive(Clone, Debug, PartialEq)]
pub struct PerfDatum {
    pub label: &'static str,
    pub value: String,
    pub uom: &'static str,
    pub warn: Option<f64>,
    pub crit: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl PerfDatum {
    fn new(label: &'static str, value: String, uom: &'static str) -> Self {
        Self {
            label,
            value,
            uom,
            warn: None,
            crit: None,
            min: None,
            max: None,
        }
    }

    fn levels(mut self, warn: Option<f64>, crit: Option<f64>) -> Self {
        self.warn = warn;
        self.crit = crit;
        self
    }

    fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }
}

impl fmt::Display for PerfDatum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        let (label, value, uom) = (self.label, &self.value, self.uom);
        let (warn, crit) = (opt(self.warn), opt(self.crit));
        let (min, max) = (opt(self.min), opt(self.max));
        write!(f, "{label}={value}{uom};{warn};{crit};{min};{max}")
    }
}

fn fault_label(family: MetricFamily, dir: Direction) -> &'static str {
    match (family, dir) {
        (MetricFamily::Discards, Direction::In) => "in_discards",
        (MetricFamily::Discards, Direction::Out) => "out_discards",
        (_, Direction::In) => "in_errors",
        (_, Direction::Out) => "out_errors",
    }
}

/// Performance data of an evaluated run; empty for every other outcome.
pub fn perfdata(eval: &Evaluation, thresholds: &ThresholdSet) -> Vec<PerfDatum> {
    let m = &eval.metrics;
    let speed = (m.speed_bps > 0).then_some(m.speed_bps as f64);
    let bw = thresholds.get(MetricFamily::Bandwidth);
    let mut out = vec![PerfDatum::new("speed", m.speed_bps.to_string(), "")];

    let bw_labels = [
        (Direction::In, "in", "in_usage"),
        (Direction::Out, "out", "out_usage"),
    ];
    for (dir, rate_label, usage_label) in bw_labels {
        let r = m.bandwidth.get(dir);
        if let Some(rate) = r.rate {
            // bits/sec without unit, as weathermaps expect
            let datum = PerfDatum::new(rate_label, format!("{rate:.2}"), "");
            out.push(datum.range(Some(0.0), speed));
        }
        if let Some(pct) = r.percentage {
            out.push(
                PerfDatum::new(usage_label, format!("{pct:.2}"), "%")
                    .levels(Some(bw.warning), Some(bw.critical))
                    .range(Some(0.0), Some(100.0)),
            );
        }
    }

    let faults = [
        (MetricFamily::Errors, &m.errors),
        (MetricFamily::Discards, &m.discards),
    ];
    for (family, results) in faults {
        let t = thresholds.get(family);
        let (warn, crit) = match t.unit {
            ThresholdUnit::Rate => (Some(t.warning), Some(t.critical)),
            ThresholdUnit::Percentage => (None, None),
        };
        for dir in Direction::BOTH {
            if let Some(rate) = results.get(dir).rate {
                let label = fault_label(family, dir);
                out.push(
                    PerfDatum::new(label, format!("{rate:.2}"), "pps")
                        .levels(warn, crit)
                        .range(Some(0.0), None),
                );
            }
        }
    }

    if let Some(duplex) = m.duplex {
        out.push(PerfDatum::new("duplexmode", duplex.raw().to_string(), ""));
    }
    out
}

fn status_label(raw: Option<u32>, decoded: Option<&'static str>) -> String {
    match (raw, decoded) {
        (_, Some(label)) => label.to_string(),
        (Some(raw), None) => raw.to_string(),
        (None, None) => NOT_DETERMINED.to_string(),
    }
}

fn interface_lines(info: &InterfaceInfo, speed_bps: u64) -> Vec<String> {
    let mut lines = vec![format!("Name: {}", info.display_name())];
    if let Some(descr) = &info.descr {
        lines.push(format!("Descr: {descr}"));
    }
    if let Some(alias) = &info.alias {
        lines.push(format!("Alias: {alias}"));
    }
    lines.push(format!("Speed: {}", format_speed(speed_bps)));

    let oper = status_label(info.oper_status, info.oper().map(|s| s.label()));
    let admin = status_label(info.admin_status, info.admin().map(|s| s.label()));
    lines.push(format!("Oper Status: {oper}"));
    lines.push(format!("Admin Status: {admin}"));
    lines
}

fn packet_mix_line(dir: Direction, p: &PacketBreakdown) -> String {
    let label = dir.label();
    let (uni, multi) = (p.unicast.rate, p.multicast.rate);
    let (broad, non_unicast) = (p.broadcast.rate, p.non_unicast.rate);
    match (uni, multi, broad, non_unicast) {
        (None, None, None, None) => {
            format!("{label} Uni/Multi/Broadcast packets: {NOT_DETERMINED}")
        }
        (uni, _, _, Some(nu)) => {
            let (uni, nu) = (format_pps(uni.unwrap_or(0.0)), format_pps(nu));
            format!("{label}: Uni: {uni}, Multi/Broad: {nu}")
        }
        (uni, multi, broad, None) => {
            let [uni, multi, broad] = [uni, multi, broad].map(|r| format_pps(r.unwrap_or(0.0)));
            format!("{label}: Uni: {uni}, Multi: {multi}, Broad: {broad}")
        }
    }
}

fn pps_line(name: String, r: &MetricResult) -> String {
    match r.rate {
        Some(rate) => {
            let (rate, pct) = (format_pps(rate), format_pct(r.percentage));
            format!("{name}: {rate} ({pct})")
        }
        None => format!("{name}: {NOT_DETERMINED}"),
    }
}

const QUARANTINE_NOTE: &str = "Inconsistent bandwidth counters, packet statistics zeroed";

/// Verbose breakdown of every computed metric.
pub fn detail_summary(result: &CheckResult) -> Vec<String> {
    let info = &result.snapshot.interface;
    let Some(eval) = result.evaluation() else {
        return interface_lines(info, crate::evaluate::speed::resolve_speed(info));
    };
    let m = &eval.metrics;
    let mut lines = interface_lines(info, m.speed_bps);

    let mut interval = format!("Interval: {}", format_duration(eval.interval_secs as i64));
    match eval.reboot {
        RebootVerdict::Rebooted { .. } => interval.push_str(" (device rebooted, counters reset)"),
        RebootVerdict::UptimeWrapped => interval.push_str(" (uptime counter wrapped)"),
        RebootVerdict::Normal | RebootVerdict::Undetermined => {}
    }
    lines.push(interval);
    if eval.quarantined {
        lines.push(QUARANTINE_NOTE.to_string());
    }

    for dir in Direction::BOTH {
        let total = match m.packets.get(dir).total_rate {
            Some(rate) => format!("Total pkts {}: {}", dir.label(), format_pps(rate)),
            None => format!("Total pkts {}: {NOT_DETERMINED}", dir.label()),
        };
        lines.push(total);
    }
    for dir in Direction::BOTH {
        lines.push(packet_mix_line(dir, m.packets.get(dir)));
    }

    for dir in Direction::BOTH {
        let bw = m.bandwidth.get(dir);
        let rate = match bw.rate {
            Some(rate) => format!("{} BW: {}", dir.label(), format_bandwidth(rate)),
            None => format!("{} BW: Rate can't be determined", dir.label()),
        };
        let pct = match bw.percentage {
            Some(p) => format!(" ({p:.2}%)"),
            None => ", Percentage can't be determined".to_string(),
        };
        lines.push(rate + &pct);
    }

    let mut in_errors = pps_line("In Errors".to_string(), &m.errors.inbound);
    if m.errors.inbound.rate.is_some() {
        match m.crc.rate {
            Some(crc) => {
                let crc = format_pps(crc);
                in_errors.push_str(&format!(" with {crc} CRC Errors"));
            }
            None => in_errors.push_str(", no additional CRC Error stat"),
        }
    }
    lines.push(in_errors);
    lines.push(pps_line("Out Errors".to_string(), &m.errors.outbound));
    for dir in Direction::BOTH {
        let name = format!("{} Discards", dir.label());
        lines.push(pps_line(name, m.discards.get(dir)));
    }
    if let Some(duplex) = m.duplex {
        lines.push(format!("Duplex: {}", duplex.label()));
    }
    lines
}

/// Full check output. `thresholds` only decorates the performance data.
pub fn render(result: &CheckResult, thresholds: &ThresholdSet, verbose: bool) -> String {
    let info = &result.snapshot.interface;
    let mut details = Vec::new();

    let summary = match &result.outcome {
        Outcome::AdminDown => "The interface is administratively DOWN".to_string(),
        Outcome::OperDown(oper) => {
            if let Some(alias) = &info.alias {
                details.push(format!("Alias: {alias}"));
            }
            let oper = oper.label();
            format!("The interface status is {oper}/UP (oper/admin)")
        }
        Outcome::FirstPoll => "First poll, initial counters stored.".to_string(),
        Outcome::Evaluated(eval) => {
            let titles = eval.findings.iter().map(|f| f.title.clone());
            details.extend(titles);
            headline(result.severity).to_string()
        }
    };

    let perf = result
        .evaluation()
        .map(|e| perfdata(e, thresholds))
        .unwrap_or_default();

    let mut first = format!("{}: {summary}", result.status.label());
    if !perf.is_empty() {
        let perf: Vec<String> = perf.iter().map(|p| p.to_string()).collect();
        first.push_str(" | ");
        first.push_str(&perf.join(" "));
    }

    let mut lines = vec![first];
    lines.extend(details);
    if verbose {
        lines.extend(detail_summary(result));
    }
    lines.join("\n")
}
