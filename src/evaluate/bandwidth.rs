use tracing::debug;

use crate::anomaly::check_bandwidth;
use crate::counter::CounterId;
use crate::fmt::{format_bandwidth, format_pct};
use crate::rates::normalize;
use crate::threshold::{MetricFamily, Severity};

use super::{Direction, EvalError, Finding, MetricEvaluator, MetricResult, RunContext, intensity};

/// 64-bit octet counter when the device has it, 32-bit otherwise.
fn octet_counter(ctx: &RunContext<'_>, dir: Direction) -> CounterId {
    let (hc, legacy) = match dir {
        Direction::In => (CounterId::HcInOctets, CounterId::InOctets),
        Direction::Out => (CounterId::HcOutOctets, CounterId::OutOctets),
    };
    if ctx.has(hc) {
        hc
    } else {
        let counter = hc.mib_name();
        debug!(counter, "64-bit octet counter missing, using 32-bit");
        legacy
    }
}

/// Inbound and outbound bit rate and link utilization.
///
/// An implausible reading is zeroed and quarantines the rest of the run.
pub struct BandwidthEvaluator;

impl MetricEvaluator for BandwidthEvaluator {
    fn id(&self) -> &'static str {
        "bandwidth"
    }

    fn evaluate(&self, ctx: &mut RunContext<'_>) -> Result<Vec<Finding>, EvalError> {
        let threshold = *ctx.settings.thresholds.get(MetricFamily::Bandwidth);
        let is_virtual = ctx.settings.is_virtual(&ctx.current.interface);
        let speed = ctx.metrics.speed_bps;
        let capacity = (speed > 0).then_some(speed as f64);

        let mut findings = Vec::new();
        for dir in Direction::BOTH {
            let id = octet_counter(ctx, dir);
            let Some(octets) = ctx.octet_delta(id)? else {
                debug!(direction = dir.label(), "bandwidth not computable");
                continue;
            };

            let n = normalize(octets as f64 * 8.0, ctx.interval_secs, capacity);
            let checked = check_bandwidth(
                n.rate,
                n.percentage,
                capacity.is_some(),
                &ctx.settings.limits,
            );
            if checked.anomaly {
                ctx.quarantined = true;
            }

            let percentage = checked.percentage.filter(|_| !is_virtual);
            let severity = percentage.map_or(Severity::Ok, |p| threshold.classify(p));
            debug!(
                direction = dir.label(),
                rate = checked.rate,
                ?percentage,
                ?severity,
                "bandwidth"
            );
            *ctx.metrics.bandwidth.get_mut(dir) = MetricResult {
                rate: Some(checked.rate),
                percentage,
                severity,
            };

            if let Some(p) = percentage.filter(|_| severity > Severity::Ok) {
                findings.push(Finding {
                    rule_id: "bandwidth",
                    severity,
                    title: format!(
                        "{} {} Bandwidth: {} - {} (> {}%)",
                        intensity(severity),
                        dir.label(),
                        format_bandwidth(checked.rate),
                        format_pct(percentage),
                        threshold.cutoff(severity),
                    ),
                    value: p,
                });
            }
        }
        Ok(findings)
    }
}
