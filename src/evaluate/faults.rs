//! Errors and discards. Both are packet counters judged against the
//! direction's packet total, so they share one evaluator.

use tracing::debug;

use crate::counter::CounterId;
use crate::fmt::{format_pct, format_pps};
use crate::rates::packet_share;
use crate::threshold::{MetricFamily, Severity, ThresholdUnit};

use super::{Direction, EvalError, Finding, MetricEvaluator, MetricResult, RunContext, intensity};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    Errors,
    Discards,
}

impl FaultKind {
    fn family(self) -> MetricFamily {
        match self {
            FaultKind::Errors => MetricFamily::Errors,
            FaultKind::Discards => MetricFamily::Discards,
        }
    }

    fn counter(self, dir: Direction) -> CounterId {
        match (self, dir) {
            (FaultKind::Errors, Direction::In) => CounterId::InErrors,
            (FaultKind::Errors, Direction::Out) => CounterId::OutErrors,
            (FaultKind::Discards, Direction::In) => CounterId::InDiscards,
            (FaultKind::Discards, Direction::Out) => CounterId::OutDiscards,
        }
    }

    fn rule_id(self) -> &'static str {
        match self {
            FaultKind::Errors => "errors",
            FaultKind::Discards => "discards",
        }
    }

    fn label(self) -> &'static str {
        match self {
            FaultKind::Errors => "Errors",
            FaultKind::Discards => "Discards",
        }
    }
}

pub struct FaultEvaluator {
    kind: FaultKind,
}

impl FaultEvaluator {
    pub fn errors() -> Self {
        Self {
            kind: FaultKind::Errors,
        }
    }

    pub fn discards() -> Self {
        Self {
            kind: FaultKind::Discards,
        }
    }
}

impl MetricEvaluator for FaultEvaluator {
    fn id(&self) -> &'static str {
        self.kind.rule_id()
    }

    fn evaluate(&self, ctx: &mut RunContext<'_>) -> Result<Vec<Finding>, EvalError> {
        let threshold = *ctx.settings.thresholds.get(self.kind.family());
        let mut findings = Vec::new();

        for dir in Direction::BOTH {
            let id = self.kind.counter(dir);
            let Some(delta) = ctx.packet_delta(id)? else {
                debug!(counter = id.mib_name(), "not computable, skipped");
                continue;
            };
            let total = ctx.metrics.packets.get(dir).total;
            let share = packet_share(delta, total, ctx.interval_secs);

            // the unit picks what is compared; both figures are always shown
            let compared = match threshold.unit {
                ThresholdUnit::Rate => Some(share.rate),
                ThresholdUnit::Percentage => share.percentage,
            };
            let severity = compared.map_or(Severity::Ok, |v| threshold.classify(v));

            let result = MetricResult {
                severity,
                ..MetricResult::from(share)
            };
            match self.kind {
                FaultKind::Errors => *ctx.metrics.errors.get_mut(dir) = result,
                FaultKind::Discards => *ctx.metrics.discards.get_mut(dir) = result,
            }

            if let Some(value) = compared.filter(|_| severity > Severity::Ok) {
                findings.push(Finding {
                    rule_id: self.kind.rule_id(),
                    severity,
                    title: format!(
                        "{} {} {}: {} - {} (> {}{})",
                        intensity(severity),
                        dir.label(),
                        self.kind.label(),
                        format_pps(share.rate),
                        format_pct(share.percentage),
                        threshold.cutoff(severity),
                        threshold.unit.suffix(),
                    ),
                    value,
                });
            }
        }

        if self.kind == FaultKind::Errors
            && let Some(delta) = ctx.packet_delta(CounterId::LocIfInCrc)?
        {
            let total = ctx.metrics.packets.inbound.total;
            ctx.metrics.crc = packet_share(delta, total, ctx.interval_secs).into();
        }

        Ok(findings)
    }
}
