use tracing::debug;

use crate::snapshot::DuplexStatus;
use crate::threshold::Severity;

use super::{EvalError, Finding, MetricEvaluator, RunContext};

/// Half-duplex is a misconfiguration on any modern link: always critical.
pub struct DuplexEvaluator;

impl MetricEvaluator for DuplexEvaluator {
    fn id(&self) -> &'static str {
        "duplex"
    }

    fn evaluate(&self, ctx: &mut RunContext<'_>) -> Result<Vec<Finding>, EvalError> {
        let duplex = ctx.current.interface.duplex();
        debug!(?duplex, "duplex mode");
        ctx.metrics.duplex = duplex;

        Ok(match duplex {
            Some(DuplexStatus::Half) => vec![Finding {
                rule_id: "duplex",
                severity: Severity::Critical,
                title: format!("Interface mode: {}", DuplexStatus::Half.label()),
                value: DuplexStatus::Half.raw() as f64,
            }],
            _ => Vec::new(),
        })
    }
}
