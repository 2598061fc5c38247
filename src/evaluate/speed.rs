use tracing::debug;

use crate::snapshot::InterfaceInfo;

use super::{EvalError, Finding, MetricEvaluator, RunContext};

/// Speed assumed when `ifSpeed` saturates at its 32-bit maximum.
pub const SATURATED_SPEED_BPS: u64 = 10_000_000_000;

/// Effective link speed in bits/sec: `ifHighSpeed` (Mbit/s) when reported
/// and non-zero, else `ifSpeed`, else 0 (unknown).
pub fn resolve_speed(info: &InterfaceInfo) -> u64 {
    if let Some(high) = info.high_speed.filter(|&h| h > 0) {
        return high.saturating_mul(1_000_000);
    }
    match info.speed {
        Some(s) if s == u32::MAX as u64 => {
            debug!("ifSpeed saturated, assuming 10 Gbps");
            SATURATED_SPEED_BPS
        }
        Some(s) => s,
        None => {
            debug!("no speed reported");
            0
        }
    }
}

pub struct SpeedEvaluator;

impl MetricEvaluator for SpeedEvaluator {
    fn id(&self) -> &'static str {
        "speed"
    }

    fn evaluate(&self, ctx: &mut RunContext<'_>) -> Result<Vec<Finding>, EvalError> {
        let speed = resolve_speed(&ctx.current.interface);
        debug!(speed, "link speed resolved");
        ctx.metrics.speed_bps = speed;
        Ok(Vec::new())
    }
}
