use tracing::debug;

use crate::counter::{CounterError, CounterId};
use crate::rates::{normalize, packet_share};

use super::{
    Direction, EvalError, Finding, MetricEvaluator, MetricResult, PacketBreakdown, RunContext,
};

/// Counters chosen for one direction.
struct PacketCounters {
    unicast: CounterId,
    /// Split 64-bit multicast/broadcast, or the combined 32-bit non-unicast counter.
    split: Option<(CounterId, CounterId)>,
    non_unicast: CounterId,
}

fn select(ctx: &RunContext<'_>, dir: Direction) -> PacketCounters {
    let (hc_ucast, ucast, hc_mcast, hc_bcast, nucast) = match dir {
        Direction::In => (
            CounterId::HcInUcastPkts,
            CounterId::InUcastPkts,
            CounterId::HcInMulticastPkts,
            CounterId::HcInBroadcastPkts,
            CounterId::InNUcastPkts,
        ),
        Direction::Out => (
            CounterId::HcOutUcastPkts,
            CounterId::OutUcastPkts,
            CounterId::HcOutMulticastPkts,
            CounterId::HcOutBroadcastPkts,
            CounterId::OutNUcastPkts,
        ),
    };

    let unicast = if ctx.has(hc_ucast) { hc_ucast } else { ucast };
    let has_split = ctx.has(hc_mcast) || ctx.has(hc_bcast);
    let split = has_split.then_some((hc_mcast, hc_bcast));
    if split.is_none() {
        debug!(
            direction = dir.label(),
            "no 64-bit multicast/broadcast counters, using non-unicast"
        );
    }
    PacketCounters {
        unicast,
        split,
        non_unicast: nucast,
    }
}

/// Sum of the computable deltas, `None` when there are none.
fn total(parts: &[Option<u64>]) -> Option<u64> {
    parts
        .iter()
        .flatten()
        .copied()
        .reduce(|a, b| a.saturating_add(b))
}

/// Total packet rate per direction and the unicast/multicast/broadcast mix.
///
/// Produces no findings; its totals are the denominators of the error and
/// discard percentages.
pub struct PacketsEvaluator;

impl PacketsEvaluator {
    fn breakdown(ctx: &RunContext<'_>, dir: Direction) -> Result<PacketBreakdown, CounterError> {
        let sel = select(ctx, dir);
        let unicast = ctx.packet_delta(sel.unicast)?;
        let (multicast, broadcast, non_unicast) = match sel.split {
            Some((m, b)) => (ctx.packet_delta(m)?, ctx.packet_delta(b)?, None),
            None => (None, None, ctx.packet_delta(sel.non_unicast)?),
        };

        let total = total(&[unicast, multicast, broadcast, non_unicast]);
        let interval = ctx.interval_secs;
        let share = |d: Option<u64>| match d {
            Some(d) => MetricResult::from(packet_share(d, total, interval)),
            None => MetricResult::default(),
        };
        debug!(
            direction = dir.label(),
            ?unicast,
            ?multicast,
            ?broadcast,
            ?non_unicast,
            ?total,
            "packet deltas"
        );

        Ok(PacketBreakdown {
            total,
            total_rate: total.map(|t| normalize(t as f64, interval, None).rate),
            unicast: share(unicast),
            multicast: share(multicast),
            broadcast: share(broadcast),
            non_unicast: share(non_unicast),
        })
    }
}

impl MetricEvaluator for PacketsEvaluator {
    fn id(&self) -> &'static str {
        "packets"
    }

    fn evaluate(&self, ctx: &mut RunContext<'_>) -> Result<Vec<Finding>, EvalError> {
        for dir in Direction::BOTH {
            let breakdown = Self::breakdown(ctx, dir)?;
            *ctx.metrics.packets.get_mut(dir) = breakdown;
        }
        Ok(Vec::new())
    }
}
