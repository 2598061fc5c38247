//! Rate and percentage normalization.
//!
//! Turns raw counter deltas into per-second rates and, when a capacity is
//! known, into a share of that capacity. Every evaluator goes through
//! these two functions so that the divide-by-zero and clamping rules live
//! in one place.

use tracing::{debug, warn};

/// Per-second rate and optional percentage of a capacity.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Normalized {
    pub rate: f64,
    pub percentage: Option<f64>,
}

/// `delta / elapsed_secs`, plus `rate / capacity * 100` when capacity is positive.
///
/// A non-positive interval carries no rate information and yields a zero rate.
pub fn normalize(delta: f64, elapsed_secs: f64, capacity: Option<f64>) -> Normalized {
    let rate = if elapsed_secs > 0.0 {
        delta / elapsed_secs
    } else {
        0.0
    };
    let percentage = capacity.filter(|&c| c > 0.0).map(|c| rate / c * 100.0);
    Normalized { rate, percentage }
}

/// Rate of one packet type and its share of the direction's packet total.
///
/// A delta larger than the total is a data inconsistency (e.g. the error
/// counter advanced faster than the packet counters) and is clamped to 0.
/// Without a known total the delta is used as-is and no percentage is given.
pub fn packet_share(delta: u64, total: Option<u64>, elapsed_secs: f64) -> Normalized {
    let delta = match total {
        Some(total) if delta > total => {
            warn!(delta, total, "packet delta exceeds total, clamped to 0");
            0
        }
        _ => delta,
    };

    let rate = normalize(delta as f64, elapsed_secs, None).rate;
    let percentage = total
        .filter(|&t| t > 0)
        .map(|t| delta as f64 / t as f64 * 100.0);
    debug!(delta, ?total, rate, ?percentage, "packet share");
    Normalized { rate, percentage }
}
