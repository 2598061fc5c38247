//! Reboot versus uptime-wrap disambiguation.
//!
//! `sysUpTime` is a 32-bit TimeTicks value: it wraps after ~497 days. A
//! poll gap longer than the reported uptime therefore means either the
//! device restarted (its counters restarted too) or the uptime counter
//! itself wrapped.

use tracing::{debug, warn};

use crate::snapshot::Snapshot;

/// Previous uptimes at or above `u32::MAX - margin` (in ticks) are taken as
/// about to wrap rather than as evidence of a reboot.
pub const UPTIME_WRAP_MARGIN_TICKS: u64 = 86_400;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RebootVerdict {
    /// Interval within the reported uptime, or no uptime reported.
    Normal,
    /// Interval exceeds uptime but the previous uptime is unknown; no reset applied.
    Undetermined,
    /// The uptime counter wrapped; counters are left untouched.
    UptimeWrapped,
    /// Device restarted `uptime_secs` ago.
    Rebooted { uptime_secs: u64 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RebootCheck {
    pub verdict: RebootVerdict,
    /// Interval to use for every rate of the run.
    pub interval_secs: f64,
}

pub fn disambiguate(previous: &Snapshot, current: &Snapshot) -> RebootCheck {
    let wall_secs = current.timestamp.saturating_sub(previous.timestamp);
    let normal = RebootCheck {
        verdict: RebootVerdict::Normal,
        interval_secs: wall_secs as f64,
    };

    let Some(uptime_secs) = current.uptime_secs() else {
        debug!("no uptime reported, reboot check skipped");
        return normal;
    };
    if wall_secs <= 0 || (wall_secs as u64) <= uptime_secs {
        return normal;
    }
    debug!(wall_secs, uptime_secs, "poll interval exceeds uptime");

    match previous.uptime_ticks {
        None => {
            debug!("previous uptime unavailable, overflow check skipped");
            RebootCheck {
                verdict: RebootVerdict::Undetermined,
                interval_secs: wall_secs as f64,
            }
        }
        Some(ticks) if ticks >= u32::MAX as u64 - UPTIME_WRAP_MARGIN_TICKS => {
            warn!(
                previous_ticks = ticks,
                "sysUpTime counter wrapped, previous counters kept"
            );
            RebootCheck {
                verdict: RebootVerdict::UptimeWrapped,
                interval_secs: wall_secs as f64,
            }
        }
        Some(_) => RebootCheck {
            verdict: RebootVerdict::Rebooted { uptime_secs },
            interval_secs: uptime_secs as f64,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(timestamp: i64, uptime_ticks: Option<u64>) -> Snapshot {
        Snapshot {
            timestamp,
            uptime_ticks,
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_interval_within_uptime_is_normal() {
        let c = disambiguate(&snap(0, Some(500)), &snap(300, Some(30_500)));
        assert_eq!(c.verdict, RebootVerdict::Normal);
        assert_eq!(c.interval_secs, 300.0);
    }

    #[test]
    fn test_interval_equal_to_uptime_is_normal() {
        let c = disambiguate(&snap(0, Some(500)), &snap(300, Some(30_000)));
        assert_eq!(c.verdict, RebootVerdict::Normal);
    }

    #[test]
    fn test_reboot_far_from_wrap() {
        let c = disambiguate(&snap(0, Some(100)), &snap(600, Some(30_000)));
        assert_eq!(c.verdict, RebootVerdict::Rebooted { uptime_secs: 300 });
        assert_eq!(c.interval_secs, 300.0);
    }

    #[test]
    fn test_wrap_at_margin_boundary() {
        let c = disambiguate(&snap(0, Some(4_294_880_895)), &snap(600, Some(30_000)));
        assert_eq!(c.verdict, RebootVerdict::UptimeWrapped);
        assert_eq!(c.interval_secs, 600.0);

        let c = disambiguate(&snap(0, Some(4_294_880_894)), &snap(600, Some(30_000)));
        assert!(matches!(c.verdict, RebootVerdict::Rebooted { .. }));
    }

    #[test]
    fn test_missing_previous_uptime_skips_reset() {
        let c = disambiguate(&snap(0, None), &snap(600, Some(30_000)));
        assert_eq!(c.verdict, RebootVerdict::Undetermined);
        assert_eq!(c.interval_secs, 600.0);
    }

    #[test]
    fn test_missing_current_uptime_is_normal() {
        let c = disambiguate(&snap(0, Some(100)), &snap(600, None));
        assert_eq!(c.verdict, RebootVerdict::Normal);
    }

    #[test]
    fn test_clock_going_backwards_is_normal() {
        let c = disambiguate(&snap(600, Some(100)), &snap(0, Some(10)));
        assert_eq!(c.verdict, RebootVerdict::Normal);
        assert_eq!(c.interval_secs, -600.0);
    }
}
