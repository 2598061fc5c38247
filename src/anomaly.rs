//! Bandwidth plausibility checks.
//!
//! A stale or corrupted previous counter can make a poll report traffic
//! far beyond what the link can carry. Such readings are zeroed and the
//! run is quarantined: packet counters from the same poll are assumed to
//! be just as corrupted.

use tracing::warn;

use crate::threshold::ConfigError;

/// Default ceiling for utilization of a link with known speed.
/// Some operator links legitimately burst above nominal capacity.
pub const DEFAULT_MAX_UTILIZATION_PCT: f64 = 200.0;

/// Default ceiling (bits/sec) for links that report no speed (bonds, aggregates).
pub const DEFAULT_MAX_RATE_BPS: f64 = 1_000_000_000_000.0;

/// Ceilings beyond which a bandwidth reading is considered impossible.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnomalyLimits {
    pub max_utilization_pct: f64,
    pub max_rate_bps: f64,
}

impl Default for AnomalyLimits {
    fn default() -> Self {
        Self {
            max_utilization_pct: DEFAULT_MAX_UTILIZATION_PCT,
            max_rate_bps: DEFAULT_MAX_RATE_BPS,
        }
    }
}

impl AnomalyLimits {
    pub fn new(max_utilization_pct: f64, max_rate_bps: f64) -> Result<Self, ConfigError> {
        if max_utilization_pct.is_nan() || max_utilization_pct <= 0.0 {
            return Err(ConfigError::InvalidLimit {
                name: "max utilization",
                value: max_utilization_pct,
            });
        }
        if max_rate_bps.is_nan() || max_rate_bps <= 0.0 {
            return Err(ConfigError::InvalidLimit {
                name: "max rate",
                value: max_rate_bps,
            });
        }
        Ok(Self {
            max_utilization_pct,
            max_rate_bps,
        })
    }
}

/// Outcome of [`check_bandwidth`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BandwidthCheck {
    pub rate: f64,
    pub percentage: Option<f64>,
    pub anomaly: bool,
}

/// Validates one bandwidth reading.
///
/// With a known capacity the percentage is compared against
/// `max_utilization_pct`; otherwise the raw rate is compared against
/// `max_rate_bps`. An implausible reading comes back as zero rate and zero
/// percentage with `anomaly` set; the caller owns raising the run flag.
pub fn check_bandwidth(
    rate: f64,
    percentage: Option<f64>,
    capacity_known: bool,
    limits: &AnomalyLimits,
) -> BandwidthCheck {
    let implausible = if capacity_known {
        percentage.is_some_and(|p| p > limits.max_utilization_pct)
    } else {
        rate > limits.max_rate_bps
    };

    if !implausible {
        return BandwidthCheck {
            rate,
            percentage,
            anomaly: false,
        };
    }

    warn!(
        rate,
        ?percentage,
        capacity_known,
        "implausible bandwidth reading, zeroing and quarantining packet counters"
    );
    BandwidthCheck {
        rate: 0.0,
        percentage: percentage.map(|_| 0.0),
        anomaly: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plausible_reading_passes_through() {
        let c = check_bandwidth(950_000_000.0, Some(95.0), true, &AnomalyLimits::default());
        assert_eq!(c.rate, 950_000_000.0);
        assert_eq!(c.percentage, Some(95.0));
        assert!(!c.anomaly);
    }

    #[test]
    fn test_overshoot_up_to_limit_is_allowed() {
        let c = check_bandwidth(2.0e9, Some(200.0), true, &AnomalyLimits::default());
        assert!(!c.anomaly);
        assert_eq!(c.percentage, Some(200.0));
    }

    #[test]
    fn test_above_200_percent_is_zeroed() {
        let c = check_bandwidth(2.5e9, Some(250.0), true, &AnomalyLimits::default());
        assert!(c.anomaly);
        assert_eq!(c.rate, 0.0);
        assert_eq!(c.percentage, Some(0.0));
    }

    #[test]
    fn test_unknown_capacity_uses_absolute_ceiling() {
        let limits = AnomalyLimits::default();
        assert!(!check_bandwidth(9.0e11, None, false, &limits).anomaly);

        let c = check_bandwidth(1.5e12, None, false, &limits);
        assert!(c.anomaly);
        assert_eq!(c.rate, 0.0);
        assert_eq!(c.percentage, None);
    }

    #[test]
    fn test_custom_limits() {
        let limits = AnomalyLimits::new(120.0, 1.0e9).unwrap();
        assert!(check_bandwidth(1.3e9, Some(130.0), true, &limits).anomaly);
        assert!(check_bandwidth(2.0e9, None, false, &limits).anomaly);
    }

    #[test]
    fn test_limits_must_be_positive() {
        assert!(AnomalyLimits::new(0.0, 1.0).is_err());
        assert!(AnomalyLimits::new(200.0, -1.0).is_err());
        assert!(AnomalyLimits::new(f64::NAN, 1.0).is_err());
    }
}
