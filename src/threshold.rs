//! Severity levels, operator thresholds and classification.

use std::fmt;

use thiserror::Error;

/// Check severity. The derived ordering drives aggregation: a run's
/// overall severity is the maximum of its per-metric severities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    #[default]
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Severity {
    /// Monitoring plugin exit code.
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Critical => 2,
            Severity::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Metric families that carry operator thresholds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricFamily {
    Bandwidth,
    Errors,
    Discards,
}

impl fmt::Display for MetricFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetricFamily::Bandwidth => "bandwidth",
            MetricFamily::Errors => "error",
            MetricFamily::Discards => "discard",
        })
    }
}

/// What a threshold value is compared against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThresholdUnit {
    /// Percentage of capacity (link speed, or total packets).
    Percentage,
    /// Absolute rate, packets per second.
    Rate,
}

impl ThresholdUnit {
    pub fn suffix(self) -> &'static str {
        match self {
            ThresholdUnit::Percentage => "%",
            ThresholdUnit::Rate => "pps",
        }
    }
}

/// Threshold configuration errors. All of them are detected before evaluation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {family} threshold '{value}': expected a number followed by '%' or 'pps'")]
    InvalidThreshold { family: MetricFamily, value: String },

    #[error("{family} thresholds don't have the same type")]
    UnitMismatch { family: MetricFamily },

    #[error("{family} thresholds must be expressed in %")]
    PercentageOnly { family: MetricFamily },

    #[error("{name} must be a positive number, got {value}")]
    InvalidLimit { name: &'static str, value: f64 },

    #[error("invalid {name} pattern: {source}")]
    InvalidPattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },
}

/// Parses `"80%"`, `"12.5 %"` or `"50pps"`.
pub fn parse_threshold_value(
    family: MetricFamily,
    s: &str,
) -> Result<(f64, ThresholdUnit), ConfigError> {
    let invalid = || ConfigError::InvalidThreshold {
        family,
        value: s.to_string(),
    };
    let s_trim = s.trim();
    let (num, unit) = if let Some(num) = s_trim.strip_suffix('%') {
        (num, ThresholdUnit::Percentage)
    } else if let Some(num) = s_trim.strip_suffix("pps") {
        (num, ThresholdUnit::Rate)
    } else {
        return Err(invalid());
    };
    let value: f64 = num.trim().parse().map_err(|_| invalid())?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid());
    }
    Ok((value, unit))
}

/// Warning/critical cutoffs sharing one unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
    pub unit: ThresholdUnit,
}

impl Threshold {
    /// Builds a threshold from the operator's warning and critical strings.
    pub fn parse(family: MetricFamily, warning: &str, critical: &str) -> Result<Self, ConfigError> {
        let (warning, warn_unit) = parse_threshold_value(family, warning)?;
        let (critical, crit_unit) = parse_threshold_value(family, critical)?;
        if warn_unit != crit_unit {
            return Err(ConfigError::UnitMismatch { family });
        }
        Ok(Self {
            warning,
            critical,
            unit: warn_unit,
        })
    }

    pub fn classify(&self, value: f64) -> Severity {
        classify(value, self.warning, self.critical)
    }

    /// The cutoff that `severity` was raised against, for messages.
    pub fn cutoff(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            _ => self.warning,
        }
    }
}

/// Critical-first, strictly-greater-than classification.
pub fn classify(value: f64, warning: f64, critical: f64) -> Severity {
    if value > critical {
        Severity::Critical
    } else if value > warning {
        Severity::Warning
    } else {
        Severity::Ok
    }
}

/// Validated thresholds for every family.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdSet {
    bandwidth: Threshold,
    errors: Threshold,
    discards: Threshold,
}

impl ThresholdSet {
    /// Bandwidth must be a percentage; errors and discards may use either
    /// unit but warning and critical must agree.
    pub fn new(
        bandwidth: Threshold,
        errors: Threshold,
        discards: Threshold,
    ) -> Result<Self, ConfigError> {
        if bandwidth.unit != ThresholdUnit::Percentage {
            return Err(ConfigError::PercentageOnly {
                family: MetricFamily::Bandwidth,
            });
        }
        Ok(Self {
            bandwidth,
            errors,
            discards,
        })
    }

    /// Parses all six operator strings at once.
    pub fn parse(
        bandwidth: (&str, &str),
        errors: (&str, &str),
        discards: (&str, &str),
    ) -> Result<Self, ConfigError> {
        Self::new(
            Threshold::parse(MetricFamily::Bandwidth, bandwidth.0, bandwidth.1)?,
            Threshold::parse(MetricFamily::Errors, errors.0, errors.1)?,
            Threshold::parse(MetricFamily::Discards, discards.0, discards.1)?,
        )
    }

    pub fn get(&self, family: MetricFamily) -> &Threshold {
        match family {
            MetricFamily::Bandwidth => &self.bandwidth,
            MetricFamily::Errors => &self.errors,
            MetricFamily::Discards => &self.discards,
        }
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        let pct = |warning, critical| Threshold {
            warning,
            critical,
            unit: ThresholdUnit::Percentage,
        };
        let pps = |warning, critical| Threshold {
            warning,
            critical,
            unit: ThresholdUnit::Rate,
        };
        Self {
            bandwidth: pct(80.0, 90.0),
            errors: pps(50.0, 100.0),
            discards: pps(50.0, 100.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_critical_first_strict() {
        assert_eq!(classify(95.0, 80.0, 90.0), Severity::Critical);
        assert_eq!(classify(85.0, 80.0, 90.0), Severity::Warning);
        assert_eq!(classify(90.0, 80.0, 90.0), Severity::Warning);
        assert_eq!(classify(80.0, 80.0, 90.0), Severity::Ok);
        assert_eq!(classify(0.0, 80.0, 90.0), Severity::Ok);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let mut last = Severity::Ok;
        for step in 0..=400 {
            let value = step as f64 * 0.5;
            let s = classify(value, 80.0, 90.0);
            assert!(s >= last, "severity dropped at {value}");
            last = s;
        }
        assert_eq!(last, Severity::Critical);
    }

    #[test]
    fn test_classify_inverted_cutoffs_still_critical_first() {
        assert_eq!(classify(60.0, 90.0, 50.0), Severity::Critical);
    }

    #[test]
    fn test_severity_ordering_and_exit_codes() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Critical);
        assert!(Severity::Critical < Severity::Unknown);
        let worst = [Severity::Warning, Severity::Ok, Severity::Critical]
            .into_iter()
            .max()
            .unwrap();
        assert_eq!(worst, Severity::Critical);
        assert_eq!(Severity::Unknown.exit_code(), 3);
    }

    #[test]
    fn test_parse_threshold_values() {
        let errors = MetricFamily::Errors;
        assert_eq!(
            parse_threshold_value(errors, "50pps").unwrap(),
            (50.0, ThresholdUnit::Rate)
        );
        assert_eq!(
            parse_threshold_value(errors, " 12.5 %").unwrap(),
            (12.5, ThresholdUnit::Percentage)
        );
        assert!(parse_threshold_value(errors, "50").is_err());
        assert!(parse_threshold_value(errors, "abc%").is_err());
        assert!(parse_threshold_value(errors, "-3%").is_err());
    }

    #[test]
    fn test_mismatched_units_rejected() {
        let parsed = Threshold::parse(MetricFamily::Discards, "50pps", "10%");
        assert!(matches!(parsed, Err(ConfigError::UnitMismatch { .. })));
        assert_eq!(
            parsed.unwrap_err().to_string(),
            "discard thresholds don't have the same type"
        );
    }

    #[test]
    fn test_bandwidth_must_be_percentage() {
        let parsed = ThresholdSet::parse(("80pps", "90pps"), ("1%", "2%"), ("1%", "2%"));
        assert!(matches!(parsed, Err(ConfigError::PercentageOnly { .. })));
    }

    #[test]
    fn test_threshold_set_parse() {
        let parsed = ThresholdSet::parse(("80%", "90%"), ("1%", "5%"), ("50pps", "100pps"));
        let set = parsed.unwrap();
        let errors = set.get(MetricFamily::Errors);
        assert_eq!(errors.unit, ThresholdUnit::Percentage);
        assert_eq!(set.get(MetricFamily::Discards).unit, ThresholdUnit::Rate);
        assert_eq!(set.get(MetricFamily::Bandwidth).critical, 90.0);

        let (bw, err, disc) = (("80%", "90%"), ("50pps", "100pps"), ("50pps", "100pps"));
        let parsed = ThresholdSet::parse(bw, err, disc).unwrap();
        assert_eq!(parsed, ThresholdSet::default());
    }
}
