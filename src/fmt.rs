//! Shared formatting helpers for check output.
//!
//! All pure formatting functions (no status logic, no layout) live here.

/// Format a value with decimal (1000-based) K/M/G/T prefixes.
///
/// `"850.00 Mbits/sec"`, `"1.25 Gbps"`, `"12.00 bits/sec"`
pub fn human_readable(value: f64, suffix: &str) -> String {
    const K: f64 = 1_000.0;
    const M: f64 = K * 1_000.0;
    const G: f64 = M * 1_000.0;
    const T: f64 = G * 1_000.0;

    let (scaled, unit) = if value >= T {
        (value / T, "T")
    } else if value >= G {
        (value / G, "G")
    } else if value >= M {
        (value / M, "M")
    } else if value >= K {
        (value / K, "K")
    } else {
        (value, "")
    };
    format!("{scaled:.2} {unit}{suffix}")
}

/// Format a bandwidth rate in bits/sec: `"850.00 Mbits/sec"`.
pub fn format_bandwidth(bits_per_sec: f64) -> String {
    human_readable(bits_per_sec, "bits/sec")
}

/// Format a link speed: `"1.00 Gbps"`, `"0.00 bps"` when unknown.
pub fn format_speed(bits_per_sec: u64) -> String {
    human_readable(bits_per_sec as f64, "bps")
}

/// Format a packet rate: `"12.50 pps"`.
pub fn format_pps(rate: f64) -> String {
    format!("{rate:.2} pps")
}

/// Format an optional percentage: `"92.30%"`, or `"n/a"` when absent.
pub fn format_pct(pct: Option<f64>) -> String {
    match pct {
        Some(p) => format!("{p:.2}%"),
        None => "n/a".to_string(),
    }
}

/// Format duration in seconds: `"3m 5s"`, `"0s"` for `<= 0`.
pub fn format_duration(secs: i64) -> String {
    if secs <= 0 {
        return "0s".to_string();
    }
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}
