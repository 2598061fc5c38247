//! Full check runs against a scratch cache directory.

use std::fs;
use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use tempfile::{TempDir, tempdir};

use ifcheck::check::{
    CheckConfig, DEFAULT_CRITICAL_ALIAS_PATTERN, Outcome, compile_critical_alias, run_check,
};
use ifcheck::evaluate::EvalSettings;
use ifcheck::poll::{JsonPollSource, PollDocument};
use ifcheck::report::render;
use ifcheck::threshold::{Severity, ThresholdSet};

fn config(dir: &TempDir, interface: &str) -> CheckConfig {
    CheckConfig {
        hostname: "core-sw1".into(),
        snmp_version: "2c".into(),
        context: None,
        interface: interface.into(),
        cache_dir: dir.path().to_path_buf(),
        index_expiration: Duration::from_secs(3600),
        settings: EvalSettings::with_defaults().unwrap(),
        critical_alias: compile_critical_alias(DEFAULT_CRITICAL_ALIAS_PATTERN).unwrap(),
        enforce_all: false,
    }
}

/// Poll of a 1 Gbps uplink tagged critical, `in_octets`/`in_errors` at `timestamp`.
fn poll_json(timestamp: i64, in_octets: u64, in_errors: u64) -> String {
    format!(
        r#"{{
            "timestamp": {timestamp},
            "uptime_ticks": {uptime},
            "index": {{
                "1": {{ "if_descr": "GigabitEthernet0/1", "if_name": "Gi0/1" }},
                "2": {{ "if_descr": "GigabitEthernet0/2", "if_name": "Gi0/2" }}
            }},
            "interfaces": {{
                "1": {{
                    "interface": {{
                        "name": "Gi0/1",
                        "descr": "GigabitEthernet0/1",
                        "alias": "<> uplink | dc1",
                        "high_speed": 1000,
                        "admin_status": 1,
                        "oper_status": 1,
                        "duplex_status": 3
                    }},
                    "counters": {{
                        "hc_in_octets": {in_octets},
                        "hc_out_octets": 0,
                        "hc_in_ucast_pkts": {in_octets},
                        "in_errors": {in_errors},
                        "out_errors": 0
                    }}
                }}
            }}
        }}"#,
        uptime = 50_000_000 + timestamp * 100,
    )
}

#[test]
fn test_first_poll_then_critical_bandwidth() {
    let dir = tempdir().unwrap();
    let cfg = config(&dir, "Gi0/1");
    let now = SystemTime::now();

    let poll_path = dir.path().join("poll.json");
    fs::write(&poll_path, poll_json(1_000, 0, 0)).unwrap();
    let source = JsonPollSource::from_arg(poll_path.to_str().unwrap());
    let first = run_check(&cfg, &source, now).unwrap();
    assert_eq!(first.outcome, Outcome::FirstPoll);
    assert_eq!(first.exit_code(), 0);
    assert!(first.critical);
    assert_eq!(
        render(&first, &ThresholdSet::default(), false),
        "OK: First poll, initial counters stored."
    );

    let cache_dir = dir.path().join("core-sw1_SNMPv2c");
    assert!(cache_dir.join("index.json").exists());
    assert!(cache_dir.join("Gi0_1.json").exists());

    // 95% of 1 Gbps over 10 s
    fs::write(&poll_path, poll_json(1_010, 1_187_500_000, 20)).unwrap();
    let second = run_check(&cfg, &source, now).unwrap();
    assert_eq!(second.status, Severity::Critical);
    assert_eq!(second.exit_code(), 2);
    let alias = second.snapshot.interface.alias.as_deref();
    assert_eq!(alias, Some("<> uplink ! dc1"));

    let text = render(&second, &ThresholdSet::default(), false);
    let lines: Vec<&str> = text.lines().collect();
    let head = "CRITICAL: Critical Error(s) found on the interface: | speed=1000000000;;;; ";
    assert!(lines[0].starts_with(head));
    assert!(lines[0].contains(" in_usage=95.00%;80;90;0;100 "));
    assert!(lines[0].contains(" out_usage=0.00%;80;90;0;100 "));
    assert!(lines[0].contains(" in_errors=2.00pps;50;100;0; "));
    assert!(lines[0].ends_with(" duplexmode=3;;;;"));
    assert_eq!(
        lines[1],
        "Very high In Bandwidth: 950.00 Mbits/sec - 95.00% (> 90%)"
    );
    assert_eq!(lines.len(), 2);
}

#[test]
fn test_untagged_interface_reports_ok() {
    let dir = tempdir().unwrap();
    let cfg = config(&dir, "Gi0/1");
    let now = SystemTime::now();

    let mut first: PollDocument = serde_json::from_str(&poll_json(1_000, 0, 0)).unwrap();
    let busy = poll_json(1_010, 1_187_500_000, 0);
    let mut second: PollDocument = serde_json::from_str(&busy).unwrap();
    for doc in [&mut first, &mut second] {
        if let Some(snap) = doc.interfaces.get_mut(&1) {
            snap.interface.alias = Some("office printer".into());
        }
    }

    run_check(&cfg, &first, now).unwrap();
    let result = run_check(&cfg, &second, now).unwrap();
    assert!(!result.critical);
    assert_eq!(result.severity, Severity::Critical);
    assert_eq!(result.status, Severity::Ok);

    let text = render(&result, &ThresholdSet::default(), false);
    let head = "OK: Critical Error(s) found on the interface: | ";
    assert!(text.starts_with(head));
    assert!(text.contains("\nVery high In Bandwidth: "));
}

#[test]
fn test_verbose_report_and_reboot_interval() {
    let dir = tempdir().unwrap();
    let cfg = config(&dir, "GigabitEthernet0/1");
    let now = SystemTime::now();

    let first: PollDocument = serde_json::from_str(&poll_json(1_000, 5_000_000, 0)).unwrap();
    run_check(&cfg, &first, now).unwrap();

    // 600 s later the device reports only 300 s of uptime
    let mut second: PollDocument = serde_json::from_str(&poll_json(1_600, 3_750_000, 0)).unwrap();
    second.uptime_ticks = Some(30_000);
    let result = run_check(&cfg, &second, now).unwrap();

    let eval = result.evaluation().unwrap();
    assert_eq!(eval.interval_secs, 300.0);
    assert_eq!(eval.metrics.bandwidth.inbound.rate, Some(100_000.0));

    let text = render(&result, &ThresholdSet::default(), true);
    assert!(text.starts_with("OK: No error found on the interface. | "));
    assert!(text.contains("\nName: Gi0/1\n"));
    assert!(text.contains("\nAlias: <> uplink ! dc1\n"));
    let interval = "\nInterval: 5m 0s (device rebooted, counters reset)\n";
    assert!(text.contains(interval));
    assert!(text.contains("\nIn BW: 100.00 Kbits/sec (0.01%)\n"));
    assert!(text.ends_with("\nDuplex: Full-Duplex"));
}

#[test]
fn test_unknown_interface_is_an_error() {
    let dir = tempdir().unwrap();
    let cfg = config(&dir, "Gi9/9");
    let doc: PollDocument = serde_json::from_str(&poll_json(1_000, 0, 0)).unwrap();

    let err = run_check(&cfg, &doc, SystemTime::now()).unwrap_err();
    assert_eq!(err.to_string(), "index for interface Gi9/9 not found");
}
