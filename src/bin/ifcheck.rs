//! ifcheck - network interface health check.
//!
//! Reads one SNMP poll of a device, compares the requested interface with
//! the snapshot cached by the previous run and prints a monitoring plugin
//! result. The exit code is the check status (0 OK, 1 WARNING, 2 CRITICAL,
//! 3 UNKNOWN).

use std::path::PathBuf;
use std::process;
use std::time::{Duration, SystemTime};

use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

use ifcheck::anomaly::AnomalyLimits;
use ifcheck::check::{
    CheckConfig, CheckError, DEFAULT_CRITICAL_ALIAS_PATTERN, compile_critical_alias, run_check,
};
use ifcheck::evaluate::{DEFAULT_VIRTUAL_PATTERN, EvalSettings};
use ifcheck::poll::JsonPollSource;
use ifcheck::report::render;
use ifcheck::threshold::{Severity, ThresholdSet};

/// Network interface health check.
#[derive(Parser)]
#[command(name = "ifcheck", about = "Network interface health check", version)]
struct Args {
    /// Device hostname or address, used to name the cache directory.
    #[arg(short = 'H', long, env = "IFCHECK_HOSTNAME")]
    hostname: String,

    /// Interface to check, by ifName or ifDescr.
    #[arg(short, long, env = "IFCHECK_INTERFACE")]
    interface: String,

    /// SNMP version the poll was made with.
    #[arg(long, default_value = "2c", value_parser = ["2c", "3"], env = "IFCHECK_SNMP_VERSION")]
    snmp_version: String,

    /// SNMP context (v3) or community-indexed context.
    #[arg(short = 'n', long, env = "IFCHECK_CONTEXT")]
    context: Option<String>,

    /// JSON poll document produced by the SNMP collector ("-" for stdin).
    #[arg(short, long, default_value = "-", env = "IFCHECK_POLL_FILE")]
    poll_file: String,

    /// Directory holding the per-device caches.
    #[arg(long, default_value = "/var/tmp/ifcheck", env = "IFCHECK_CACHE_DIR")]
    cache_dir: PathBuf,

    /// Interface index lifetime in minutes.
    #[arg(long, default_value = "60", env = "IFCHECK_INDEX_EXPIRATION")]
    index_expiration: u64,

    /// Bandwidth warning threshold (percent only, e.g. "80%").
    #[arg(long, default_value = "80%", env = "IFCHECK_BANDWIDTH_WARNING")]
    bandwidth_warning: String,

    #[arg(long, default_value = "90%", env = "IFCHECK_BANDWIDTH_CRITICAL")]
    bandwidth_critical: String,

    /// Error warning threshold ("50pps" or "1%").
    #[arg(long, default_value = "50pps", env = "IFCHECK_ERROR_WARNING")]
    error_warning: String,

    #[arg(long, default_value = "100pps", env = "IFCHECK_ERROR_CRITICAL")]
    error_critical: String,

    /// Discard warning threshold ("50pps" or "1%").
    #[arg(long, default_value = "50pps", env = "IFCHECK_DISCARD_WARNING")]
    discard_warning: String,

    #[arg(long, default_value = "100pps", env = "IFCHECK_DISCARD_CRITICAL")]
    discard_critical: String,

    /// Utilization (percent) above which bandwidth counters are considered corrupt.
    #[arg(long, default_value = "200", env = "IFCHECK_MAX_UTILIZATION")]
    max_utilization: f64,

    /// Rate (bits/sec) above which bandwidth counters are considered corrupt
    /// when the link speed is unknown.
    #[arg(long, default_value = "1e12", env = "IFCHECK_MAX_RATE")]
    max_rate: f64,

    /// Interfaces whose name or description match get no utilization percentage.
    #[arg(long, default_value = DEFAULT_VIRTUAL_PATTERN, env = "IFCHECK_VIRTUAL_PATTERN")]
    virtual_pattern: String,

    /// Aliases matching this pattern tag the interface as critical.
    #[arg(
        long,
        default_value = DEFAULT_CRITICAL_ALIAS_PATTERN,
        env = "IFCHECK_CRITICAL_ALIAS_PATTERN"
    )]
    critical_alias_pattern: String,

    /// Report the computed status even for interfaces not tagged critical.
    #[arg(long, env = "IFCHECK_ENFORCE_ALL")]
    enforce_all: bool,

    /// Print the detail summary (-v), plus debug logs (-vv) or trace logs (-vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only log errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber on stderr so that stdout carries
/// only the check result. Default level is WARN.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        LevelFilter::ERROR
    } else {
        match verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<CheckConfig, CheckError> {
    let thresholds = ThresholdSet::parse(
        (&args.bandwidth_warning[..], &args.bandwidth_critical[..]),
        (&args.error_warning[..], &args.error_critical[..]),
        (&args.discard_warning[..], &args.discard_critical[..]),
    )?;
    let limits = AnomalyLimits::new(args.max_utilization, args.max_rate)?;
    let settings = EvalSettings::new(thresholds, limits, &args.virtual_pattern)?;

    Ok(CheckConfig {
        hostname: args.hostname.clone(),
        snmp_version: args.snmp_version.clone(),
        context: args.context.clone(),
        interface: args.interface.clone(),
        cache_dir: args.cache_dir.clone(),
        index_expiration: Duration::from_secs(args.index_expiration.saturating_mul(60)),
        settings,
        critical_alias: compile_critical_alias(&args.critical_alias_pattern)?,
        enforce_all: args.enforce_all,
    })
}

fn run(args: &Args) -> Result<(String, i32), CheckError> {
    let config = build_config(args)?;
    let source = JsonPollSource::from_arg(&args.poll_file);
    debug!(?source, interface = %config.interface, "starting check");

    let result = run_check(&config, &source, SystemTime::now())?;
    let output = render(&result, &config.settings.thresholds, args.verbose > 0);
    Ok((output, result.exit_code()))
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(&args) {
        Ok((output, code)) => {
            println!("{output}");
            process::exit(code);
        }
        Err(e) => {
            error!("check failed: {e}");
            println!("{}: {e}", Severity::Unknown);
            process::exit(Severity::Unknown.exit_code());
        }
    }
}
