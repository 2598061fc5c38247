//! One check run for one interface: resolve the index, gate on interface
//! status, evaluate against the cached previous snapshot, update the cache
//! and apply the criticality policy.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, info};

use crate::cache::{CacheError, DeviceCache, find_index};
use crate::evaluate::{EvalError, EvalSettings, Evaluation, evaluate};
use crate::poll::{PollDocument, PollError, PollSource};
use crate::snapshot::{OperStatus, Snapshot};
use crate::threshold::{ConfigError, Severity};

/// Aliases matching this pattern mark an interface as critical.
pub const DEFAULT_CRITICAL_ALIAS_PATTERN: &str = "(<>|->|<*>|< >)";

#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub fn compile_critical_alias(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        name: "critical alias",
        source,
    })
}

#[derive(Clone, Debug)]
pub struct CheckConfig {
    pub hostname: String,
    pub snmp_version: String,
    pub context: Option<String>,
    /// `ifName` or `ifDescr` of the checked interface.
    pub interface: String,
    pub cache_dir: PathBuf,
    pub index_expiration: Duration,
    pub settings: EvalSettings,
    pub critical_alias: Regex,
    /// Apply the computed status even to interfaces not tagged critical.
    pub enforce_all: bool,
}

impl CheckConfig {
    pub fn device_cache(&self) -> DeviceCache {
        DeviceCache::new(
            &self.cache_dir,
            &self.hostname,
            &self.snmp_version,
            self.context.as_deref(),
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Disabled on purpose by an operator.
    AdminDown,
    OperDown(OperStatus),
    /// No previous snapshot; the current one was stored.
    FirstPoll,
    Evaluated(Box<Evaluation>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct CheckResult {
    /// Status reported to the monitoring system.
    pub status: Severity,
    /// Severity before the criticality policy was applied.
    pub severity: Severity,
    /// Alias matched the critical pattern.
    pub critical: bool,
    pub snapshot: Snapshot,
    pub outcome: Outcome,
}

impl CheckResult {
    pub fn exit_code(&self) -> i32 {
        self.status.exit_code()
    }

    pub fn evaluation(&self) -> Option<&Evaluation> {
        match &self.outcome {
            Outcome::Evaluated(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Index of the configured interface. The cached index is used while
/// fresh; it is rewritten from the poll when expired or missing, and once
/// more when the interface is not in it.
fn resolve_index(
    config: &CheckConfig,
    cache: &DeviceCache,
    poll: &PollDocument,
    now: SystemTime,
) -> Result<u32, CheckError> {
    let cached = if cache.index_expired(config.index_expiration, now)? {
        info!("interface index missing or expired, regenerating");
        None
    } else {
        cache.load_index()?
    };

    let regenerated = cached.is_none();
    let index = match cached {
        Some(index) => index,
        None => {
            cache.store_index(&poll.index)?;
            poll.index.clone()
        }
    };
    if let Some(i) = find_index(&index, &config.interface) {
        return Ok(i);
    }

    if !regenerated {
        info!(
            interface = %config.interface,
            "interface not in cached index, forcing regeneration"
        );
        cache.store_index(&poll.index)?;
        if let Some(i) = find_index(&poll.index, &config.interface) {
            return Ok(i);
        }
    }
    Err(CacheError::InterfaceNotFound(config.interface.clone()).into())
}

/// Runs one check. `now` drives index expiry and stamps undated snapshots.
pub fn run_check(
    config: &CheckConfig,
    source: &dyn PollSource,
    now: SystemTime,
) -> Result<CheckResult, CheckError> {
    let cache = config.device_cache();
    cache.ensure_dir()?;

    let poll = source.poll()?;
    let index = resolve_index(config, &cache, &poll, now)?;
    debug!(interface = %config.interface, index, "interface index resolved");

    let now_ts = DateTime::<Utc>::from(now).timestamp();
    let snapshot = poll.snapshot(index, now_ts)?;
    let info = &snapshot.interface;

    let critical = info
        .alias
        .as_deref()
        .is_some_and(|a| config.critical_alias.is_match(a));
    debug!(critical, alias = ?info.alias, "interface criticality");
    let enforced = critical || config.enforce_all;

    if info.admin() == Some(OperStatus::Down) {
        return Ok(CheckResult {
            status: Severity::Ok,
            severity: Severity::Ok,
            critical,
            outcome: Outcome::AdminDown,
            snapshot,
        });
    }

    if let Some(oper) = info.oper().filter(|s| *s != OperStatus::Up) {
        let severity = if enforced {
            Severity::Critical
        } else {
            Severity::Ok
        };
        return Ok(CheckResult {
            status: severity,
            severity,
            critical,
            outcome: Outcome::OperDown(oper),
            snapshot,
        });
    }

    let Some(previous) = cache.load_snapshot(&config.interface)? else {
        info!(interface = %config.interface, "first poll, storing initial counters");
        cache.store_snapshot(&config.interface, &snapshot)?;
        return Ok(CheckResult {
            status: Severity::Ok,
            severity: Severity::Ok,
            critical,
            outcome: Outcome::FirstPoll,
            snapshot,
        });
    };

    let evaluation = evaluate(&previous, &snapshot, &config.settings)?;
    cache.store_snapshot(&config.interface, &snapshot)?;

    let severity = evaluation.severity;
    let status = if enforced { severity } else { Severity::Ok };
    debug!(%severity, %status, "check done");

    Ok(CheckResult {
        status,
        severity,
        critical,
        outcome: Outcome::Evaluated(Box::new(evaluation)),
        snapshot,
    })
}
