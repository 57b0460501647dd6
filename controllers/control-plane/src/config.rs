//! Controller configuration from environment variables.

use crate::error::ControllerError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Runtime settings of the control plane.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Only reconcile objects in this namespace (all namespaces if `None`)
    pub namespace: Option<String>,
    /// Worker tasks per controller
    pub workers: usize,
    /// Period of the full resync
    pub resync_interval: Duration,
    /// Per-subscriber watch buffer
    pub watch_buffer: usize,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    /// Nodes registered with the scheduler at startup
    pub nodes: Vec<String>,
    /// Objects applied at startup
    pub seed_manifest: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            workers: 2,
            resync_interval: Duration::from_secs(30),
            watch_buffer: store::DEFAULT_WATCH_BUFFER,
            backoff_min: Duration::from_millis(100),
            backoff_max: Duration::from_millis(10_000),
            nodes: vec!["node-1".to_string(), "node-2".to_string(), "node-3".to_string()],
            seed_manifest: None,
        }
    }
}

impl ControllerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let workers: usize = parse(&lookup, "CONTROLLER_WORKERS", defaults.workers)?;
        if workers == 0 {
            return Err(ControllerError::InvalidConfig(
                "CONTROLLER_WORKERS must be at least 1".to_string(),
            ));
        }

        let resync_secs: u64 = parse(&lookup, "RESYNC_INTERVAL_SECS", defaults.resync_interval.as_secs())?;
        if resync_secs == 0 {
            return Err(ControllerError::InvalidConfig(
                "RESYNC_INTERVAL_SECS must be at least 1".to_string(),
            ));
        }

        let watch_buffer: usize = parse(&lookup, "WATCH_BUFFER", defaults.watch_buffer)?;
        if watch_buffer == 0 {
            return Err(ControllerError::InvalidConfig(
                "WATCH_BUFFER must be at least 1".to_string(),
            ));
        }

        let backoff_min_ms: u64 = parse(&lookup, "BACKOFF_MIN_MS", 100)?;
        let backoff_max_ms: u64 = parse(&lookup, "BACKOFF_MAX_MS", 10_000)?;
        if backoff_min_ms == 0 || backoff_min_ms > backoff_max_ms {
            return Err(ControllerError::InvalidConfig(format!(
                "backoff bounds must satisfy 0 < BACKOFF_MIN_MS ({backoff_min_ms}) <= BACKOFF_MAX_MS ({backoff_max_ms})"
            )));
        }

        let nodes = match non_empty("NODES") {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect(),
            None => defaults.nodes,
        };

        Ok(Self {
            namespace: non_empty("WATCH_NAMESPACE"),
            workers,
            resync_interval: Duration::from_secs(resync_secs),
            watch_buffer,
            backoff_min: Duration::from_millis(backoff_min_ms),
            backoff_max: Duration::from_millis(backoff_max_ms),
            nodes,
            seed_manifest: non_empty("SEED_MANIFEST").map(PathBuf::from),
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ControllerError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|e| {
            ControllerError::InvalidConfig(format!("{key}={raw:?}: {e}"))
        }),
        _ => Ok(default),
    }
}
