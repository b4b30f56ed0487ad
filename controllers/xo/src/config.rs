//! Provider settings loaded from environment variables.

use crate::error::ControllerError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Default Terraform provider source
pub const DEFAULT_PROVIDER_SOURCE: &str = "vatesfr/xenorchestra";

/// Runtime settings of the provider process
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Terraform CLI version (`TERRAFORM_VERSION`)
    pub terraform_version: String,
    /// Terraform provider source (`TERRAFORM_PROVIDER_SOURCE`)
    pub provider_source: String,
    /// Terraform provider version (`TERRAFORM_PROVIDER_VERSION`)
    pub provider_version: String,
    /// Terraform binary (`TERRAFORM_BINARY`)
    pub terraform_binary: PathBuf,
    /// Root of the per-resource workspaces (`WORKSPACE_DIR`)
    pub workspace_dir: PathBuf,
    /// Requeue interval for healthy resources (`POLL_INTERVAL_SECS`)
    pub poll_interval: Duration,
    /// Concurrent reconciles per controller (`MAX_RECONCILE_RATE`)
    pub max_reconcile_rate: u16,
    /// Timeout of a single terraform command (`TERRAFORM_TIMEOUT_SECS`)
    pub terraform_timeout: Duration,
    /// Metrics and probes listen address (`METRICS_ADDR`)
    pub metrics_addr: SocketAddr,
    /// Debug logging (`DEBUG`)
    pub debug: bool,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load settings through `lookup`, which returns a variable's value if set
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name).filter(|v| !v.is_empty()).ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{name} environment variable is required"))
            })
        };
        let or_default = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        let parsed = |name: &str, default: u64| -> Result<u64, ControllerError> {
            match lookup(name).filter(|v| !v.is_empty()) {
                Some(value) => value.parse().ok().filter(|n: &u64| *n > 0).ok_or_else(|| {
                    ControllerError::InvalidConfig(format!("{name} must be a positive integer, got {value:?}"))
                }),
                None => Ok(default),
            }
        };

        let max_reconcile_rate = parsed("MAX_RECONCILE_RATE", 10)?;
        let max_reconcile_rate = u16::try_from(max_reconcile_rate)
            .ok()
            .filter(|rate| *rate > 0)
            .ok_or_else(|| {
                ControllerError::InvalidConfig(format!(
                    "MAX_RECONCILE_RATE must be between 1 and {}",
                    u16::MAX
                ))
            })?;

        let metrics_addr = or_default("METRICS_ADDR", "0.0.0.0:8080");
        let metrics_addr = metrics_addr.parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("METRICS_ADDR is not a socket address: {metrics_addr:?}"))
        })?;

        Ok(Self {
            terraform_version: required("TERRAFORM_VERSION")?,
            provider_source: or_default("TERRAFORM_PROVIDER_SOURCE", DEFAULT_PROVIDER_SOURCE),
            provider_version: required("TERRAFORM_PROVIDER_VERSION")?,
            terraform_binary: PathBuf::from(or_default("TERRAFORM_BINARY", "terraform")),
            workspace_dir: PathBuf::from(or_default("WORKSPACE_DIR", "/tmp/xo-provider")),
            poll_interval: Duration::from_secs(parsed("POLL_INTERVAL_SECS", 60)?),
            max_reconcile_rate,
            terraform_timeout: Duration::from_secs(parsed("TERRAFORM_TIMEOUT_SECS", 1200)?),
            metrics_addr,
            debug: lookup("DEBUG").is_some_and(|v| v == "true" || v == "1"),
        })
    }
}
