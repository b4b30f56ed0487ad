//! Reconciliation logic for the XenOrchestra provider.
//!
//! - `managed`: the generic managed-resource reconciler (VM, ACL, resource
//!   set, cloud config), driving Terraform through a per-resource workspace
//! - `provider_config`: ProviderConfig usage accounting and deletion guard

pub mod managed;
pub mod provider_config;

use crate::backoff::FibonacciBackoff;
use crate::clients::{ProviderConfigStore, TerraformSetupBuilder};
use crate::metrics::Metrics;
use kube::Client;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use terraform_harness::WorkspaceStore;
use tracing::warn;

/// Fallback requeue delay when the backoff state is unavailable
const DEFAULT_BACKOFF: Duration = Duration::from_secs(30);

/// Backoff state for a resource
#[derive(Debug, Clone)]
struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
}

impl BackoffState {
    fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(5, 300), // 5 seconds min, 5 minutes max
            error_count: 0,
        }
    }
}

/// Shared context of every controller
pub struct Reconciler {
    pub(crate) client: Client,
    pub(crate) store: Arc<dyn ProviderConfigStore>,
    pub(crate) setup_builder: TerraformSetupBuilder,
    pub(crate) workspaces: WorkspaceStore,
    pub(crate) metrics: Metrics,
    pub(crate) poll_interval: Duration,
    /// Error count tracking per resource (kind/name -> BackoffState)
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("setup_builder", &self.setup_builder)
            .field("workspaces", &self.workspaces)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a new reconciler context.
    pub fn new(
        client: Client,
        store: Arc<dyn ProviderConfigStore>,
        setup_builder: TerraformSetupBuilder,
        workspaces: WorkspaceStore,
        metrics: Metrics,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            store,
            setup_builder,
            workspaces,
            metrics,
            poll_interval,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Count an error for `resource_key` and return how long to wait before retrying
    ///
    /// Returns (backoff, error_count)
    pub fn next_backoff(&self, resource_key: &str) -> (Duration, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states
                    .entry(resource_key.to_string())
                    .or_insert_with(BackoffState::new);
                state.error_count += 1;
                (state.backoff.next_backoff(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (DEFAULT_BACKOFF, 0)
            }
        }
    }

    /// Drop the backoff state of `resource_key` (after success or deletion)
    pub fn forget(&self, resource_key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(resource_key);
        }
    }
}

/// Backoff and log key of an object
pub fn resource_key(kind: &str, name: &str) -> String {
    format!("{kind}/{name}")
}
