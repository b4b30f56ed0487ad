//! Prometheus metrics exposed by the provider.
//!
//! A `Metrics` value owns its `Registry`, so tests can create as many
//! instances as they like. Clones share the same collectors.

use prometheus::{histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::future::Future;
use std::time::Instant;

/// Result label of a successful reconciliation
pub const RESULT_SUCCESS: &str = "success";
/// Result label of a failed reconciliation
pub const RESULT_ERROR: &str = "error";

/// Provider metrics
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    reconciliations: IntCounterVec,
    terraform_duration: HistogramVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics").finish_non_exhaustive()
    }
}

impl Metrics {
    /// Create the collectors and register them in a fresh registry
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations = IntCounterVec::new(
            opts!(
                "xo_provider_reconcile_total",
                "Total number of reconciliations, by kind and result."
            ),
            &["kind", "result"],
        )?;

        // Terraform against XenOrchestra: seconds for refresh, minutes for VM creation
        let terraform_duration = HistogramVec::new(
            histogram_opts!(
                "xo_provider_terraform_duration_seconds",
                "Duration of terraform operations.",
                vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0]
            ),
            &["operation", "result"],
        )?;

        registry.register(Box::new(reconciliations.clone()))?;
        registry.register(Box::new(terraform_duration.clone()))?;

        Ok(Self {
            registry,
            reconciliations,
            terraform_duration,
        })
    }

    /// Count a reconciliation of `kind`
    pub fn reconciled(&self, kind: &str, success: bool) {
        let result = if success { RESULT_SUCCESS } else { RESULT_ERROR };
        self.reconciliations.with_label_values(&[kind, result]).inc();
    }

    /// Number of reconciliations of `kind` with `result`
    #[cfg(test)]
    pub fn reconcile_count(&self, kind: &str, result: &str) -> u64 {
        self.reconciliations.with_label_values(&[kind, result]).get()
    }

    /// Run a terraform `operation` and record how long it took
    pub async fn time_terraform<T, E, F>(&self, operation: &str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = fut.await;
        let outcome = if result.is_ok() { RESULT_SUCCESS } else { RESULT_ERROR };
        self.terraform_duration
            .with_label_values(&[operation, outcome])
            .observe(started.elapsed().as_secs_f64());
        result
    }

    /// Render every metric in the Prometheus text format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
