//! XenOrchestra Provider
//!
//! Reconciles XenOrchestra managed resources through the XenOrchestra
//! Terraform provider:
//! - VM and ACL (`xenorchestra.xo.jet.crossplane.io`)
//! - Set, a resource set (`resource.xo.jet.crossplane.io`)
//! - Config, a cloud config (`cloud.xo.jet.crossplane.io`)
//!
//! Credentials come from the `ProviderConfig` each resource references.

mod backoff;
mod clients;
mod config;
mod controller;
mod credentials;
mod error;
mod metrics;
mod reconciler;
mod server;
mod usage;
mod watcher;
#[cfg(test)]
mod test_utils;

use crate::config::Settings;
use crate::controller::Manager;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::server::ServerState;
use std::sync::Arc;
use terraform_harness::CommandRunner;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    let settings = Settings::from_env()?;

    let default_level = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    if rustls::crypto::ring::default_provider().install_default().is_err() {
        return Err(ControllerError::InvalidConfig(
            "a rustls crypto provider is already installed".to_string(),
        ));
    }

    info!("Starting XenOrchestra Provider");
    info!("Configuration:");
    info!("  Terraform: {} ({})", settings.terraform_version, settings.terraform_binary.display());
    info!("  Provider: {} {}", settings.provider_source, settings.provider_version);
    info!("  Workspaces: {}", settings.workspace_dir.display());
    info!("  Poll interval: {:?}", settings.poll_interval);

    let client = kube::Client::try_default().await?;
    let metrics = Metrics::new()?;
    let cli = Arc::new(CommandRunner::new(
        settings.terraform_binary.clone(),
        settings.terraform_timeout,
    ));

    let mut manager = Manager::new(client, &settings, cli, metrics.clone());
    controller::setup(&mut manager)?;

    let state = ServerState::new(metrics);
    manager.add_controller("Server", server::serve(settings.metrics_addr, state.clone()))?;
    state.set_ready();

    let result = manager.run().await;
    if let Err(e) = &result {
        error!("Provider stopped: {}", e);
    }
    result
}
