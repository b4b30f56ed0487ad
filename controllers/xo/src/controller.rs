//! Controller registration.
//!
//! The `Manager` owns the shared Kubernetes client and reconciler context.
//! Each entry of [`SETUPS`] attaches one controller to it; they run at
//! start-up in order and the first failure aborts start-up.

use crate::clients::{KubeStore, TerraformSetupBuilder};
use crate::config::Settings;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crate::reconciler::Reconciler;
use crate::watcher;
use crds::{Acl, CloudConfig, Managed, ResourceSet, Vm};
use futures::future::select_all;
use kube::Client;
use std::future::Future;
use std::sync::Arc;
use terraform_harness::{TerraformCli, WorkspaceStore};
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Attaches one controller to the manager
pub type SetupFn = fn(&mut Manager) -> Result<(), ControllerError>;

/// Every controller of the provider, in registration order
pub const SETUPS: [(&str, SetupFn); 5] = [
    ("Config", setup_cloud_config),
    ("ProviderConfig", setup_provider_config),
    ("Set", setup_resource_set),
    ("ACL", setup_acl),
    ("VM", setup_vm),
];

/// Runs the provider's controllers.
pub struct Manager {
    client: Client,
    reconciler: Arc<Reconciler>,
    concurrency: u16,
    controllers: Vec<(&'static str, JoinHandle<Result<(), ControllerError>>)>,
}

impl std::fmt::Debug for Manager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("reconciler", &self.reconciler)
            .field("concurrency", &self.concurrency)
            .field("controllers", &self.registered())
            .finish_non_exhaustive()
    }
}

impl Manager {
    /// Creates a manager with the shared reconciler context.
    pub fn new(client: Client, settings: &Settings, cli: Arc<dyn TerraformCli>, metrics: Metrics) -> Self {
        let setup_builder = TerraformSetupBuilder::new(
            &settings.terraform_version,
            &settings.provider_source,
            &settings.provider_version,
        );
        let reconciler = Reconciler::new(
            client.clone(),
            Arc::new(KubeStore::new(client.clone())),
            setup_builder,
            WorkspaceStore::new(&settings.workspace_dir, cli),
            metrics,
            settings.poll_interval,
        );
        Self {
            client,
            reconciler: Arc::new(reconciler),
            concurrency: settings.max_reconcile_rate,
            controllers: Vec::new(),
        }
    }

    /// Kinds with a registered controller, in registration order
    pub fn registered(&self) -> Vec<&'static str> {
        self.controllers.iter().map(|(kind, _)| *kind).collect()
    }

    /// Spawn `controller` as the task of `kind`; its end stops [`Manager::run`]
    pub fn add_controller<F>(&mut self, kind: &'static str, controller: F) -> Result<(), ControllerError>
    where
        F: Future<Output = Result<(), ControllerError>> + Send + 'static,
    {
        if self.controllers.iter().any(|(registered, _)| *registered == kind) {
            return Err(ControllerError::DuplicateController(kind));
        }
        self.controllers.push((kind, tokio::spawn(controller)));
        Ok(())
    }

    /// Register the managed-resource controller of `K`
    pub fn add_managed<K: Managed>(&mut self, kind: &'static str) -> Result<(), ControllerError> {
        let controller =
            watcher::watch_managed::<K>(self.client.clone(), Arc::clone(&self.reconciler), kind, self.concurrency);
        self.add_controller(kind, controller)
    }

    /// Wait until any controller stops; that is always an error.
    pub async fn run(self) -> Result<(), ControllerError> {
        if self.controllers.is_empty() {
            return Err(ControllerError::InvalidConfig("no controllers registered".to_string()));
        }
        let (kinds, handles): (Vec<_>, Vec<_>) = self.controllers.into_iter().unzip();
        info!("Running {} controllers", handles.len());

        let (result, index, _remaining) = select_all(handles).await;
        let kind = kinds[index];
        match result {
            Ok(Ok(())) => {
                error!("{} controller stopped", kind);
                Err(ControllerError::Watch(format!("{kind} controller stopped")))
            }
            Ok(Err(e)) => {
                error!("{} controller failed: {}", kind, e);
                Err(e)
            }
            Err(e) => {
                error!("{} controller panicked: {}", kind, e);
                Err(ControllerError::Watch(format!("{kind} controller task failed: {e}")))
            }
        }
    }
}

/// Run every setup function in `setups` against `manager`
pub fn setup_with(manager: &mut Manager, setups: &[(&str, SetupFn)]) -> Result<(), ControllerError> {
    for (kind, setup) in setups {
        setup(manager).inspect_err(|e| error!("Failed to set up {} controller: {}", kind, e))?;
        info!("Registered {} controller", kind);
    }
    Ok(())
}

/// Register all controllers of the provider
pub fn setup(manager: &mut Manager) -> Result<(), ControllerError> {
    setup_with(manager, &SETUPS)
}

fn setup_cloud_config(manager: &mut Manager) -> Result<(), ControllerError> {
    manager.add_managed::<CloudConfig>("Config")
}

fn setup_provider_config(manager: &mut Manager) -> Result<(), ControllerError> {
    let controller = watcher::watch_provider_configs(
        manager.client.clone(),
        Arc::clone(&manager.reconciler),
        manager.concurrency,
    );
    manager.add_controller("ProviderConfig", controller)
}

fn setup_resource_set(manager: &mut Manager) -> Result<(), ControllerError> {
    manager.add_managed::<ResourceSet>("Set")
}

fn setup_acl(manager: &mut Manager) -> Result<(), ControllerError> {
    manager.add_managed::<Acl>("ACL")
}

fn setup_vm(manager: &mut Manager) -> Result<(), ControllerError> {
    manager.add_managed::<Vm>("VM")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_client;
    use std::collections::HashMap;
    use terraform_harness::MockTerraformCli;

    fn manager() -> Manager {
        let settings = Settings::from_lookup(|name| {
            HashMap::from([("TERRAFORM_VERSION", "1.5.7"), ("TERRAFORM_PROVIDER_VERSION", "0.26.1")])
                .get(name)
                .map(|v| v.to_string())
        })
        .unwrap();
        Manager::new(
            test_client(),
            &settings,
            Arc::new(MockTerraformCli::new()),
            Metrics::new().unwrap(),
        )
    }

    fn pending(manager: &mut Manager, kind: &'static str) -> Result<(), ControllerError> {
        manager.add_controller(kind, futures::future::pending())
    }

    fn fake_acl(manager: &mut Manager) -> Result<(), ControllerError> {
        pending(manager, "ACL")
    }

    fn fake_vm(manager: &mut Manager) -> Result<(), ControllerError> {
        pending(manager, "VM")
    }

    fn failing(_manager: &mut Manager) -> Result<(), ControllerError> {
        Err(ControllerError::InvalidConfig("boom".to_string()))
    }

    #[test]
    fn test_setup_order() {
        let kinds: Vec<&str> = SETUPS.iter().map(|(kind, _)| *kind).collect();
        assert_eq!(kinds, vec!["Config", "ProviderConfig", "Set", "ACL", "VM"]);
    }

    #[tokio::test]
    async fn test_setup_registers_in_order() {
        let mut manager = manager();
        let setups: [(&str, SetupFn); 2] = [("ACL", fake_acl), ("VM", fake_vm)];
        setup_with(&mut manager, &setups).unwrap();
        assert_eq!(manager.registered(), vec!["ACL", "VM"]);
    }

    #[tokio::test]
    async fn test_setup_stops_at_first_error() {
        let mut manager = manager();
        let setups: [(&str, SetupFn); 3] = [("ACL", fake_acl), ("Broken", failing), ("VM", fake_vm)];
        let err = setup_with(&mut manager, &setups).unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConfig(_)));
        assert_eq!(manager.registered(), vec!["ACL"]);
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let mut manager = manager();
        fake_acl(&mut manager).unwrap();
        assert!(matches!(
            fake_acl(&mut manager),
            Err(ControllerError::DuplicateController("ACL"))
        ));
    }

    #[tokio::test]
    async fn test_run_returns_when_a_controller_stops() {
        let mut manager = manager();
        fake_acl(&mut manager).unwrap();
        manager
            .add_controller("VM", async { Err(ControllerError::Watch("VM watch stream ended".to_string())) })
            .unwrap();

        let err = manager.run().await.unwrap_err();
        assert_eq!(err.to_string(), "Resource watch failed: VM watch stream ended");
    }

    #[tokio::test]
    async fn test_run_stops_when_metrics_server_cannot_bind() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();

        let mut manager = manager();
        fake_acl(&mut manager).unwrap();
        let state = crate::server::ServerState::new(Metrics::new().unwrap());
        manager.add_controller("Server", crate::server::serve(addr, state)).unwrap();

        let err = manager.run().await.unwrap_err();
        assert!(matches!(err, ControllerError::Io(_)));
    }

    #[tokio::test]
    async fn test_run_without_controllers() {
        assert!(manager().run().await.is_err());
    }
}
