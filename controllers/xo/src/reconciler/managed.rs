//! Managed resource reconciler
//!
//! One implementation serves every managed kind. Each resource gets a
//! Terraform workspace keyed by its UID:
//!
//! 1. build the Terraform setup from the resource's `ProviderConfig`
//! 2. write the workspace (seeding state from the external name)
//! 3. `init`, then refresh the state from XenOrchestra
//! 4. create the resource when it does not exist, otherwise plan and
//!    apply when the plan is not empty
//! 5. record the external name and `atProvider`, mark Ready and Synced
//!
//! Deletion destroys the external resource unless the deletion policy is
//! `Orphan`, then removes the workspace.

use super::{resource_key, Reconciler};
use crate::error::ControllerError;
use crate::metrics::Metrics;
use crds::{
    set_condition, Condition, DeletionPolicy, Managed, ResourceStatus, EXTERNAL_NAME_ANNOTATION,
};
use kube::api::{Patch, PatchParams};
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use serde_json::{json, Value};
use std::sync::Arc;
use terraform_harness::{from_terraform, to_terraform, ObservedResource, ResourceBlock, TerraformError, Workspace};
use tracing::{debug, info, warn};

/// Finalizer held by every managed resource
pub const MANAGED_FINALIZER: &str = "finalizer.managedresource.crossplane.io";

/// What a reconciliation did to the external resource
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Created it
    Created(ObservedResource),
    /// Applied pending changes
    Updated(ObservedResource),
    /// Nothing to do
    UpToDate(ObservedResource),
}

impl SyncOutcome {
    /// The resource as it is now
    pub fn observed(&self) -> &ObservedResource {
        match self {
            SyncOutcome::Created(o) | SyncOutcome::Updated(o) | SyncOutcome::UpToDate(o) => o,
        }
    }
}

/// What cleanup did with the external resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Release {
    /// Left in place (`deletionPolicy: Orphan`)
    Orphaned,
    /// Destroyed
    Destroyed,
    /// Already gone
    Missing,
}

/// Annotation patch recording `observed` as the external name, unless it already is
pub fn external_name_patch<K: Managed>(managed: &K, observed: &ObservedResource) -> Option<Value> {
    (managed.external_name() != Some(observed.id.as_str()))
        .then(|| json!({"metadata": {"annotations": {EXTERNAL_NAME_ANNOTATION: observed.id}}}))
}

/// Terraform resource block for `managed`
pub fn resource_block<K: Managed>(managed: &K, prevent_destroy: bool) -> Result<ResourceBlock, ControllerError> {
    let attributes = to_terraform(&serde_json::to_value(managed.for_provider())?);
    let mut block = ResourceBlock::new(K::TERRAFORM_TYPE, &managed.name_any(), attributes);
    block.prevent_destroy = prevent_destroy;
    Ok(block)
}

/// `atProvider` from the attributes Terraform recorded
pub fn observation<K: Managed>(observed: &ObservedResource) -> Result<K::Observation, ControllerError> {
    let attributes = from_terraform(&Value::Object(observed.attributes.clone()));
    Ok(serde_json::from_value(attributes)?)
}

/// Status after a successful reconciliation
pub fn available_status<O: Clone>(current: Option<&ResourceStatus<O>>, at_provider: O) -> ResourceStatus<O> {
    let mut conditions = current.map(|s| s.conditions.clone()).unwrap_or_default();
    set_condition(&mut conditions, Condition::available());
    set_condition(&mut conditions, Condition::reconcile_success());
    ResourceStatus {
        conditions,
        at_provider: Some(at_provider),
    }
}

/// Status with `condition` set, keeping everything else
pub fn status_with<O: Clone>(current: Option<&ResourceStatus<O>>, condition: Condition) -> ResourceStatus<O> {
    let mut status = ResourceStatus {
        conditions: current.map(|s| s.conditions.clone()).unwrap_or_default(),
        at_provider: current.and_then(|s| s.at_provider.clone()),
    };
    set_condition(&mut status.conditions, condition);
    status
}

/// Refresh the workspace state; `None` when the external resource does not exist
pub async fn observe_external(workspace: &Workspace, metrics: &Metrics) -> Result<Option<ObservedResource>, TerraformError> {
    metrics.time_terraform("init", workspace.init()).await?;
    metrics.time_terraform("refresh", workspace.refresh()).await
}

/// Create the external resource
pub async fn create_external(workspace: &Workspace, metrics: &Metrics) -> Result<SyncOutcome, TerraformError> {
    let created = metrics.time_terraform("apply", workspace.apply()).await?;
    Ok(SyncOutcome::Created(created))
}

/// Apply pending changes to an existing external resource
pub async fn update_external(
    workspace: &Workspace,
    metrics: &Metrics,
    observed: ObservedResource,
) -> Result<SyncOutcome, TerraformError> {
    let plan = metrics.time_terraform("plan", workspace.plan()).await?;
    if plan.is_empty() {
        return Ok(SyncOutcome::UpToDate(observed));
    }
    debug!(dir = %workspace.dir().display(), ?plan, "applying pending changes");
    let updated = metrics.time_terraform("apply", workspace.apply()).await?;
    Ok(SyncOutcome::Updated(updated))
}

/// Destroy the external resource if it still exists; returns whether it did
pub async fn delete_external(workspace: &Workspace, metrics: &Metrics) -> Result<bool, TerraformError> {
    if observe_external(workspace, metrics).await?.is_none() {
        return Ok(false);
    }
    metrics.time_terraform("destroy", workspace.destroy()).await?;
    Ok(true)
}

impl Reconciler {
    /// Reconciles a managed resource of kind `K`.
    pub async fn reconcile_managed<K: Managed>(&self, managed: Arc<K>) -> Result<Action, ControllerError> {
        let api: Api<K> = Api::all(self.client.clone());
        finalizer(&api, MANAGED_FINALIZER, managed, |event| async {
            match event {
                Event::Apply(managed) => self.apply_managed(&api, &managed).await,
                Event::Cleanup(managed) => self.cleanup_managed(&api, &managed).await,
            }
        })
        .await
        .map_err(ControllerError::from)
    }

    async fn apply_managed<K: Managed>(&self, api: &Api<K>, managed: &K) -> Result<Action, ControllerError> {
        let name = managed.name_any();
        let kind = K::kind(&());
        info!("Reconciling {} {}", kind, name);

        match self.sync_managed(api, managed).await {
            Ok(outcome) => {
                let observed = outcome.observed();
                match &outcome {
                    SyncOutcome::Created(_) => info!("Created {} {} as {}", kind, name, observed.id),
                    SyncOutcome::Updated(_) => info!("Updated {} {} ({})", kind, name, observed.id),
                    SyncOutcome::UpToDate(_) => debug!("{} {} is up to date ({})", kind, name, observed.id),
                }

                if let Some(patch) = external_name_patch(managed, observed) {
                    api.patch(&name, &PatchParams::default(), &Patch::Merge(&patch))
                        .await?;
                }

                let status = available_status(managed.managed_status(), observation::<K>(observed)?);
                self.patch_status(api, managed, &status).await?;
                Ok(Action::requeue(self.poll_interval))
            }
            Err(e) => {
                self.record_error(api, managed, &e).await;
                Err(e)
            }
        }
    }

    async fn sync_managed<K: Managed>(&self, api: &Api<K>, managed: &K) -> Result<SyncOutcome, ControllerError> {
        let (workspace, observed) = self.prepare_managed(managed).await?;
        let outcome = match observed {
            Some(observed) => update_external(&workspace, &self.metrics, observed).await?,
            None => {
                let creating = status_with(managed.managed_status(), Condition::creating());
                self.patch_status(api, managed, &creating).await?;
                create_external(&workspace, &self.metrics).await?
            }
        };
        Ok(outcome)
    }

    /// Open the workspace of `managed` and observe its external resource
    async fn prepare_managed<K: Managed>(
        &self,
        managed: &K,
    ) -> Result<(Workspace, Option<ObservedResource>), ControllerError> {
        let uid = managed_uid(managed)?;
        let setup = self.setup_builder.build(self.store.as_ref(), managed).await?;
        let block = resource_block(managed, true)?;
        let workspace = self
            .workspaces
            .open(&uid, &setup, block, managed.external_name())
            .await?;
        let observed = observe_external(&workspace, &self.metrics).await?;
        Ok((workspace, observed))
    }

    async fn cleanup_managed<K: Managed>(&self, api: &Api<K>, managed: &K) -> Result<Action, ControllerError> {
        let name = managed.name_any();
        let kind = K::kind(&());

        let deleting = status_with(managed.managed_status(), Condition::deleting());
        self.patch_status(api, managed, &deleting).await?;

        match self.release_managed(managed).await {
            Ok(Release::Orphaned) => info!("Orphaned {} {} in XenOrchestra (deletionPolicy: Orphan)", kind, name),
            Ok(Release::Destroyed) => info!("Deleted {} {} from XenOrchestra", kind, name),
            Ok(Release::Missing) => info!("{} {} no longer exists in XenOrchestra", kind, name),
            Err(e) => {
                self.record_error(api, managed, &e).await;
                return Err(e);
            }
        }
        Ok(Action::await_change())
    }

    /// Destroy the external resource unless it is orphaned, then drop the workspace
    async fn release_managed<K: Managed>(&self, managed: &K) -> Result<Release, ControllerError> {
        let uid = managed_uid(managed)?;
        let release = if managed.deletion_policy() == DeletionPolicy::Orphan {
            Release::Orphaned
        } else {
            let setup = self.setup_builder.build(self.store.as_ref(), managed).await?;
            let block = resource_block(managed, false)?;
            let workspace = self
                .workspaces
                .open(&uid, &setup, block, managed.external_name())
                .await?;
            if delete_external(&workspace, &self.metrics).await? {
                Release::Destroyed
            } else {
                Release::Missing
            }
        };
        self.workspaces.remove(&uid).await?;
        Ok(release)
    }

    async fn patch_status<K: Managed>(
        &self,
        api: &Api<K>,
        managed: &K,
        status: &ResourceStatus<K::Observation>,
    ) -> Result<(), ControllerError> {
        if managed.managed_status() == Some(status) {
            return Ok(());
        }
        let patch = json!({"status": status});
        api.patch_status(&managed.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    /// Best-effort `Synced=False` with the error message
    async fn record_error<K: Managed>(&self, api: &Api<K>, managed: &K, error: &ControllerError) {
        let status = status_with(managed.managed_status(), Condition::reconcile_error(error.to_string()));
        if let Err(e) = self.patch_status(api, managed, &status).await {
            warn!(
                "Failed to record error status on {}: {}",
                resource_key(&K::kind(&()), &managed.name_any()),
                e
            );
        }
    }
}

fn managed_uid<K: Managed>(managed: &K) -> Result<String, ControllerError> {
    managed.uid().ok_or_else(|| {
        ControllerError::InvalidResource(format!("{} {} has no uid", K::kind(&()), managed.name_any()))
    })
}
