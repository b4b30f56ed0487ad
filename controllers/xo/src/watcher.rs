//! Kubernetes resource watchers.
//!
//! This module handles watching Kubernetes resources for changes
//! and triggering reconciliation using kube_runtime::Controller.
//!
//! All watchers share `run_controller()`, which counts results in the
//! metrics and requeues failed objects with a per-object Fibonacci backoff.

use crate::error::ControllerError;
use crate::reconciler::{resource_key, Reconciler};
use crds::{Managed, ProviderConfig, ProviderConfigUsage};
use futures::StreamExt;
use kube::{Api, Client, ResourceExt};
use kube_runtime::controller::{Action, Config as ControllerConfig};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Boxed reconcile future
pub type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Run `controller` until its watch stream ends.
///
/// The reconcile_fn receives the shared reconciler and the object.
async fn run_controller<K, F>(
    controller: Controller<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    kind: &'static str,
    concurrency: u16,
) -> Result<(), ControllerError>
where
    K: kube::Resource<DynamicType = ()> + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", kind);

    // Error policy: requeue with a growing backoff per object
    let error_policy = move |obj: Arc<K>, err: &ControllerError, ctx: Arc<Reconciler>| {
        let key = resource_key(kind, &obj.name_any());
        let (backoff, error_count) = ctx.next_backoff(&key);
        error!(
            "Reconciliation error for {} (attempt {}), retrying in {:?}: {}",
            key, error_count, backoff, err
        );
        Action::requeue(backoff)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let key = resource_key(kind, &obj.name_any());
            debug!("Reconciling {}", key);

            let result = reconcile_fn(Arc::clone(&ctx), obj).await;
            ctx.metrics.reconciled(kind, result.is_ok());
            if result.is_ok() {
                ctx.forget(&key);
            }
            result
        }
    };

    controller
        .with_config(ControllerConfig::default().concurrency(concurrency))
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                debug!("Controller error for {}: {}", kind, e);
            }
        })
        .await;

    Err(ControllerError::Watch(format!("{kind} watch stream ended")))
}

/// Watch managed resources of kind `K`.
pub async fn watch_managed<K: Managed>(
    client: Client,
    reconciler: Arc<Reconciler>,
    kind: &'static str,
    concurrency: u16,
) -> Result<(), ControllerError> {
    let api: Api<K> = Api::all(client);
    run_controller(
        Controller::new(api, watcher::Config::default()),
        reconciler,
        |reconciler, resource: Arc<K>| {
            Box::pin(async move { reconciler.reconcile_managed(resource).await })
        },
        kind,
        concurrency,
    )
    .await
}

/// Watch ProviderConfigs, re-triggered whenever one of their usages changes.
pub async fn watch_provider_configs(
    client: Client,
    reconciler: Arc<Reconciler>,
    concurrency: u16,
) -> Result<(), ControllerError> {
    let api: Api<ProviderConfig> = Api::all(client.clone());
    let usages: Api<ProviderConfigUsage> = Api::all(client);
    let controller = Controller::new(api, watcher::Config::default()).watches(
        usages,
        watcher::Config::default(),
        |usage| Some(ObjectRef::<ProviderConfig>::new(&usage.spec.provider_config_ref.name)),
    );
    run_controller(
        controller,
        reconciler,
        |reconciler, resource| Box::pin(async move { reconciler.reconcile_provider_config(resource).await }),
        "ProviderConfig",
        concurrency,
    )
    .await
}
