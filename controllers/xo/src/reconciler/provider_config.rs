//! ProviderConfig reconciler
//!
//! Counts the `ProviderConfigUsage` objects labelled with the config's
//! name into `status.users` and keeps the `in-use` finalizer on the config
//! until no managed resource uses it any more.

use super::Reconciler;
use crate::error::ControllerError;
use crds::{ProviderConfig, ProviderConfigStatus, ProviderConfigUsage, PROVIDER_CONFIG_LABEL};
use kube::api::{ListParams, Patch, PatchParams};
use kube::{Api, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Event};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Finalizer held by a ProviderConfig
pub const IN_USE_FINALIZER: &str = "in-use.crossplane.io";

/// Label selector matching the usages of `name`
pub fn usage_selector(name: &str) -> String {
    format!("{PROVIDER_CONFIG_LABEL}={name}")
}

/// Status reporting `users`, keeping the existing conditions
pub fn users_status(current: Option<&ProviderConfigStatus>, users: usize) -> ProviderConfigStatus {
    ProviderConfigStatus {
        users: i64::try_from(users).unwrap_or(i64::MAX),
        conditions: current.map(|s| s.conditions.clone()).unwrap_or_default(),
    }
}

/// Refuse to release a ProviderConfig that still has users
pub fn ensure_unused(name: &str, users: usize) -> Result<(), ControllerError> {
    if users > 0 {
        return Err(ControllerError::ProviderConfigInUse {
            name: name.to_string(),
            users,
        });
    }
    Ok(())
}

impl Reconciler {
    /// Reconciles a ProviderConfig resource.
    pub async fn reconcile_provider_config(&self, config: Arc<ProviderConfig>) -> Result<Action, ControllerError> {
        let api: Api<ProviderConfig> = Api::all(self.client.clone());
        finalizer(&api, IN_USE_FINALIZER, config, |event| async {
            match event {
                Event::Apply(config) => self.apply_provider_config(&api, &config).await,
                Event::Cleanup(config) => self.cleanup_provider_config(&api, &config).await,
            }
        })
        .await
        .map_err(ControllerError::from)
    }

    async fn apply_provider_config(
        &self,
        api: &Api<ProviderConfig>,
        config: &ProviderConfig,
    ) -> Result<Action, ControllerError> {
        let users = self.count_users(api, config).await?;
        debug!("ProviderConfig {} has {} user(s)", config.name_any(), users);
        Ok(Action::await_change())
    }

    async fn cleanup_provider_config(
        &self,
        api: &Api<ProviderConfig>,
        config: &ProviderConfig,
    ) -> Result<Action, ControllerError> {
        let name = config.name_any();
        let users = self.count_users(api, config).await?;
        ensure_unused(&name, users)
            .inspect_err(|_| warn!("ProviderConfig {} is being deleted but still has {} user(s)", name, users))?;
        info!("ProviderConfig {} has no users, allowing deletion", name);
        Ok(Action::await_change())
    }

    /// List the usages of `config` and record their number in its status
    async fn count_users(&self, api: &Api<ProviderConfig>, config: &ProviderConfig) -> Result<usize, ControllerError> {
        let name = config.name_any();
        let usages: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        let users = usages
            .list(&ListParams::default().labels(&usage_selector(&name)))
            .await?
            .items
            .len();

        let status = users_status(config.status.as_ref(), users);
        if config.status.as_ref() != Some(&status) {
            let patch = json!({"status": status});
            api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
                .await?;
        }
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crds::Condition;

    #[test]
    fn test_usage_selector() {
        assert_eq!(usage_selector("default"), "crossplane.io/provider-config=default");
    }

    #[test]
    fn test_users_status_keeps_conditions() {
        let current = ProviderConfigStatus {
            users: 3,
            conditions: vec![Condition::available()],
        };
        let status = users_status(Some(&current), 1);
        assert_eq!(status.users, 1);
        assert_eq!(status.conditions, current.conditions);

        assert_eq!(users_status(None, 0), ProviderConfigStatus::default());
    }

    #[test]
    fn test_deletion_blocked_while_in_use() {
        let err = ensure_unused("default", 2).unwrap_err();
        assert!(matches!(
            err,
            ControllerError::ProviderConfigInUse { ref name, users: 2 } if name == "default"
        ));

        assert!(ensure_unused("default", 0).is_ok());
    }
}
