//! Clients and adapters used to reach XenOrchestra through Terraform.
//!
//! - `xo`: builds the Terraform `Setup` for a managed resource from its
//!   `ProviderConfig`
//! - `ProviderConfigStore`: the Kubernetes reads and writes that needs,
//!   behind a trait so it can be mocked

pub mod xo;

pub use xo::TerraformSetupBuilder;

use crate::error::StoreError;
use async_trait::async_trait;
use crds::{ProviderConfig, ProviderConfigUsage};
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};

/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "xo-provider";

/// Kubernetes objects the setup builder reads or writes
///
/// All methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    /// Get a cluster-scoped `ProviderConfig`
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError>;

    /// Create or update a `ProviderConfigUsage`
    async fn apply_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError>;

    /// Get a namespaced `Secret`
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError>;
}

/// `ProviderConfigStore` backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    /// Create a store using `client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderConfigStore for KubeStore {
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError> {
        let api: Api<ProviderConfig> = Api::all(self.client.clone());
        api.get_opt(name).await?.ok_or_else(|| StoreError::NotFound {
            kind: "ProviderConfig",
            name: name.to_string(),
        })
    }

    async fn apply_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        let api: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        let pp = PatchParams::apply(FIELD_MANAGER).force();
        api.patch(&usage.name_any(), &pp, &Patch::Apply(usage)).await?;
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await?.ok_or_else(|| StoreError::NotFound {
            kind: "Secret",
            name: format!("{namespace}/{name}"),
        })
    }
}
