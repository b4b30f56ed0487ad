//! Test utilities for unit testing reconcilers
//!
//! This module provides helpers for creating test data and an in-memory
//! `ProviderConfigStore`.

use crate::clients::ProviderConfigStore;
use crate::error::StoreError;
use async_trait::async_trait;
use crds::*;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

/// In-memory `ProviderConfigStore`
#[derive(Debug, Clone, Default)]
pub struct MockStore {
    provider_configs: Arc<Mutex<HashMap<String, ProviderConfig>>>,
    secrets: Arc<Mutex<HashMap<(String, String), Secret>>>,
    usages: Arc<Mutex<Vec<ProviderConfigUsage>>>,
    fail_usage: Arc<Mutex<bool>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_provider_config(&self, config: ProviderConfig) {
        self.provider_configs
            .lock()
            .unwrap()
            .insert(config.name_any(), config);
    }

    pub fn add_secret(&self, namespace: &str, name: &str, key: &str, value: &[u8]) {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([(key.to_string(), ByteString(value.to_vec()))])),
            ..Default::default()
        };
        self.put_secret(secret);
    }

    pub fn put_secret(&self, secret: Secret) {
        let key = (secret.namespace().unwrap_or_default(), secret.name_any());
        self.secrets.lock().unwrap().insert(key, secret);
    }

    /// Make `apply_usage` fail as if the usage CRD were not installed
    pub fn fail_usage(&self) {
        *self.fail_usage.lock().unwrap() = true;
    }

    pub fn usages(&self) -> Vec<ProviderConfigUsage> {
        self.usages.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderConfigStore for MockStore {
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError> {
        self.provider_configs
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "ProviderConfig",
                name: name.to_string(),
            })
    }

    async fn apply_usage(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        if *self.fail_usage.lock().unwrap() {
            return Err(StoreError::NotFound {
                kind: "CustomResourceDefinition",
                name: "providerconfigusages.xo.jet.crossplane.io".to_string(),
            });
        }
        let mut usages = self.usages.lock().unwrap();
        usages.retain(|u| u.name_any() != usage.name_any());
        usages.push(usage.clone());
        Ok(())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, StoreError> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Secret",
                name: format!("{namespace}/{name}"),
            })
    }
}

/// Secret-sourced credentials
pub fn secret_credentials(namespace: &str, name: &str, key: &str) -> ProviderCredentials {
    ProviderCredentials {
        source: CredentialsSource::Secret,
        selectors: CommonCredentialSelectors {
            secret_ref: Some(SecretKeySelector {
                name: name.to_string(),
                namespace: namespace.to_string(),
                key: key.to_string(),
            }),
            ..Default::default()
        },
    }
}

/// Helper to create a test ProviderConfig reading the `credentials` key of a secret
pub fn create_test_provider_config(name: &str, secret_namespace: &str, secret_name: &str) -> ProviderConfig {
    ProviderConfig::new(
        name,
        ProviderConfigSpec {
            credentials: secret_credentials(secret_namespace, secret_name, "credentials"),
        },
    )
}

/// Helper to create a test ACL; `provider_config` defaults to `default`
pub fn create_test_acl(name: &str, uid: Option<&str>, provider_config: Option<&str>) -> Acl {
    Acl {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            uid: uid.map(str::to_string),
            ..Default::default()
        },
        spec: AclSpec {
            provider_config_ref: Some(ProviderConfigReference::new(
                provider_config.unwrap_or(DEFAULT_PROVIDER_CONFIG),
            )),
            deletion_policy: DeletionPolicy::Delete,
            for_provider: AclParameters {
                action: "viewer".to_string(),
                object: "vm-1".to_string(),
                subject: "user-1".to_string(),
            },
        },
        status: None,
    }
}

/// Kubernetes client pointing at an unreachable API server
///
/// Good for building contexts in tests that never talk to the cluster.
pub fn test_client() -> kube::Client {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let config = kube::Config::new("http://127.0.0.1:9".parse().unwrap());
    kube::Client::try_from(config).unwrap()
}

/// Reconciler over `store` whose workspaces live under `root` and run `cli`
pub fn test_reconciler(
    root: impl Into<std::path::PathBuf>,
    store: MockStore,
    cli: terraform_harness::MockTerraformCli,
) -> crate::reconciler::Reconciler {
    crate::reconciler::Reconciler::new(
        test_client(),
        Arc::new(store),
        crate::clients::TerraformSetupBuilder::new("1.5.7", "vatesfr/xenorchestra", "0.26.1"),
        terraform_harness::WorkspaceStore::new(root, Arc::new(cli)),
        crate::metrics::Metrics::new().unwrap(),
        std::time::Duration::from_secs(60),
    )
}
