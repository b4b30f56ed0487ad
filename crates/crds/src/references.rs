//! Object references used by the XenOrchestra CRDs
//!
//! Follows the Crossplane reference shapes: a managed resource names its
//! `ProviderConfig`, a `ProviderConfig` names a Secret key holding the
//! credentials, and a `ProviderConfigUsage` points back at the managed
//! resource that uses the config.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name of the `ProviderConfig` used when a managed resource does not set one.
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

/// Reference to a cluster-scoped `ProviderConfig`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    /// Name of the referenced `ProviderConfig`
    pub name: String,
}

impl ProviderConfigReference {
    /// Create a reference to the named `ProviderConfig`
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for ProviderConfigReference {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER_CONFIG)
    }
}

/// Serde default for `spec.providerConfigRef`
pub(crate) fn default_provider_config_ref() -> Option<ProviderConfigReference> {
    Some(ProviderConfigReference::default())
}

/// Selects a key of a namespaced Secret
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeySelector {
    /// Name of the Secret
    pub name: String,

    /// Namespace of the Secret
    pub namespace: String,

    /// Key within the Secret's data
    pub key: String,
}

/// Reference to the managed resource that uses a `ProviderConfig`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    /// API version of the referenced resource (e.g. "xenorchestra.xo.jet.crossplane.io/v1alpha1")
    pub api_version: String,

    /// Kind of the referenced resource (e.g. "VM")
    pub kind: String,

    /// Name of the referenced resource
    pub name: String,

    /// UID of the referenced resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}
