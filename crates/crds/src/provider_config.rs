//! ProviderConfig and ProviderConfigUsage Custom Resource Definitions
//!
//! A `ProviderConfig` tells the provider where to find the XenOrchestra
//! credentials. Each managed resource that uses a config records that in
//! a `ProviderConfigUsage`, so a config cannot be deleted while in use.

use crate::common::Condition;
use crate::references::{ProviderConfigReference, SecretKeySelector, TypedReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label carried by a `ProviderConfigUsage`, naming its `ProviderConfig`
pub const PROVIDER_CONFIG_LABEL: &str = "crossplane.io/provider-config";

/// ProviderConfigSpec defines where the XenOrchestra credentials come from
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "xo.jet.crossplane.io",
    version = "v1alpha1",
    kind = "ProviderConfig",
    status = "ProviderConfigStatus",
    category = "crossplane",
    category = "provider",
    category = "xo",
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#,
    printcolumn = r#"{"name":"SECRET-NAME","type":"string","jsonPath":".spec.credentials.secretRef.name","priority":1}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Credentials used to connect to XenOrchestra
    pub credentials: ProviderCredentials,
}

/// Credential source and its selectors
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Where the credentials are read from
    pub source: CredentialsSource,

    /// Source-specific selectors
    #[serde(flatten)]
    pub selectors: CommonCredentialSelectors,
}

/// Where credentials are read from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum CredentialsSource {
    /// No credentials
    None,
    /// A key of a Kubernetes Secret
    Secret,
    /// The identity injected into the provider pod
    InjectedIdentity,
    /// An environment variable of the provider process
    Environment,
    /// A file on the provider's filesystem
    Filesystem,
}

impl fmt::Display for CredentialsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self {
            CredentialsSource::None => "None",
            CredentialsSource::Secret => "Secret",
            CredentialsSource::InjectedIdentity => "InjectedIdentity",
            CredentialsSource::Environment => "Environment",
            CredentialsSource::Filesystem => "Filesystem",
        };
        f.write_str(source)
    }
}

/// Selectors shared by the credential sources
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CommonCredentialSelectors {
    /// File holding the credentials (`Filesystem` source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fs: Option<FsSelector>,

    /// Environment variable holding the credentials (`Environment` source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvSelector>,

    /// Secret key holding the credentials (`Secret` source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretKeySelector>,
}

/// Filesystem credential selector
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FsSelector {
    /// Path of the credentials file
    pub path: String,
}

/// Environment credential selector
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnvSelector {
    /// Name of the environment variable
    pub name: String,
}

/// ProviderConfigStatus reports how many managed resources use the config
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigStatus {
    /// Number of managed resources using this config
    #[serde(default)]
    pub users: i64,

    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// ProviderConfigUsageSpec records that a managed resource uses a ProviderConfig
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "xo.jet.crossplane.io",
    version = "v1alpha1",
    kind = "ProviderConfigUsage",
    category = "crossplane",
    category = "provider",
    category = "xo",
    printcolumn = r#"{"name":"CONFIG-NAME","type":"string","jsonPath":".spec.providerConfigRef.name"}"#,
    printcolumn = r#"{"name":"RESOURCE-KIND","type":"string","jsonPath":".spec.resourceRef.kind"}"#,
    printcolumn = r#"{"name":"RESOURCE-NAME","type":"string","jsonPath":".spec.resourceRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    /// The ProviderConfig in use
    pub provider_config_ref: ProviderConfigReference,

    /// The managed resource using it
    pub resource_ref: TypedReference,
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_secret_credentials_deserialize() {
        let spec: ProviderConfigSpec = serde_json::from_value(serde_json::json!({
            "credentials": {
                "source": "Secret",
                "secretRef": {"name": "xo-creds", "namespace": "crossplane-system", "key": "credentials"}
            }
        }))
        .unwrap();
        assert_eq!(spec.credentials.source, CredentialsSource::Secret);
        let secret_ref = spec.credentials.selectors.secret_ref.unwrap();
        assert_eq!(secret_ref.name, "xo-creds");
        assert_eq!(secret_ref.key, "credentials");
        assert!(spec.credentials.selectors.env.is_none());
    }

    #[test]
    fn test_credentials_source_display() {
        assert_eq!(CredentialsSource::InjectedIdentity.to_string(), "InjectedIdentity");
    }

    #[test]
    fn test_provider_config_crds_are_cluster_scoped() {
        assert_eq!(ProviderConfig::crd().spec.scope, "Cluster");
        assert_eq!(ProviderConfigUsage::crd().spec.scope, "Cluster");
        assert_eq!(ProviderConfigUsage::crd().spec.group, "xo.jet.crossplane.io");
    }
}
