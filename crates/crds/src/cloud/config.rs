//! Config Custom Resource Definition
//!
//! A cloud-init template stored in XenOrchestra. Backed by the
//! `xenorchestra_cloud_config` Terraform resource.

use crate::common::{DeletionPolicy, ResourceStatus};
use crate::managed::impl_managed;
use crate::references::{default_provider_config_ref, ProviderConfigReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// CloudConfigSpec defines the desired state of a XenOrchestra cloud config
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "cloud.xo.jet.crossplane.io",
    version = "v1alpha1",
    kind = "Config",
    root = "CloudConfig",
    status = "CloudConfigStatus",
    category = "crossplane",
    category = "managed",
    category = "xo",
    printcolumn = r#"{"name":"READY","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"SYNCED","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME","type":"string","jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfigSpec {
    /// ProviderConfig holding the XenOrchestra credentials
    #[serde(default = "default_provider_config_ref")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    /// What happens to the cloud config in XenOrchestra when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Cloud config parameters
    pub for_provider: CloudConfigParameters,
}

/// Cloud config parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfigParameters {
    /// Template name
    pub name: String,

    /// Cloud-init user data template
    pub template: String,
}

/// Observed cloud config attributes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CloudConfigObservation {
    /// XenOrchestra cloud config id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Cloud config status
pub type CloudConfigStatus = ResourceStatus<CloudConfigObservation>;

impl_managed!(
    CloudConfig,
    CloudConfigParameters,
    CloudConfigObservation,
    "xenorchestra_cloud_config"
);
