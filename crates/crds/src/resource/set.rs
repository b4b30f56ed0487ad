//! Set Custom Resource Definition
//!
//! A XenOrchestra resource set: a quota of CPUs, memory, disk and other
//! resources that a list of subjects may consume on a list of objects.
//! Backed by the `xenorchestra_resource_set` Terraform resource.

use crate::common::{DeletionPolicy, ResourceStatus};
use crate::managed::impl_managed;
use crate::references::{default_provider_config_ref, ProviderConfigReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// ResourceSetSpec defines the desired state of a XenOrchestra resource set
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "resource.xo.jet.crossplane.io",
    version = "v1alpha1",
    kind = "Set",
    root = "ResourceSet",
    status = "ResourceSetStatus",
    category = "crossplane",
    category = "managed",
    category = "xo",
    printcolumn = r#"{"name":"READY","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"SYNCED","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME","type":"string","jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSetSpec {
    /// ProviderConfig holding the XenOrchestra credentials
    #[serde(default = "default_provider_config_ref")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    /// What happens to the resource set in XenOrchestra when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// Resource set parameters
    pub for_provider: ResourceSetParameters,
}

/// Resource set parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSetParameters {
    /// Resource set name
    pub name: String,

    /// Users and groups allowed to use the set
    pub subjects: Vec<String>,

    /// Templates, storage repositories and networks the set covers
    pub objects: Vec<String>,

    /// Resource quotas
    pub limit: Vec<LimitParameters>,
}

/// One resource quota
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LimitParameters {
    /// Limited resource (`cpus`, `memory`, `disk`, ...)
    #[serde(rename = "type")]
    pub type_: String,

    /// Allowed quantity
    pub quantity: i64,
}

/// Observed resource set attributes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSetObservation {
    /// XenOrchestra resource set id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Resource set status
pub type ResourceSetStatus = ResourceStatus<ResourceSetObservation>;

impl_managed!(
    ResourceSet,
    ResourceSetParameters,
    ResourceSetObservation,
    "xenorchestra_resource_set"
);
