//! ACL Custom Resource Definition
//!
//! Grants a XenOrchestra user or group (`subject`) a role (`action`) on
//! an object. Backed by the `xenorchestra_acl` Terraform resource.

use crate::common::{DeletionPolicy, ResourceStatus};
use crate::managed::impl_managed;
use crate::references::{default_provider_config_ref, ProviderConfigReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// AclSpec defines the desired state of a XenOrchestra ACL
#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "xenorchestra.xo.jet.crossplane.io",
    version = "v1alpha1",
    kind = "ACL",
    root = "Acl",
    status = "AclStatus",
    category = "crossplane",
    category = "managed",
    category = "xo",
    printcolumn = r#"{"name":"READY","type":"string","jsonPath":".status.conditions[?(@.type=='Ready')].status"}"#,
    printcolumn = r#"{"name":"SYNCED","type":"string","jsonPath":".status.conditions[?(@.type=='Synced')].status"}"#,
    printcolumn = r#"{"name":"EXTERNAL-NAME","type":"string","jsonPath":".metadata.annotations.crossplane\\.io/external-name"}"#,
    printcolumn = r#"{"name":"AGE","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct AclSpec {
    /// ProviderConfig holding the XenOrchestra credentials
    #[serde(default = "default_provider_config_ref")]
    pub provider_config_ref: Option<ProviderConfigReference>,

    /// What happens to the ACL in XenOrchestra when this resource is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,

    /// ACL parameters
    pub for_provider: AclParameters,
}

/// ACL parameters
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AclParameters {
    /// Role granted (`viewer`, `operator` or `admin`)
    pub action: String,

    /// Id of the object the role applies to
    pub object: String,

    /// Id of the user or group receiving the role
    pub subject: String,
}

/// Observed ACL attributes
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AclObservation {
    /// XenOrchestra ACL id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// ACL status
pub type AclStatus = ResourceStatus<AclObservation>;

impl_managed!(Acl, AclParameters, AclObservation, "xenorchestra_acl");
