//! The `Managed` trait implemented by every XenOrchestra managed resource
//!
//! Lets the reconciler and the Terraform setup builder work over any kind
//! without knowing its parameters: each kind exposes its provider config
//! reference, deletion policy, `forProvider` block, observed status and
//! the Terraform resource type that backs it.

use crate::common::{DeletionPolicy, ResourceStatus, EXTERNAL_NAME_ANNOTATION};
use crate::references::ProviderConfigReference;
use k8s_openapi::ClusterResourceScope;
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// A cluster-scoped managed resource backed by one Terraform resource
pub trait Managed:
    Resource<DynamicType = (), Scope = ClusterResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// `spec.forProvider` type
    type Parameters: Serialize + Debug;

    /// `status.atProvider` type
    type Observation: Serialize + DeserializeOwned + Clone + Debug + Default + PartialEq + Send + Sync;

    /// Terraform resource type (e.g. `xenorchestra_vm`)
    const TERRAFORM_TYPE: &'static str;

    /// Referenced `ProviderConfig`, if any
    fn provider_config_ref(&self) -> Option<&ProviderConfigReference>;

    /// Deletion policy
    fn deletion_policy(&self) -> DeletionPolicy;

    /// Desired parameters
    fn for_provider(&self) -> &Self::Parameters;

    /// Observed status
    fn managed_status(&self) -> Option<&ResourceStatus<Self::Observation>>;

    /// Identifier of the external resource, from the external-name annotation
    fn external_name(&self) -> Option<&str> {
        self.meta()
            .annotations
            .as_ref()?
            .get(EXTERNAL_NAME_ANNOTATION)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }
}

/// Implements [`Managed`] for a CRD whose spec has `providerConfigRef`,
/// `deletionPolicy` and `forProvider`, and whose status is a [`ResourceStatus`].
macro_rules! impl_managed {
    ($kind:ty, $params:ty, $observation:ty, $terraform_type:literal) => {
        impl $crate::managed::Managed for $kind {
            type Parameters = $params;
            type Observation = $observation;

            const TERRAFORM_TYPE: &'static str = $terraform_type;

            fn provider_config_ref(&self) -> Option<&$crate::references::ProviderConfigReference> {
                self.spec.provider_config_ref.as_ref()
            }

            fn deletion_policy(&self) -> $crate::common::DeletionPolicy {
                self.spec.deletion_policy
            }

            fn for_provider(&self) -> &$params {
                &self.spec.for_provider
            }

            fn managed_status(&self) -> Option<&$crate::common::ResourceStatus<$observation>> {
                self.status.as_ref()
            }
        }
    };
}

pub(crate) use impl_managed;
