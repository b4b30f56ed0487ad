//! ProviderConfig usage tracking
//!
//! Every managed resource records the `ProviderConfig` it uses in a
//! `ProviderConfigUsage` named after its UID, labelled with the config
//! name and owned by the resource, so the usage disappears with it.

use crate::clients::ProviderConfigStore;
use crate::error::ControllerError;
use crds::{
    Managed, ProviderConfigReference, ProviderConfigUsage, ProviderConfigUsageSpec, TypedReference,
    PROVIDER_CONFIG_LABEL,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use tracing::debug;

/// Build the usage recording that `managed` uses `config_ref`
pub fn usage_for<K: Managed>(
    managed: &K,
    config_ref: &ProviderConfigReference,
) -> Result<ProviderConfigUsage, ControllerError> {
    let name = managed.name_any();
    let uid = managed.uid().ok_or_else(|| {
        ControllerError::InvalidResource(format!("{} {} has no uid", K::kind(&()), name))
    })?;
    let api_version = K::api_version(&()).into_owned();
    let kind = K::kind(&()).into_owned();

    let mut usage = ProviderConfigUsage::new(
        &uid,
        ProviderConfigUsageSpec {
            provider_config_ref: config_ref.clone(),
            resource_ref: TypedReference {
                api_version: api_version.clone(),
                kind: kind.clone(),
                name: name.clone(),
                uid: Some(uid.clone()),
            },
        },
    );
    usage.metadata.labels = Some(BTreeMap::from([(
        PROVIDER_CONFIG_LABEL.to_string(),
        config_ref.name.clone(),
    )]));
    usage.metadata.owner_references = Some(vec![OwnerReference {
        api_version,
        kind,
        name,
        uid,
        block_owner_deletion: Some(true),
        controller: Some(false),
    }]);
    Ok(usage)
}

/// Record that `managed` uses `config_ref`
pub async fn track_usage<K: Managed>(
    store: &dyn ProviderConfigStore,
    managed: &K,
    config_ref: &ProviderConfigReference,
) -> Result<(), ControllerError> {
    let usage = usage_for(managed, config_ref)?;
    debug!(usage = %usage.name_any(), provider_config = %config_ref.name, "tracking ProviderConfig usage");
    store
        .apply_usage(&usage)
        .await
        .map_err(ControllerError::TrackUsage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_acl;

    #[test]
    fn test_usage_for_acl() {
        let acl = create_test_acl("dev-viewers", Some("uid-1"), Some("xo-prod"));
        let config_ref = acl.provider_config_ref().unwrap().clone();

        let usage = usage_for(&acl, &config_ref).unwrap();

        assert_eq!(usage.name_any(), "uid-1");
        assert_eq!(usage.labels()[PROVIDER_CONFIG_LABEL], "xo-prod");
        assert_eq!(usage.spec.provider_config_ref.name, "xo-prod");
        assert_eq!(usage.spec.resource_ref.kind, "ACL");
        assert_eq!(
            usage.spec.resource_ref.api_version,
            "xenorchestra.xo.jet.crossplane.io/v1alpha1"
        );
        let owner = &usage.owner_references()[0];
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.name, "dev-viewers");
    }

    #[test]
    fn test_usage_requires_uid() {
        let acl = create_test_acl("dev-viewers", None, Some("xo-prod"));
        let config_ref = acl.provider_config_ref().unwrap().clone();
        assert!(matches!(
            usage_for(&acl, &config_ref),
            Err(ControllerError::InvalidResource(_))
        ));
    }
}
