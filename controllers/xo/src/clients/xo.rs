//! Terraform setup for the XenOrchestra provider
//!
//! Resolves a managed resource's `ProviderConfig`, records the usage,
//! reads the XenOrchestra credentials and turns them into the provider
//! configuration and environment Terraform runs with.
//!
//! The credentials document is a flat JSON object:
//!
//! ```json
//! {"url": "wss://xo.example.com", "username": "admin", "password": "...", "insecure": "false"}
//! ```

use crate::clients::ProviderConfigStore;
use crate::credentials::extract_credentials;
use crate::error::ControllerError;
use crate::usage::track_usage;
use crds::Managed;
use serde_json::Value;
use std::collections::HashMap;
use terraform_harness::Setup;
use tracing::debug;

/// Credentials key holding the XenOrchestra URL
pub const KEY_URL: &str = "url";
/// Credentials key holding the user name
pub const KEY_USERNAME: &str = "username";
/// Credentials key holding the password
pub const KEY_PASSWORD: &str = "password";
/// Credentials key holding the skip-TLS-verification flag
pub const KEY_INSECURE: &str = "insecure";

/// Environment variables set from the credentials, in order.
///
/// These are the names the `vatesfr/xenorchestra` provider reads its
/// connection settings from; bare `USERNAME`/`PASSWORD` are ignored by it.
pub const CREDENTIAL_ENV: [(&str, &str); 4] = [
    ("XOA_USER", KEY_USERNAME),
    ("XOA_PASSWORD", KEY_PASSWORD),
    ("XOA_INSECURE", KEY_INSECURE),
    ("XOA_URL", KEY_URL),
];

/// Builds the Terraform `Setup` of a managed resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerraformSetupBuilder {
    version: String,
    provider_source: String,
    provider_version: String,
}

impl TerraformSetupBuilder {
    /// Create a builder for Terraform `version` and the given provider
    pub fn new(
        version: impl Into<String>,
        provider_source: impl Into<String>,
        provider_version: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            provider_source: provider_source.into(),
            provider_version: provider_version.into(),
        }
    }

    /// Build the setup for `managed`
    pub async fn build<K: Managed>(
        &self,
        store: &dyn ProviderConfigStore,
        managed: &K,
    ) -> Result<Setup, ControllerError> {
        let setup = Setup::new(&self.version, &self.provider_source, &self.provider_version);

        let config_ref = managed
            .provider_config_ref()
            .ok_or(ControllerError::NoProviderConfigRef)?;

        let config = store
            .get_provider_config(&config_ref.name)
            .await
            .map_err(ControllerError::GetProviderConfig)?;

        track_usage(store, managed, config_ref).await?;

        let data = extract_credentials(store, &config.spec.credentials)
            .await
            .map_err(ControllerError::ExtractCredentials)?;

        debug!(provider_config = %config_ref.name, "credentials extracted");
        setup_from_credentials(setup, &data)
    }
}

/// Fill `setup` from a raw credentials document
pub fn setup_from_credentials(mut setup: Setup, data: &[u8]) -> Result<Setup, ControllerError> {
    let creds: HashMap<String, String> =
        serde_json::from_slice(data).map_err(ControllerError::UnmarshalCredentials)?;
    let value = |key: &str| creds.get(key).cloned().unwrap_or_default();

    setup
        .configuration
        .insert(KEY_URL.to_string(), Value::String(value(KEY_URL)));
    setup.env = CREDENTIAL_ENV
        .iter()
        .map(|(name, key)| format!("{name}={}", value(key)))
        .collect();
    Ok(setup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::test_utils::{create_test_acl, create_test_provider_config, MockStore};
    use crds::ProviderConfigReference;

    fn builder() -> TerraformSetupBuilder {
        TerraformSetupBuilder::new("1.5.7", "vatesfr/xenorchestra", "0.26.1")
    }

    fn store_with_credentials(credentials: &[u8]) -> MockStore {
        let store = MockStore::new();
        store.add_provider_config(create_test_provider_config("default", "crossplane-system", "xo-creds"));
        store.add_secret("crossplane-system", "xo-creds", "credentials", credentials);
        store
    }

    #[test]
    fn test_setup_from_credentials() {
        let data = br#"{"url":"wss://xo.example.com","username":"admin","password":"s3cret","insecure":"true"}"#;
        let setup = setup_from_credentials(Setup::new("1.5.7", "vatesfr/xenorchestra", "0.26.1"), data).unwrap();

        assert_eq!(setup.configuration.len(), 1);
        assert_eq!(setup.configuration["url"], "wss://xo.example.com");
        assert_eq!(
            setup.env,
            vec![
                "XOA_USER=admin",
                "XOA_PASSWORD=s3cret",
                "XOA_INSECURE=true",
                "XOA_URL=wss://xo.example.com",
            ]
        );
    }

    #[test]
    fn test_credential_env_uses_provider_variable_names() {
        let names: Vec<&str> = CREDENTIAL_ENV.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["XOA_USER", "XOA_PASSWORD", "XOA_INSECURE", "XOA_URL"]);
        assert!(names.iter().all(|name| name.starts_with("XOA_")));
    }

    #[test]
    fn test_setup_from_credentials_missing_keys_are_empty() {
        let setup = setup_from_credentials(Setup::new("1.5.7", "vatesfr/xenorchestra", "0.26.1"), b"{}").unwrap();
        assert_eq!(setup.configuration["url"], "");
        assert_eq!(setup.env[0], "XOA_USER=");
        assert_eq!(setup.env[3], "XOA_URL=");
    }

    #[test]
    fn test_setup_from_credentials_rejects_non_string_values() {
        let err = setup_from_credentials(
            Setup::new("1.5.7", "vatesfr/xenorchestra", "0.26.1"),
            br#"{"insecure": true}"#,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("cannot unmarshal xo credentials as JSON"));
    }

    #[tokio::test]
    async fn test_build_from_secret() {
        let store = store_with_credentials(br#"{"url":"wss://xo","username":"admin","password":"pw"}"#);
        let acl = create_test_acl("dev-viewers", Some("uid-1"), None);

        let setup = builder().build(&store, &acl).await.unwrap();

        assert_eq!(setup.version, "1.5.7");
        assert_eq!(setup.requirement.source, "vatesfr/xenorchestra");
        assert_eq!(setup.requirement.version, "0.26.1");
        assert_eq!(setup.configuration["url"], "wss://xo");
        assert!(setup.env.contains(&"XOA_PASSWORD=pw".to_string()));

        let usages = store.usages();
        assert_eq!(usages.len(), 1);
        assert_eq!(usages[0].spec.provider_config_ref.name, "default");
    }

    #[tokio::test]
    async fn test_build_without_provider_config_ref() {
        let mut acl = create_test_acl("dev-viewers", Some("uid-1"), None);
        acl.spec.provider_config_ref = None;

        let err = builder().build(&MockStore::new(), &acl).await.unwrap_err();
        assert_eq!(err.to_string(), "no providerConfigRef provided");
    }

    #[tokio::test]
    async fn test_build_with_missing_provider_config() {
        let mut acl = create_test_acl("dev-viewers", Some("uid-1"), None);
        acl.spec.provider_config_ref = Some(ProviderConfigReference::new("absent"));

        let err = builder().build(&MockStore::new(), &acl).await.unwrap_err();
        assert!(matches!(
            err,
            ControllerError::GetProviderConfig(StoreError::NotFound { .. })
        ));
        assert!(err.to_string().starts_with("cannot get referenced ProviderConfig"));
    }

    #[tokio::test]
    async fn test_build_when_usage_tracking_fails() {
        let store = store_with_credentials(b"{}");
        store.fail_usage();
        let acl = create_test_acl("dev-viewers", Some("uid-1"), None);

        let err = builder().build(&store, &acl).await.unwrap_err();
        assert!(err.to_string().starts_with("cannot track ProviderConfig usage"));
    }

    #[tokio::test]
    async fn test_build_with_missing_secret() {
        let store = MockStore::new();
        store.add_provider_config(create_test_provider_config("default", "crossplane-system", "xo-creds"));
        let acl = create_test_acl("dev-viewers", Some("uid-1"), None);

        let err = builder().build(&store, &acl).await.unwrap_err();
        assert!(err.to_string().starts_with("cannot extract credentials"));
    }

    #[tokio::test]
    async fn test_build_with_invalid_json() {
        let store = store_with_credentials(b"not json");
        let acl = create_test_acl("dev-viewers", Some("uid-1"), None);

        let err = builder().build(&store, &acl).await.unwrap_err();
        assert!(matches!(err, ControllerError::UnmarshalCredentials(_)));
    }
}
