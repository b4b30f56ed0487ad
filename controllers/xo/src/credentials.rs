//! Credential extraction for `ProviderConfig` credential sources.

use crate::clients::ProviderConfigStore;
use crate::error::StoreError;
use crds::{CredentialsSource, ProviderCredentials};
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading credentials from their source
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// The source has no extractor
    #[error("no extraction handler registered for source: {0}")]
    NoHandler(CredentialsSource),

    /// The selector for the source is missing
    #[error("credentials source {kind} requires the {selector} selector")]
    MissingSelector {
        /// Credential source
        kind: CredentialsSource,
        /// Missing selector field
        selector: &'static str,
    },

    /// Secret lookup failed
    #[error("cannot get credentials secret: {0}")]
    Secret(#[source] StoreError),

    /// Secret exists but lacks the key.
    ///
    /// Reported here rather than as empty credentials failing to unmarshal,
    /// so the message names the key to add.
    #[error("secret {namespace}/{name} has no key {key}")]
    MissingKey {
        /// Secret namespace
        namespace: String,
        /// Secret name
        name: String,
        /// Requested key
        key: String,
    },

    /// Environment variable not set
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    /// Credentials file could not be read
    #[error("cannot read credentials file {path}: {error}")]
    File {
        /// File path
        path: String,
        /// Underlying I/O error
        #[source]
        error: std::io::Error,
    },
}

/// Read the raw credential bytes described by `credentials`
pub async fn extract_credentials(
    store: &dyn ProviderConfigStore,
    credentials: &ProviderCredentials,
) -> Result<Vec<u8>, CredentialsError> {
    let source = credentials.source;
    let selectors = &credentials.selectors;
    debug!(%source, "extracting credentials");

    match source {
        CredentialsSource::Secret => {
            let selector = selectors.secret_ref.as_ref().ok_or(CredentialsError::MissingSelector {
                kind: source,
                selector: "secretRef",
            })?;
            let secret = store
                .get_secret(&selector.namespace, &selector.name)
                .await
                .map_err(CredentialsError::Secret)?;
            secret
                .data
                .as_ref()
                .and_then(|data| data.get(&selector.key))
                .map(|value| value.0.clone())
                .ok_or_else(|| CredentialsError::MissingKey {
                    namespace: selector.namespace.clone(),
                    name: selector.name.clone(),
                    key: selector.key.clone(),
                })
        }
        CredentialsSource::Environment => {
            let selector = selectors.env.as_ref().ok_or(CredentialsError::MissingSelector {
                kind: source,
                selector: "env",
            })?;
            std::env::var(&selector.name)
                .map(String::into_bytes)
                .map_err(|_| CredentialsError::MissingEnv(selector.name.clone()))
        }
        CredentialsSource::Filesystem => {
            let selector = selectors.fs.as_ref().ok_or(CredentialsError::MissingSelector {
                kind: source,
                selector: "fs",
            })?;
            tokio::fs::read(&selector.path)
                .await
                .map_err(|error| CredentialsError::File {
                    path: selector.path.clone(),
                    error,
                })
        }
        CredentialsSource::None | CredentialsSource::InjectedIdentity => {
            Err(CredentialsError::NoHandler(source))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{secret_credentials, MockStore};
    use crds::{CommonCredentialSelectors, EnvSelector, FsSelector};
    use k8s_openapi::api::core::v1::Secret;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn credentials(source: CredentialsSource, selectors: CommonCredentialSelectors) -> ProviderCredentials {
        ProviderCredentials { source, selectors }
    }

    #[tokio::test]
    async fn test_secret_source_reads_key() {
        let store = MockStore::new();
        store.add_secret("crossplane-system", "xo-creds", "credentials", br#"{"url":"wss://xo"}"#);

        let bytes = extract_credentials(&store, &secret_credentials("crossplane-system", "xo-creds", "credentials"))
            .await
            .unwrap();
        assert_eq!(bytes, br#"{"url":"wss://xo"}"#);
    }

    #[tokio::test]
    async fn test_secret_source_missing_key() {
        let store = MockStore::new();
        store.add_secret("crossplane-system", "xo-creds", "other", b"{}");

        let err = extract_credentials(&store, &secret_credentials("crossplane-system", "xo-creds", "credentials"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialsError::MissingKey { ref key, .. } if key == "credentials"));
    }

    #[tokio::test]
    async fn test_secret_source_ignores_string_data() {
        let store = MockStore::new();
        store.put_secret(Secret {
            metadata: ObjectMeta {
                name: Some("xo-creds".to_string()),
                namespace: Some("crossplane-system".to_string()),
                ..Default::default()
            },
            string_data: Some(BTreeMap::from([("credentials".to_string(), "{}".to_string())])),
            ..Default::default()
        });

        let err = extract_credentials(&store, &secret_credentials("crossplane-system", "xo-creds", "credentials"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "secret crossplane-system/xo-creds has no key credentials");
    }

    #[tokio::test]
    async fn test_secret_source_missing_secret() {
        let store = MockStore::new();
        let err = extract_credentials(&store, &secret_credentials("crossplane-system", "absent", "credentials"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialsError::Secret(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_filesystem_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, br#"{"username":"admin"}"#).unwrap();

        let creds = credentials(
            CredentialsSource::Filesystem,
            CommonCredentialSelectors {
                fs: Some(FsSelector {
                    path: path.to_string_lossy().into_owned(),
                }),
                ..Default::default()
            },
        );
        let bytes = extract_credentials(&MockStore::new(), &creds).await.unwrap();
        assert_eq!(bytes, br#"{"username":"admin"}"#);
    }

    #[tokio::test]
    async fn test_environment_source_missing_variable() {
        let creds = credentials(
            CredentialsSource::Environment,
            CommonCredentialSelectors {
                env: Some(EnvSelector {
                    name: "XO_PROVIDER_TEST_UNSET_CREDENTIALS".to_string(),
                }),
                ..Default::default()
            },
        );
        let err = extract_credentials(&MockStore::new(), &creds).await.unwrap_err();
        assert!(matches!(err, CredentialsError::MissingEnv(_)));
    }

    #[tokio::test]
    async fn test_missing_selector() {
        let creds = credentials(CredentialsSource::Filesystem, CommonCredentialSelectors::default());
        let err = extract_credentials(&MockStore::new(), &creds).await.unwrap_err();
        assert_eq!(err.to_string(), "credentials source Filesystem requires the fs selector");
    }

    #[tokio::test]
    async fn test_unsupported_source() {
        let creds = credentials(CredentialsSource::InjectedIdentity, CommonCredentialSelectors::default());
        let err = extract_credentials(&MockStore::new(), &creds).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "no extraction handler registered for source: InjectedIdentity"
        );
    }
}
