//! Controller-specific error types.
//!
//! This module defines error types specific to the XenOrchestra provider
//! controllers that are not covered by upstream library errors.

use crate::credentials::CredentialsError;
use kube::Error as KubeError;
use kube_runtime::finalizer::Error as FinalizerError;
use terraform_harness::TerraformError;
use thiserror::Error;

/// Errors returned by a `ProviderConfigStore`
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object does not exist
    #[error("{kind} {name} not found")]
    NotFound {
        /// Object kind
        kind: &'static str,
        /// Object name
        name: String,
    },

    /// Kubernetes API error
    #[error(transparent)]
    Kube(#[from] KubeError),
}

/// Errors that can occur in the XenOrchestra provider controllers.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Terraform invocation failed
    #[error(transparent)]
    Terraform(#[from] TerraformError),

    /// Managed resource has no providerConfigRef
    #[error("no providerConfigRef provided")]
    NoProviderConfigRef,

    /// The referenced ProviderConfig could not be read
    #[error("cannot get referenced ProviderConfig: {0}")]
    GetProviderConfig(#[source] StoreError),

    /// The ProviderConfigUsage could not be applied
    #[error("cannot track ProviderConfig usage: {0}")]
    TrackUsage(#[source] StoreError),

    /// Credentials could not be read from their source
    #[error("cannot extract credentials: {0}")]
    ExtractCredentials(#[source] CredentialsError),

    /// Credentials are not a JSON object of strings
    #[error("cannot unmarshal xo credentials as JSON: {0}")]
    UnmarshalCredentials(#[source] serde_json::Error),

    /// forProvider or atProvider (de)serialization failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// ProviderConfig deletion blocked by managed resources
    #[error("ProviderConfig {name} is still used by {users} managed resource(s)")]
    ProviderConfigInUse {
        /// ProviderConfig name
        name: String,
        /// Number of ProviderConfigUsages
        users: usize,
    },

    /// Object is missing a field the reconciler needs
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A controller was registered twice
    #[error("controller for {0} is already registered")]
    DuplicateController(&'static str),

    /// Adding the finalizer or running cleanup failed
    #[error("Finalizer error: {0}")]
    Finalizer(#[source] Box<FinalizerError<ControllerError>>),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// I/O error (metrics server)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<FinalizerError<ControllerError>> for ControllerError {
    fn from(err: FinalizerError<ControllerError>) -> Self {
        match err {
            FinalizerError::ApplyFailed(err) | FinalizerError::CleanupFailed(err) => err,
            other => ControllerError::Finalizer(Box::new(other)),
        }
    }
}
