//! XenOrchestra provider CRD definitions
//!
//! Kubernetes Custom Resource Definitions exposed by the XenOrchestra
//! provider: the managed resources (VM, ACL, resource set, cloud config)
//! and the cluster-scoped `ProviderConfig` / `ProviderConfigUsage` pair.

pub mod common;
pub mod managed;
pub mod references;
pub mod provider_config;
pub mod xenorchestra;
pub mod resource;
pub mod cloud;

pub use common::*;
pub use managed::Managed;
pub use references::*;
pub use provider_config::*;
pub use xenorchestra::*;
pub use resource::*;
pub use cloud::*;
