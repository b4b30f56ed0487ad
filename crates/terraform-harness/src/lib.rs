//! Terraform harness
//!
//! Drives the XenOrchestra Terraform provider on behalf of the provider
//! controllers: builds per-resource workspaces from a provider `Setup`,
//! runs terraform and reads the resulting state back.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use terraform_harness::{CommandRunner, ResourceBlock, Setup, WorkspaceStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cli = Arc::new(CommandRunner::new("terraform", Duration::from_secs(600)));
//! let store = WorkspaceStore::new("/tmp/xo-provider", cli);
//!
//! let setup = Setup::new("1.5.7", "vatesfr/xenorchestra", "0.26.1");
//! let block = ResourceBlock::new(
//!     "xenorchestra_acl",
//!     "dev-viewers",
//!     serde_json::json!({"action": "viewer", "object": "vm-1", "subject": "user-1"}),
//! );
//!
//! let workspace = store.open("3f1c9e2a", &setup, block, None).await?;
//! workspace.init().await?;
//! let observed = workspace.apply().await?;
//! println!("created {}", observed.id);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod error;
pub mod models;
pub mod naming;
pub mod setup;
pub mod workspace;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use cli::{CommandOutput, CommandRunner, TerraformCli};
pub use error::TerraformError;
pub use models::{ChangeSummary, ObservedResource};
pub use naming::{from_terraform, to_terraform};
pub use setup::{ProviderRequirement, Setup};
pub use workspace::{ResourceBlock, Workspace, WorkspaceStore};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockTerraformCli;
