//! Per-resource Terraform workspaces
//!
//! Each managed resource gets its own directory holding a `main.tf.json`
//! with a single resource block and the `terraform.tfstate` Terraform
//! maintains for it. When a resource is known only by its external name
//! (e.g. after the workspace directory was lost) a minimal state is
//! seeded so Terraform refreshes the existing object instead of creating
//! a new one.

use crate::cli::{CommandOutput, TerraformCli};
use crate::error::TerraformError;
use crate::models::{change_summary, error_message, ChangeSummary, ObservedResource, State};
use crate::setup::Setup;
use serde_json::{json, Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Terraform configuration file written into every workspace
pub const CONFIGURATION_FILE: &str = "main.tf.json";

/// Terraform state file
pub const STATE_FILE: &str = "terraform.tfstate";

/// Provider plugin cache shared by all workspaces, relative to the root
pub const PLUGIN_CACHE_DIR: &str = ".plugin-cache";

/// Written after a successful `init`; holds the provider requirement it installed
pub const INIT_MARKER_FILE: &str = ".init-requirement";

/// The single resource block of a workspace
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBlock {
    /// Terraform resource type (e.g. `xenorchestra_vm`)
    pub resource_type: String,
    /// Resource name, already a valid Terraform identifier
    pub name: String,
    /// Arguments, snake_case
    pub attributes: Value,
    /// Refuse plans that would destroy the resource
    pub prevent_destroy: bool,
}

impl ResourceBlock {
    /// Create a block named after the Kubernetes object `object_name`
    pub fn new(resource_type: impl Into<String>, object_name: &str, attributes: Value) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: sanitize_resource_name(object_name),
            attributes,
            prevent_destroy: true,
        }
    }
}

/// Turn a Kubernetes object name into a Terraform identifier
pub fn sanitize_resource_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if !out.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        out.insert(0, '_');
    }
    out
}

/// Build the `main.tf.json` document
pub fn configuration_document(setup: &Setup, resource: &ResourceBlock) -> Value {
    let provider = setup.requirement.local_name().to_string();

    let mut block = match &resource.attributes {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    block.insert(
        "lifecycle".to_string(),
        json!({ "prevent_destroy": resource.prevent_destroy }),
    );

    json!({
        "terraform": {
            "required_providers": {
                provider.clone(): {
                    "source": setup.requirement.source,
                    "version": setup.requirement.version,
                }
            }
        },
        "provider": {
            provider: Value::Object(setup.configuration.clone()),
        },
        "resource": {
            resource.resource_type.clone(): {
                resource.name.clone(): Value::Object(block),
            }
        }
    })
}

/// Build a state holding only the id of an existing resource
pub fn seed_state(setup: &Setup, resource: &ResourceBlock, external_name: &str, lineage: &str) -> Value {
    json!({
        "version": 4,
        "terraform_version": setup.version,
        "serial": 1,
        "lineage": lineage,
        "outputs": {},
        "resources": [{
            "mode": "managed",
            "type": resource.resource_type,
            "name": resource.name,
            "provider": setup.requirement.address(),
            "instances": [{
                "schema_version": 0,
                "attributes": { "id": external_name },
                "sensitive_attributes": [],
            }]
        }]
    })
}

/// Owns the workspace directories under one root
pub struct WorkspaceStore {
    root: PathBuf,
    cli: Arc<dyn TerraformCli>,
}

impl fmt::Debug for WorkspaceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceStore")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl WorkspaceStore {
    /// Create a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>, cli: Arc<dyn TerraformCli>) -> Self {
        Self {
            root: root.into(),
            cli,
        }
    }

    /// Write the configuration for `key` and return its workspace.
    ///
    /// `key` identifies the managed resource (its UID) and doubles as the
    /// state lineage.
    pub async fn open(
        &self,
        key: &str,
        setup: &Setup,
        resource: ResourceBlock,
        external_name: Option<&str>,
    ) -> Result<Workspace, TerraformError> {
        let dir = self.root.join(key);
        let plugin_cache = self.root.join(PLUGIN_CACHE_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::create_dir_all(&plugin_cache).await?;

        let document = configuration_document(setup, &resource);
        tokio::fs::write(dir.join(CONFIGURATION_FILE), serde_json::to_vec_pretty(&document)?).await?;

        let state_path = dir.join(STATE_FILE);
        if let Some(external_name) = external_name {
            if !tokio::fs::try_exists(&state_path).await? {
                info!(dir = %dir.display(), external_name, "seeding state from external name");
                let state = seed_state(setup, &resource, external_name, key);
                tokio::fs::write(&state_path, serde_json::to_vec_pretty(&state)?).await?;
            }
        }

        let mut env = setup.env_pairs();
        env.push((
            "TF_PLUGIN_CACHE_DIR".to_string(),
            plugin_cache.to_string_lossy().into_owned(),
        ));

        Ok(Workspace {
            dir,
            cli: Arc::clone(&self.cli),
            env,
            requirement: format!("{}@{}", setup.requirement.source, setup.requirement.version),
            resource_type: resource.resource_type,
            resource_name: resource.name,
        })
    }

    /// Delete the workspace of `key`; a missing directory is not an error
    pub async fn remove(&self, key: &str) -> Result<(), TerraformError> {
        match tokio::fs::remove_dir_all(self.root.join(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// A prepared workspace for one managed resource
pub struct Workspace {
    dir: PathBuf,
    cli: Arc<dyn TerraformCli>,
    env: Vec<(String, String)>,
    requirement: String,
    resource_type: String,
    resource_name: String,
}

impl fmt::Debug for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workspace")
            .field("dir", &self.dir)
            .field("resource_type", &self.resource_type)
            .field("resource_name", &self.resource_name)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Workspace directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Environment passed to terraform
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    async fn run(&self, operation: &str, args: &[&str]) -> Result<CommandOutput, TerraformError> {
        let output = self.cli.run(&self.dir, args, &self.env).await?;
        if !output.success() {
            return Err(TerraformError::Command {
                operation: operation.to_string(),
                message: error_message(&output.stdout, &output.stderr),
            });
        }
        Ok(output)
    }

    /// `terraform init`, skipped once it succeeded for the current provider requirement.
    ///
    /// A changed requirement re-runs it with `-upgrade` so the lock file follows.
    pub async fn init(&self) -> Result<(), TerraformError> {
        let marker = self.dir.join(INIT_MARKER_FILE);
        let installed = match tokio::fs::read_to_string(&marker).await {
            Ok(installed) => Some(installed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        match installed.as_deref() {
            Some(installed) if installed == self.requirement => {
                debug!(dir = %self.dir.display(), "workspace already initialised");
                return Ok(());
            }
            Some(installed) => {
                info!(dir = %self.dir.display(), from = installed, to = %self.requirement, "provider requirement changed");
                self.run("init", &["init", "-upgrade", "-input=false", "-no-color"]).await?;
            }
            None => {
                self.run("init", &["init", "-input=false", "-no-color"]).await?;
            }
        }
        tokio::fs::write(&marker, &self.requirement).await?;
        Ok(())
    }

    /// Resource as currently recorded in the state file
    pub async fn observed(&self) -> Result<Option<ObservedResource>, TerraformError> {
        let contents = match tokio::fs::read(self.dir.join(STATE_FILE)).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: State = serde_json::from_slice(&contents)?;
        Ok(state.observed(&self.resource_type, &self.resource_name))
    }

    /// Refresh the state from XenOrchestra; `None` when the resource does not exist
    pub async fn refresh(&self) -> Result<Option<ObservedResource>, TerraformError> {
        if self.observed().await?.is_none() {
            return Ok(None);
        }
        self.run(
            "refresh",
            &["apply", "-refresh-only", "-auto-approve", "-input=false", "-lock=false", "-json"],
        )
        .await?;
        self.observed().await
    }

    /// Plan against the current state without refreshing it
    pub async fn plan(&self) -> Result<ChangeSummary, TerraformError> {
        let output = self
            .run("plan", &["plan", "-refresh=false", "-input=false", "-lock=false", "-json"])
            .await?;
        change_summary(&output.stdout)
            .ok_or_else(|| TerraformError::InvalidState("plan output has no change summary".to_string()))
    }

    /// Create or update the resource
    pub async fn apply(&self) -> Result<ObservedResource, TerraformError> {
        self.run("apply", &["apply", "-auto-approve", "-input=false", "-lock=false", "-json"])
            .await?;
        self.observed().await?.ok_or_else(|| {
            TerraformError::InvalidState(format!(
                "{}.{} missing from state after apply",
                self.resource_type, self.resource_name
            ))
        })
    }

    /// Destroy the resource
    pub async fn destroy(&self) -> Result<(), TerraformError> {
        self.run("destroy", &["destroy", "-auto-approve", "-input=false", "-lock=false", "-json"])
            .await?;
        Ok(())
    }
}
