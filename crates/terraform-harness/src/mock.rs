//! Mock TerraformCli for unit testing
//!
//! Emulates the parts of terraform the harness relies on without running
//! the binary: `apply` copies the configured arguments into the state and
//! an in-memory "remote", `apply -refresh-only` syncs the state from the
//! remote, `plan` reports a change summary and `destroy` empties both.
//! `init` creates `.terraform/` up front, even when it is made to fail.

use crate::cli::{CommandOutput, TerraformCli};
use crate::error::TerraformError;
use crate::workspace::{CONFIGURATION_FILE, STATE_FILE};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Mock terraform CLI
#[derive(Debug, Clone, Default)]
pub struct MockTerraformCli {
    calls: Arc<Mutex<Vec<Vec<String>>>>,
    failures: Arc<Mutex<HashMap<String, String>>>,
    remote: Arc<Mutex<HashMap<String, Map<String, Value>>>>,
    drift: Arc<Mutex<bool>>,
    next_id: Arc<Mutex<u64>>,
}

impl MockTerraformCli {
    /// Create a mock with an empty remote
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` (init, refresh, plan, apply, destroy) fail with `message`
    pub fn fail(&self, operation: &str, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(operation.to_string(), message.to_string());
    }

    /// Stop failing `operation`
    pub fn clear_failure(&self, operation: &str) {
        self.failures.lock().unwrap().remove(operation);
    }

    /// Report an in-place change on the next plans
    pub fn set_drift(&self, drift: bool) {
        *self.drift.lock().unwrap() = drift;
    }

    /// Register an existing remote object
    pub fn add_remote(&self, id: &str, attributes: Value) {
        let mut attributes = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        attributes.insert("id".to_string(), json!(id));
        self.remote.lock().unwrap().insert(id.to_string(), attributes);
    }

    /// Delete every remote object behind terraform's back
    pub fn delete_remote(&self) {
        self.remote.lock().unwrap().clear();
    }

    /// Ids of the remote objects
    pub fn remote_ids(&self) -> Vec<String> {
        self.remote.lock().unwrap().keys().cloned().collect()
    }

    /// Recorded invocations
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Recorded operations (`refresh` for refresh-only applies)
    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|args| operation_of(&args.iter().map(String::as_str).collect::<Vec<_>>()))
            .collect()
    }

    fn new_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("mock-{}", *next)
    }
}

fn operation_of(args: &[&str]) -> String {
    if args.contains(&"-refresh-only") {
        "refresh".to_string()
    } else {
        args.first().copied().unwrap_or_default().to_string()
    }
}

fn ok(stdout: String) -> CommandOutput {
    CommandOutput {
        status: Some(0),
        stdout,
        stderr: String::new(),
    }
}

/// Type and name of the single resource block in `main.tf.json`
fn configured_resource(dir: &Path) -> Result<(String, String, Map<String, Value>), TerraformError> {
    let doc: Value = serde_json::from_slice(&std::fs::read(dir.join(CONFIGURATION_FILE))?)?;
    let (type_, blocks) = doc["resource"]
        .as_object()
        .and_then(|r| r.iter().next())
        .ok_or_else(|| TerraformError::InvalidState("no resource block".to_string()))?;
    let (name, block) = blocks
        .as_object()
        .and_then(|b| b.iter().next())
        .ok_or_else(|| TerraformError::InvalidState("empty resource block".to_string()))?;
    let mut attributes = block.as_object().cloned().unwrap_or_default();
    attributes.remove("lifecycle");
    Ok((type_.clone(), name.clone(), attributes))
}

fn state_id(dir: &Path) -> Option<String> {
    let state: Value = serde_json::from_slice(&std::fs::read(dir.join(STATE_FILE)).ok()?).ok()?;
    state["resources"][0]["instances"][0]["attributes"]["id"]
        .as_str()
        .map(str::to_string)
}

fn write_state(dir: &Path, resource: Option<(&str, &str, &Map<String, Value>)>) -> Result<(), TerraformError> {
    let resources = match resource {
        Some((type_, name, attributes)) => json!([{
            "mode": "managed",
            "type": type_,
            "name": name,
            "provider": "provider[\"registry.terraform.io/vatesfr/xenorchestra\"]",
            "instances": [{"schema_version": 0, "attributes": attributes}],
        }]),
        None => json!([]),
    };
    let state = json!({
        "version": 4,
        "terraform_version": "1.5.7",
        "serial": 2,
        "lineage": "mock",
        "outputs": {},
        "resources": resources,
    });
    std::fs::write(dir.join(STATE_FILE), serde_json::to_vec(&state)?)?;
    Ok(())
}

#[async_trait]
impl TerraformCli for MockTerraformCli {
    async fn run(
        &self,
        dir: &Path,
        args: &[&str],
        _env: &[(String, String)],
    ) -> Result<CommandOutput, TerraformError> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());

        let operation = operation_of(args);
        if operation == "init" {
            std::fs::create_dir_all(dir.join(".terraform"))?;
        }
        if let Some(message) = self.failures.lock().unwrap().get(&operation) {
            let line = json!({
                "@level": "error",
                "@message": format!("Error: {message}"),
                "type": "diagnostic",
                "diagnostic": {"severity": "error", "summary": message},
            });
            return Ok(CommandOutput {
                status: Some(1),
                stdout: line.to_string(),
                stderr: String::new(),
            });
        }

        match operation.as_str() {
            "init" => Ok(ok(String::new())),
            "refresh" => {
                let (type_, name, _) = configured_resource(dir)?;
                let remote = state_id(dir).and_then(|id| self.remote.lock().unwrap().get(&id).cloned());
                match remote {
                    Some(attributes) => write_state(dir, Some((&type_, &name, &attributes)))?,
                    None => write_state(dir, None)?,
                }
                Ok(ok(String::new()))
            }
            "plan" => {
                let exists = state_id(dir).is_some();
                let drift = *self.drift.lock().unwrap();
                let changes = json!({
                    "add": u32::from(!exists),
                    "change": u32::from(exists && drift),
                    "import": 0,
                    "remove": 0,
                    "operation": "plan",
                });
                let line = json!({
                    "@level": "info",
                    "@message": "Plan",
                    "type": "change_summary",
                    "changes": changes,
                });
                Ok(ok(line.to_string()))
            }
            "apply" => {
                let (type_, name, mut attributes) = configured_resource(dir)?;
                let id = state_id(dir)
                    .filter(|id| self.remote.lock().unwrap().contains_key(id))
                    .unwrap_or_else(|| self.new_id());
                attributes.insert("id".to_string(), json!(id));
                self.remote.lock().unwrap().insert(id, attributes.clone());
                write_state(dir, Some((&type_, &name, &attributes)))?;
                *self.drift.lock().unwrap() = false;
                Ok(ok(String::new()))
            }
            "destroy" => {
                if let Some(id) = state_id(dir) {
                    self.remote.lock().unwrap().remove(&id);
                }
                write_state(dir, None)?;
                Ok(ok(String::new()))
            }
            other => Err(TerraformError::InvalidState(format!(
                "mock does not support terraform {other}"
            ))),
        }
    }
}
