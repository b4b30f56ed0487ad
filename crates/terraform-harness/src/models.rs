//! Terraform machine-readable output and state models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One line of `terraform ... -json` output
#[derive(Debug, Clone, Deserialize)]
pub struct LogLine {
    /// Log level (`info`, `error`, ...)
    #[serde(rename = "@level", default)]
    pub level: String,

    /// Human-readable message
    #[serde(rename = "@message", default)]
    pub message: String,

    /// Message type (`change_summary`, `diagnostic`, ...)
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Present on `change_summary` lines
    #[serde(default)]
    pub changes: Option<ChangeSummary>,

    /// Present on `diagnostic` lines
    #[serde(default)]
    pub diagnostic: Option<Diagnostic>,
}

/// Planned or applied change counts
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
pub struct ChangeSummary {
    /// Resources to add
    #[serde(default)]
    pub add: u32,
    /// Resources to change in place
    #[serde(default)]
    pub change: u32,
    /// Resources to import
    #[serde(default)]
    pub import: u32,
    /// Resources to remove
    #[serde(default)]
    pub remove: u32,
}

impl ChangeSummary {
    /// No change is pending
    pub fn is_empty(&self) -> bool {
        self.add == 0 && self.change == 0 && self.remove == 0
    }
}

/// A Terraform diagnostic
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Diagnostic {
    /// `error` or `warning`
    pub severity: String,
    /// Short summary
    pub summary: String,
    /// Longer explanation
    #[serde(default)]
    pub detail: String,
}

/// Parse `-json` output, skipping lines that are not JSON log entries
pub fn parse_log(output: &str) -> Vec<LogLine> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// Last change summary in the output
pub fn change_summary(output: &str) -> Option<ChangeSummary> {
    parse_log(output)
        .into_iter()
        .filter(|line| line.kind == "change_summary")
        .filter_map(|line| line.changes)
        .last()
}

/// Error diagnostics as `summary: detail`, falling back to stderr
pub fn error_message(stdout: &str, stderr: &str) -> String {
    let errors: Vec<String> = parse_log(stdout)
        .into_iter()
        .filter_map(|line| line.diagnostic)
        .filter(|d| d.severity == "error")
        .map(|d| {
            if d.detail.is_empty() {
                d.summary
            } else {
                format!("{}: {}", d.summary, d.detail)
            }
        })
        .collect();

    if !errors.is_empty() {
        return errors.join("; ");
    }
    let stderr = stderr.trim();
    if stderr.is_empty() {
        "terraform exited with a non-zero status".to_string()
    } else {
        stderr.to_string()
    }
}

/// Terraform state file (format version 4)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct State {
    /// State format version
    pub version: u32,
    /// Terraform version that wrote the state
    #[serde(default)]
    pub terraform_version: String,
    /// Serial number, bumped on every write
    #[serde(default)]
    pub serial: u64,
    /// Lineage identifier
    #[serde(default)]
    pub lineage: String,
    /// Resources in the state
    #[serde(default)]
    pub resources: Vec<StateResource>,
}

/// A resource in the state
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateResource {
    /// `managed` or `data`
    pub mode: String,
    /// Terraform resource type
    #[serde(rename = "type")]
    pub type_: String,
    /// Resource name
    pub name: String,
    /// Provider address
    #[serde(default)]
    pub provider: String,
    /// Resource instances
    #[serde(default)]
    pub instances: Vec<StateInstance>,
}

/// An instance of a state resource
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateInstance {
    /// Provider schema version
    #[serde(default)]
    pub schema_version: u32,
    /// Attribute values
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// The external resource as recorded in the state
#[derive(Debug, Clone, PartialEq)]
pub struct ObservedResource {
    /// Terraform `id` attribute
    pub id: String,
    /// All attributes, snake_case
    pub attributes: Map<String, Value>,
}

impl State {
    /// Find the managed resource `type_.name` with a non-empty id
    pub fn observed(&self, type_: &str, name: &str) -> Option<ObservedResource> {
        let resource = self
            .resources
            .iter()
            .find(|r| r.mode == "managed" && r.type_ == type_ && r.name == name)?;
        let instance = resource.instances.first()?;
        let id = instance.attributes.get("id")?.as_str()?;
        if id.is_empty() {
            return None;
        }
        Some(ObservedResource {
            id: id.to_string(),
            attributes: instance.attributes.clone(),
        })
    }
}
