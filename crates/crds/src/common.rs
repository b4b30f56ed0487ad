//! Types shared by every managed resource
//!
//! Deletion policy, status conditions and the generic status envelope
//! (`conditions` + `atProvider`) carried by the XenOrchestra CRDs.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Annotation holding the identifier of the external resource
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// What happens to the external resource when the managed resource is deleted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum DeletionPolicy {
    /// Destroy the external resource
    #[default]
    Delete,

    /// Leave the external resource in place
    Orphan,
}

/// Condition type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionType {
    /// Whether the external resource is ready for use
    Ready,

    /// Whether the last reconciliation succeeded
    Synced,
}

/// Condition status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    /// Condition holds
    True,
    /// Condition does not hold
    False,
    /// Condition could not be determined
    Unknown,
}

/// Machine-readable reason for the last transition of a condition
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionReason {
    /// The external resource exists and is usable
    Available,
    /// The external resource is not usable
    Unavailable,
    /// The external resource is being created
    Creating,
    /// The external resource is being deleted
    Deleting,
    /// Reconciliation succeeded
    ReconcileSuccess,
    /// Reconciliation failed
    ReconcileError,
}

/// A status condition
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type
    #[serde(rename = "type")]
    pub type_: ConditionType,

    /// Condition status
    pub status: ConditionStatus,

    /// Last time the condition changed
    pub last_transition_time: DateTime<Utc>,

    /// Reason for the last transition
    pub reason: ConditionReason,

    /// Human-readable detail, usually an error
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Condition {
    fn new(
        type_: ConditionType,
        status: ConditionStatus,
        reason: ConditionReason,
        message: Option<String>,
    ) -> Self {
        Self {
            type_,
            status,
            last_transition_time: Utc::now(),
            reason,
            message,
        }
    }

    /// Ready: the external resource is available
    pub fn available() -> Self {
        Self::new(ConditionType::Ready, ConditionStatus::True, ConditionReason::Available, None)
    }

    /// Ready: the external resource is being created
    pub fn creating() -> Self {
        Self::new(ConditionType::Ready, ConditionStatus::False, ConditionReason::Creating, None)
    }

    /// Ready: the external resource is being deleted
    pub fn deleting() -> Self {
        Self::new(ConditionType::Ready, ConditionStatus::False, ConditionReason::Deleting, None)
    }

    /// Synced: the last reconciliation succeeded
    pub fn reconcile_success() -> Self {
        Self::new(
            ConditionType::Synced,
            ConditionStatus::True,
            ConditionReason::ReconcileSuccess,
            None,
        )
    }

    /// Synced: the last reconciliation failed with `message`
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(
            ConditionType::Synced,
            ConditionStatus::False,
            ConditionReason::ReconcileError,
            Some(message.into()),
        )
    }

    /// Equal ignoring `lastTransitionTime`
    pub fn equivalent(&self, other: &Condition) -> bool {
        self.type_ == other.type_
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Set `condition`, replacing any condition of the same type.
///
/// An equivalent existing condition is kept as is so its transition time
/// survives. Returns whether the list changed.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) -> bool {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) if existing.equivalent(&condition) => false,
        Some(existing) => {
            *existing = condition;
            true
        }
        None => {
            conditions.push(condition);
            true
        }
    }
}

/// Find the condition of the given type
pub fn get_condition(conditions: &[Condition], type_: ConditionType) -> Option<&Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

/// Observed state of a managed resource
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus<O> {
    /// Ready and Synced conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Attributes observed on the external resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_provider: Option<O>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_set_condition_appends_new_type() {
        let mut conditions = vec![Condition::available()];
        assert!(set_condition(&mut conditions, Condition::reconcile_success()));
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_unchanged() {
        let mut original = Condition::available();
        original.last_transition_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut conditions = vec![original.clone()];

        assert!(!set_condition(&mut conditions, Condition::available()));
        assert_eq!(conditions[0].last_transition_time, original.last_transition_time);
    }

    #[test]
    fn test_set_condition_replaces_changed_condition() {
        let mut conditions = vec![Condition::reconcile_success()];
        assert!(set_condition(&mut conditions, Condition::reconcile_error("boom")));
        assert_eq!(conditions.len(), 1);
        let synced = get_condition(&conditions, ConditionType::Synced).unwrap();
        assert_eq!(synced.status, ConditionStatus::False);
        assert_eq!(synced.message.as_deref(), Some("boom"));
    }

    #[test]
    fn test_condition_wire_format() {
        let json = serde_json::to_value(Condition::creating()).unwrap();
        assert_eq!(json["type"], "Ready");
        assert_eq!(json["status"], "False");
        assert_eq!(json["reason"], "Creating");
        assert!(json.get("message").is_none());
        assert!(json.get("lastTransitionTime").is_some());
    }

    #[test]
    fn test_deletion_policy_defaults_to_delete() {
        assert_eq!(DeletionPolicy::default(), DeletionPolicy::Delete);
        let policy: DeletionPolicy = serde_json::from_str("\"Orphan\"").unwrap();
        assert_eq!(policy, DeletionPolicy::Orphan);
    }
}
