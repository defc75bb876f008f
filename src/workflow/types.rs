/// Core workflow type definitions
///
/// Two views of the same workflow: the row persisted in the local table and the
/// ephemeral record fetched from the remote API during one reconciliation pass.
/// The workflow id is the only field used to correlate the two.

use serde::{Deserialize, Serialize};

/// Column limit for `workflow_name`
pub const MAX_NAME_LEN: usize = 255;

/// Column limit for `multi_exec_behavior`
pub const MAX_MULTI_EXEC_BEHAVIOR_LEN: usize = 100;

/// A workflow row in local storage
///
/// Serialized in the shape the browser front-end reads:
/// `{ "workflowId": 1, "workflowName": "...", "isActive": true, "multiExecBehavior": "..." }`.
/// The id is always supplied by the remote API, never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRecord {
    #[serde(rename = "workflowId")]
    pub id: i64,
    #[serde(rename = "workflowName")]
    pub name: String,
    pub is_active: bool,
    /// May be empty
    #[serde(default)]
    pub multi_exec_behavior: String,
}

/// A workflow as reported by the remote API
///
/// Lives only for the duration of a single sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteWorkflowRecord {
    pub id: i64,
    pub name: String,
    pub is_active: bool,
    pub multi_exec_behavior: String,
}

impl WorkflowRecord {
    /// New local row copied 1:1 from a remote record
    pub fn from_remote(remote: &RemoteWorkflowRecord) -> Self {
        Self {
            id: remote.id,
            name: remote.name.clone(),
            is_active: remote.is_active,
            multi_exec_behavior: remote.multi_exec_behavior.clone(),
        }
    }

    /// Overwrite the mutable fields from the remote record sharing this id
    ///
    /// Returns true if any field actually changed.
    pub fn overwrite_from(&mut self, remote: &RemoteWorkflowRecord) -> bool {
        debug_assert_eq!(self.id, remote.id);
        let changed = self.name != remote.name
            || self.is_active != remote.is_active
            || self.multi_exec_behavior != remote.multi_exec_behavior;

        self.name.clone_from(&remote.name);
        self.is_active = remote.is_active;
        self.multi_exec_behavior.clone_from(&remote.multi_exec_behavior);

        changed
    }
}

impl RemoteWorkflowRecord {
    /// Check the record fits the local table constraints
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("workflow {} has an empty name", self.id));
        }
        if self.name.chars().count() > MAX_NAME_LEN {
            return Err(format!(
                "workflow {} name exceeds {} characters",
                self.id, MAX_NAME_LEN
            ));
        }
        if self.multi_exec_behavior.chars().count() > MAX_MULTI_EXEC_BEHAVIOR_LEN {
            return Err(format!(
                "workflow {} multiExecBehavior exceeds {} characters",
                self.id, MAX_MULTI_EXEC_BEHAVIOR_LEN
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remote(id: i64, name: &str, active: bool, behavior: &str) -> RemoteWorkflowRecord {
        RemoteWorkflowRecord {
            id,
            name: name.into(),
            is_active: active,
            multi_exec_behavior: behavior.into(),
        }
    }

    #[test]
    fn local_record_uses_front_end_field_names() {
        let record = WorkflowRecord {
            id: 7,
            name: "Nightly".into(),
            is_active: true,
            multi_exec_behavior: "Allow".into(),
        };
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "workflowId": 7,
                "workflowName": "Nightly",
                "isActive": true,
                "multiExecBehavior": "Allow"
            })
        );
    }

    #[test]
    fn overwrite_reports_changes() {
        let mut local = WorkflowRecord::from_remote(&remote(1, "W1", true, "Allow"));
        assert!(!local.overwrite_from(&remote(1, "W1", true, "Allow")));
        assert!(local.overwrite_from(&remote(1, "W1", false, "Allow")));
        assert!(!local.is_active);
    }

    #[test]
    fn validate_enforces_column_limits() {
        assert!(remote(1, "ok", true, "").validate().is_ok());
        assert!(remote(1, "", true, "").validate().is_err());
        assert!(remote(1, &"n".repeat(MAX_NAME_LEN), true, "").validate().is_ok());
        assert!(remote(1, &"n".repeat(MAX_NAME_LEN + 1), true, "").validate().is_err());
        assert!(remote(1, "ok", true, &"b".repeat(MAX_MULTI_EXEC_BEHAVIOR_LEN + 1))
            .validate()
            .is_err());
    }
}
