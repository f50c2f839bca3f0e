//! Tasks commissioned across compute nodes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::SCHEMA_VERSION;

/// Input embedded in a retrieval task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub data_id: String,
    /// Requester session public key the nodes re-encrypt to
    pub consumer_pk: String,
}

/// A task as reported by the task registry
///
/// `result` fills in per node as nodes finish, in no particular order. The
/// registry only assigns `id` once the task is complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub task_type: String,
    pub input_data: TaskInput,
    #[serde(default)]
    pub result: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub verification_error: Option<serde_json::Value>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl Task {
    /// Whether the registry has assigned an id to this record
    pub fn is_completed(&self) -> bool {
        !self.id.is_empty()
    }

    /// The verification error as text, if the nodes rejected the task
    pub fn verification_error(&self) -> Option<String> {
        match self.verification_error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Parsed share reported by `node`, if it reported a usable one
    pub fn share_from(&self, node: &str) -> Option<NodeShare> {
        self.result.get(node).and_then(NodeShare::from_report)
    }
}

/// The well-formed part of one node's task result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeShare {
    /// Partial re-encryption share, opaque to the client
    pub reenc_sk: serde_json::Value,
}

impl NodeShare {
    /// Parse a node report; nodes may send the object itself or its JSON text
    pub fn from_report(report: &serde_json::Value) -> Option<Self> {
        let share: NodeShare = match report {
            serde_json::Value::String(text) => serde_json::from_str(text).ok()?,
            serde_json::Value::Object(_) => serde_json::from_value(report.clone()).ok()?,
            _ => return None,
        };
        if share.reenc_sk.is_null() {
            return None;
        }
        Some(share)
    }
}

/// Per-retrieval key pair the nodes re-encrypt shares to
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionKeyPair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for SessionKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn task_with(result: serde_json::Value) -> Task {
        serde_json::from_value(json!({
            "id": "task-1",
            "input_data": {"data_id": "data-1", "consumer_pk": "pk"},
            "result": result,
        }))
        .unwrap()
    }

    #[test]
    fn test_pending_task_has_no_id() {
        let task: Task = serde_json::from_value(json!({
            "input_data": {"data_id": "d", "consumer_pk": "pk"}
        }))
        .unwrap();
        assert!(!task.is_completed());
        assert_eq!(task.version, SCHEMA_VERSION);
    }

    #[test]
    fn test_share_from_object_and_text() {
        let task = task_with(json!({
            "a": {"reenc_sk": "s-a"},
            "b": "{\"reenc_sk\": [1, 2]}",
        }));
        assert_eq!(task.share_from("a").unwrap().reenc_sk, json!("s-a"));
        assert_eq!(task.share_from("b").unwrap().reenc_sk, json!([1, 2]));
        assert!(task.share_from("c").is_none());
    }

    #[test]
    fn test_malformed_reports_are_unusable() {
        let task = task_with(json!({
            "a": "not json",
            "b": {"other": 1},
            "c": 42,
            "d": {"reenc_sk": null},
        }));
        for node in ["a", "b", "c", "d"] {
            assert!(task.share_from(node).is_none(), "node {} should be unusable", node);
        }
    }

    #[test]
    fn test_verification_error_text() {
        let mut task = task_with(json!({}));
        assert_eq!(task.verification_error(), None);

        task.verification_error = Some(json!(""));
        assert_eq!(task.verification_error(), None);

        task.verification_error = Some(json!("bad proof"));
        assert_eq!(task.verification_error().as_deref(), Some("bad proof"));

        task.verification_error = Some(json!({"node": "a"}));
        assert_eq!(task.verification_error().as_deref(), Some("{\"node\":\"a\"}"));
    }

    #[test]
    fn test_session_key_debug_redacts_private_key() {
        let key = SessionKeyPair {
            public_key: "pub".into(),
            private_key: "secret".into(),
        };
        let debug = format!("{:?}", key);
        assert!(debug.contains("pub"));
        assert!(!debug.contains("secret"));
    }
}
