//! Core data model.
//!
//! A graph is registered once under a normalized name. Its record tracks the
//! lifecycle status; the work message hands the creation to the worker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

// ---------------------------------------------------------------------------
// Graph Name
// ---------------------------------------------------------------------------

/// A validated, lowercased graph name. The only way to build one is
/// [`GraphName::parse`], so every store key is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct GraphName(String);

impl GraphName {
    /// Accepts non-empty ASCII alphanumeric names and lowercases them.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.is_empty() && raw.chars().all(|c| c.is_ascii_alphanumeric()) {
            Some(Self(raw.to_ascii_lowercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for GraphName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a graph. Intake only ever writes
/// [`GraphStatus::INITIAL`]; the worker owns every later transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GraphStatus {
    DeploymentQueued,
    DeploymentInProgress,
    Deployed,
    DeploymentFailed,
    DeletionQueued,
    DeletionInProgress,
    DeletionFailed,
}

impl GraphStatus {
    /// Status assigned at registration, before the worker picks it up.
    pub const INITIAL: GraphStatus = GraphStatus::DeploymentQueued;

    pub fn as_str(self) -> &'static str {
        match self {
            GraphStatus::DeploymentQueued => "DEPLOYMENT_QUEUED",
            GraphStatus::DeploymentInProgress => "DEPLOYMENT_IN_PROGRESS",
            GraphStatus::Deployed => "DEPLOYED",
            GraphStatus::DeploymentFailed => "DEPLOYMENT_FAILED",
            GraphStatus::DeletionQueued => "DELETION_QUEUED",
            GraphStatus::DeletionInProgress => "DELETION_IN_PROGRESS",
            GraphStatus::DeletionFailed => "DELETION_FAILED",
        }
    }
}

impl std::fmt::Display for GraphStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GraphStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEPLOYMENT_QUEUED" => Ok(GraphStatus::DeploymentQueued),
            "DEPLOYMENT_IN_PROGRESS" => Ok(GraphStatus::DeploymentInProgress),
            "DEPLOYED" => Ok(GraphStatus::Deployed),
            "DEPLOYMENT_FAILED" => Ok(GraphStatus::DeploymentFailed),
            "DELETION_QUEUED" => Ok(GraphStatus::DeletionQueued),
            "DELETION_IN_PROGRESS" => Ok(GraphStatus::DeletionInProgress),
            "DELETION_FAILED" => Ok(GraphStatus::DeletionFailed),
            other => Err(Error::Other(format!("unknown graph status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// The stored entity record, keyed by `release_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRecord {
    pub release_name: String,
    pub current_state: GraphStatus,
    pub created_at: DateTime<Utc>,
}

impl GraphRecord {
    /// A fresh record in the initial status.
    pub fn queued(name: &GraphName) -> Self {
        Self {
            release_name: name.as_str().to_string(),
            current_state: GraphStatus::INITIAL,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Work Message
// ---------------------------------------------------------------------------

/// Message published for the worker. Carries only these three fields;
/// anything else in the request body is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkMessage {
    pub id: String,
    pub schema: serde_json::Value,
    pub expected_status: GraphStatus,
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// Raw "create graph" body. Fields stay loosely typed so that a wrong type
/// is reported as a validation failure on that field rather than a parse
/// error. `graphId` is the older name of `graphName`.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CreateGraphRequest {
    #[serde(rename = "graphName", alias = "graphId", default)]
    pub graph_name: Option<serde_json::Value>,
    #[serde(default)]
    pub schema: Option<serde_json::Value>,
}

impl CreateGraphRequest {
    pub fn new(graph_name: impl Into<String>, schema: serde_json::Value) -> Self {
        Self {
            graph_name: Some(serde_json::Value::String(graph_name.into())),
            schema: Some(schema),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn graph_name_is_lowercased() {
        let name = GraphName::parse("Alpha1").unwrap();
        assert_eq!(name.as_str(), "alpha1");
        assert_eq!(GraphName::parse(name.as_str()).unwrap(), name);
    }

    #[test]
    fn graph_name_rejects_non_alphanumerics() {
        for raw in ["", "bad name!", "with-dash", "under_score", "ünïcode", " pad"] {
            assert!(GraphName::parse(raw).is_none(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn status_strings_round_trip() {
        let all = [
            GraphStatus::DeploymentQueued,
            GraphStatus::DeploymentInProgress,
            GraphStatus::Deployed,
            GraphStatus::DeploymentFailed,
            GraphStatus::DeletionQueued,
            GraphStatus::DeletionInProgress,
            GraphStatus::DeletionFailed,
        ];
        for status in all {
            assert_eq!(status.as_str().parse::<GraphStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_value(status).unwrap(),
                json!(status.as_str())
            );
        }
        assert!("queued".parse::<GraphStatus>().is_err());
    }

    #[test]
    fn work_message_uses_wire_field_names() {
        let msg = WorkMessage {
            id: "alpha1".to_string(),
            schema: json!({"k": 1}),
            expected_status: GraphStatus::INITIAL,
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"id": "alpha1", "schema": {"k": 1}, "expectedStatus": "DEPLOYMENT_QUEUED"})
        );
    }

    #[test]
    fn request_accepts_graph_id_alias() {
        let req: CreateGraphRequest =
            serde_json::from_value(json!({"graphId": "Beta", "schema": {}})).unwrap();
        assert_eq!(req.graph_name, Some(json!("Beta")));
    }

    #[test]
    fn null_schema_reads_as_missing() {
        let req: CreateGraphRequest =
            serde_json::from_value(json!({"graphName": "a", "schema": null})).unwrap();
        assert!(req.schema.is_none());
    }
}
