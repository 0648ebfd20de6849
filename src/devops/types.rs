//! Azure DevOps REST payloads.
//!
//! Only the fields the relay surfaces are typed. Everything else is kept
//! in `extra` so tool output stays faithful to the service response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Envelope used by list endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse<T> {
    pub count: usize,
    pub value: Vec<T>,
}

/// A team project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamProject {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A work item with its field bag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: u64,
    #[serde(default)]
    pub rev: u64,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A Git repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GitRepository {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A build (pipeline) definition reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildDefinition {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_list_deserialization() {
        let payload = json!({
            "count": 1,
            "value": [{
                "id": "eb6e4656-77fc-42a1-9181-4c6d8e9da5d1",
                "name": "Fabrikam-Fiber-TFVC",
                "description": "Team Foundation Version Control projects.",
                "url": "https://dev.azure.com/fabrikam/_apis/projects/eb6e4656",
                "state": "wellFormed",
                "lastUpdateTime": "2024-01-01T00:00:00Z"
            }]
        });

        let list: ListResponse<TeamProject> = serde_json::from_value(payload).unwrap();
        assert_eq!(list.count, 1);
        assert_eq!(list.value[0].name, "Fabrikam-Fiber-TFVC");
        assert_eq!(list.value[0].state.as_deref(), Some("wellFormed"));
    }

    #[test]
    fn test_project_keeps_unknown_fields() {
        let payload = json!({
            "id": "p1",
            "name": "Fabrikam",
            "url": "https://dev.azure.com/fabrikam/_apis/projects/p1",
            "revision": 411,
            "visibility": "private"
        });

        let project: TeamProject = serde_json::from_value(payload).unwrap();
        assert_eq!(project.extra["revision"], 411);

        let out = serde_json::to_value(&project).unwrap();
        assert_eq!(out["visibility"], "private");
        assert_eq!(out["url"], "https://dev.azure.com/fabrikam/_apis/projects/p1");
        assert!(out.get("description").is_none());
    }

    #[test]
    fn test_work_item_keeps_unknown_fields() {
        let payload = json!({
            "id": 42,
            "rev": 3,
            "fields": { "System.Title": "Fix login", "System.State": "Active" },
            "url": "https://dev.azure.com/fabrikam/_apis/wit/workItems/42"
        });

        let item: WorkItem = serde_json::from_value(payload).unwrap();
        assert_eq!(item.id, 42);
        assert_eq!(item.fields["System.Title"], "Fix login");
        assert!(item.extra.contains_key("url"));

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["url"], "https://dev.azure.com/fabrikam/_apis/wit/workItems/42");
    }
}
