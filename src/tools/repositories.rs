//! Git repository tools.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::devops::DevOpsClientFactory;
use crate::error::Result;
use crate::mcp::handler::{error_result, get_string_arg, ToolHandler};
use crate::mcp::protocol::{Tool, ToolResult};

use super::{connect, json_result};

/// List repositories tool.
pub struct ListRepositoriesTool {
    factory: Arc<DevOpsClientFactory>,
}

impl ListRepositoriesTool {
    pub fn new(factory: Arc<DevOpsClientFactory>) -> Self {
        Self { factory }
    }
}

#[async_trait]
impl ToolHandler for ListRepositoriesTool {
    fn definition(&self) -> Tool {
        Tool {
            name: "repo_list_repos_by_project".to_string(),
            description: "Retrieve a list of Git repositories for a given project.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "project": {
                        "type": "string",
                        "description": "The name or ID of the project"
                    }
                },
                "required": ["project"]
            }),
        }
    }

    async fn execute(&self, args: HashMap<String, Value>) -> Result<ToolResult> {
        let project = get_string_arg(&args, "project")?;

        let client = match connect(&self.factory).await {
            Ok(client) => client,
            Err(result) => return Ok(result),
        };

        match client.list_repositories(&project).await {
            Ok(repos) => json_result(&repos.value),
            Err(e) => Ok(error_result(format!(
                "Failed to list repositories in {}: {}",
                project, e
            ))),
        }
    }
}
